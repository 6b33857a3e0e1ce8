pub mod handlers;
pub mod routes;

pub use routes::*;

use crate::service::PredictorService;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub predictor: Arc<PredictorService>,
}

impl AppState {
    pub fn new(predictor: PredictorService) -> Self {
        Self {
            predictor: Arc::new(predictor),
        }
    }
}
