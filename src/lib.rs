//! Mental-health statement classifier.
//!
//! Offline, [`training::Trainer`] turns a labelled spreadsheet into a
//! TF-IDF + softmax regression pipeline and writes it as a versioned
//! artifact. Online, [`service::PredictorService`] loads that artifact once
//! and [`api::build_router`] exposes it over HTTP, pairing every predicted
//! label with a keyword [`sentiment::Sentiment`].

pub mod api;
pub mod config;
pub mod error;
pub mod ml;
pub mod sentiment;
pub mod service;
pub mod telemetry;
pub mod training;

pub use error::{AppError, Result};
