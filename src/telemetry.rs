use crate::config::ObservabilityConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set. Otherwise debug mode turns on verbose logs for
/// this crate and the HTTP layer, and the configured level applies elsewhere.
/// Calling this twice is harmless; the second install is ignored.
pub fn init_tracing(config: &ObservabilityConfig, debug: bool) {
    let default_filter = if debug {
        "statement_classifier=debug,tower_http=debug".to_string()
    } else {
        format!("statement_classifier={0},tower_http={0}", config.log_level)
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    let registry = tracing_subscriber::registry().with(filter);
    let installed = if config.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    if installed.is_ok() {
        tracing::debug!(service = %config.service_name, "Tracing initialized");
    }
}
