//! Structured logging setup.
//!
//! Installs a global `tracing` subscriber: an `EnvFilter` built from the
//! configured level plus either a human-readable or a JSON fmt layer.

use crate::{TelemetryConfig, TelemetryError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber.
///
/// `RUST_LOG` directives win over `config.log_level` when both are present.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = build_filter(&config.log_level)?;

    let result = match (config.console_output, config.json_logs) {
        (true, true) => {
            let json_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .with_thread_ids(true)
                .with_thread_names(true)
                .with_current_span(true);
            tracing_subscriber::registry()
                .with(env_filter)
                .with(json_layer)
                .try_init()
        }
        (true, false) => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_names(true)
                .with_ansi(true);
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .try_init()
        }
        (false, _) => tracing_subscriber::registry().with(env_filter).try_init(),
    };
    result.map_err(|_| TelemetryError::AlreadyInitialized)?;

    tracing::info!(
        service = %config.full_service_name(),
        level = %config.log_level,
        json = config.json_logs,
        "Logging initialized"
    );
    Ok(())
}

fn build_filter(level: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| TelemetryError::Config(format!("invalid log level {:?}: {}", level, e)))
}

/// Log a bridge call event with the standard `method` and `correlation_id`
/// fields.
#[macro_export]
macro_rules! log_call_event {
    ($level:ident, $method:expr, $correlation_id:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            method = %$method,
            correlation_id = %$correlation_id,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log an engine event with the standard `event_type` field.
#[macro_export]
macro_rules! log_engine_event {
    ($level:ident, $event_type:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            event_type = %$event_type,
            $($($field)*,)?
            $msg
        )
    };
}
