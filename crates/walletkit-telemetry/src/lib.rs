//! # WalletKit Telemetry
//!
//! Logging and metrics for the WalletKit bridge.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use walletkit_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() {
//!     let _guard = init_telemetry(TelemetryConfig::from_env()).expect("telemetry");
//!     // Bridge calls, init attempts and event dispatch are now logged and counted
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `WALLETKIT_SERVICE_NAME` | `walletkit` | Service name on log lines |
//! | `WALLETKIT_LOG_LEVEL` | `info` | Log filter, falls back to `RUST_LOG` |
//! | `WALLETKIT_JSON_LOGS` | `false` | JSON formatted log lines |
//! | `WALLETKIT_CONSOLE_OUTPUT` | `true` | Write log lines to stdout |
//! | `WALLETKIT_NETWORK` | `testnet` | Network tag |

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::gather_metrics;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("A global tracing subscriber is already installed")]
    AlreadyInitialized,

    #[error("Failed to encode metrics: {0}")]
    MetricsEncode(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Install logging for the process.
///
/// Returns a guard to hold for the lifetime of the application. A second call
/// in the same process reports [`TelemetryError::AlreadyInitialized`].
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    init_logging(&config)?;
    Ok(TelemetryGuard {
        service: config.full_service_name(),
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    service: String,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.service, "Shutting down telemetry");
    }
}

/// Span carrying the standard bridge fields.
///
/// ```rust,ignore
/// let span = walletkit_telemetry::bridge_span!("walletkit_call", method = %method);
/// ```
#[macro_export]
macro_rules! bridge_span {
    ($name:expr) => {
        tracing::debug_span!($name)
    };
    ($name:expr, $($field:tt)*) => {
        tracing::debug_span!($name, $($field)*)
    };
}
