//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for logging and metrics.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to log lines
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error, or a directive list)
    pub log_level: String,

    /// Whether to write log lines to stdout
    pub console_output: bool,

    /// Whether log lines are JSON formatted
    pub json_logs: bool,

    /// Network the wallet runs against (mainnet, testnet)
    pub network: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "walletkit".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
            network: "testnet".to_string(),
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `WALLETKIT_SERVICE_NAME`: Service name (default: walletkit)
    /// - `WALLETKIT_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `WALLETKIT_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `WALLETKIT_JSON_LOGS`: Enable JSON logs (default: false)
    /// - `WALLETKIT_NETWORK`: Network name (default: testnet)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            service_name: env::var("WALLETKIT_SERVICE_NAME").unwrap_or(defaults.service_name),

            log_level: env::var("WALLETKIT_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or(defaults.log_level),

            console_output: env::var("WALLETKIT_CONSOLE_OUTPUT")
                .map(|v| parse_flag(&v, true))
                .unwrap_or(defaults.console_output),

            json_logs: env::var("WALLETKIT_JSON_LOGS")
                .map(|v| parse_flag(&v, false))
                .unwrap_or(defaults.json_logs),

            network: env::var("WALLETKIT_NETWORK").unwrap_or(defaults.network),
        }
    }

    /// Service name qualified with the network, e.g. `walletkit-mainnet`.
    pub fn full_service_name(&self) -> String {
        format!("{}-{}", self.service_name, self.network)
    }
}

fn parse_flag(value: &str, default: bool) -> bool {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}
