//! Bridge error types.
//!
//! Everything a caller of the bridge can observe. Routing errors (bad inbound
//! traffic) are not here: they are logged and dropped at the boundary.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use walletkit_types::ErrorBody;

use super::config::ConfigError;

/// Failure reported by the engine in an `error` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteError {
    /// Error message
    pub message: String,
    /// Optional numeric code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    /// Optional additional data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RemoteError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            data: None,
        }
    }

    pub fn with_code(mut self, code: i64) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "[{}] {}", code, self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for RemoteError {}

impl From<ErrorBody> for RemoteError {
    fn from(body: ErrorBody) -> Self {
        Self {
            message: body.message,
            code: body.code,
            data: body.data,
        }
    }
}

/// Errors surfaced by bridge operations.
///
/// `Clone` so a single init outcome can be handed to every waiting caller.
#[derive(Debug, Clone, Error)]
pub enum BridgeError {
    /// The engine answered with an `error` body.
    #[error("{0}")]
    Remote(#[from] RemoteError),

    /// The engine's one-time setup call failed. The next call retries.
    #[error("Engine initialization failed (attempt {attempt}): {source}")]
    InitializationFailed {
        attempt: u64,
        source: Box<BridgeError>,
    },

    /// approve/reject on a request object that already left `Pending`.
    #[error("Request {request_id} was already {state}")]
    AlreadyHandled {
        request_id: String,
        state: &'static str,
    },

    /// The engine answered, but not with the shape the operation needs.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The engine failed to load or the transport refused the command.
    #[error("Engine channel unavailable: {0}")]
    ChannelUnavailable(String),

    #[error("Call to {method} timed out after {}ms", .after.as_millis())]
    Timeout { method: String, after: Duration },

    /// The pending entry was removed before a response arrived.
    #[error("Call cancelled before a response arrived")]
    Cancelled,

    #[error("Bridge is shutting down")]
    ShuttingDown,

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl BridgeError {
    /// The engine-reported error, if this is one.
    pub fn remote(&self) -> Option<&RemoteError> {
        match self {
            Self::Remote(remote) => Some(remote),
            Self::InitializationFailed { source, .. } => source.remote(),
            _ => None,
        }
    }

    /// Local precondition failure; no call was issued.
    pub fn is_usage_error(&self) -> bool {
        matches!(self, Self::AlreadyHandled { .. } | Self::Config(_))
    }

    /// Short label used as a metrics dimension.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Remote(_) => "remote",
            Self::InitializationFailed { .. } => "init",
            Self::AlreadyHandled { .. } => "usage",
            Self::Protocol(_) => "protocol",
            Self::ChannelUnavailable(_) => "channel",
            Self::Timeout { .. } => "timeout",
            Self::Cancelled => "cancelled",
            Self::ShuttingDown => "shutdown",
            Self::Serialization(_) => "serialization",
            Self::Config(_) => "config",
        }
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(e: serde_json::Error) -> Self {
        BridgeError::Serialization(e.to_string())
    }
}

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;
