//! Outbound (Driven) ports for the bridge.
//!
//! These traits define the bridge's dependency on the embedded engine.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use super::inbound::EngineCallbacks;

/// Transport refused an instruction.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChannelError {
    #[error("engine channel closed")]
    Closed,

    #[error("engine rejected instruction: {0}")]
    Rejected(String),
}

/// The single opaque channel to the engine.
///
/// Fire-and-forget: `Ok` means the instruction was accepted for execution, not
/// that it produced a result. Results come back through [`EngineCallbacks`].
#[async_trait]
pub trait EngineChannel: Send + Sync {
    async fn execute(&self, instruction: String) -> Result<(), ChannelError>;
}

/// Failure raised by the script engine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct EngineError {
    pub message: String,
}

impl EngineError {
    pub const FALLBACK_MESSAGE: &'static str = "evaluation failed";

    /// Wrap the engine's exception message, falling back to a generic text
    /// when it has none.
    pub fn new(message: Option<&str>) -> Self {
        let message = message
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(Self::FALLBACK_MESSAGE);
        Self {
            message: message.to_string(),
        }
    }
}

impl From<String> for EngineError {
    fn from(message: String) -> Self {
        Self::new(Some(&message))
    }
}

/// An embedded script runtime, owned by exactly one thread.
pub trait ScriptEngine: Send + 'static {
    /// Expose the host callbacks to scripts. Called once, before the bundle
    /// is evaluated.
    fn install_callbacks(&mut self, callbacks: Arc<dyn EngineCallbacks>) -> Result<(), EngineError>;

    /// Evaluate `script` as global code, returning its completion value
    /// converted to JSON (`null` for `undefined` or unconvertible values).
    fn evaluate(&mut self, script: &str, filename: &str) -> Result<Value, EngineError>;

    /// Run queued jobs until the queue is empty. Returns how many ran.
    fn run_pending_jobs(&mut self) -> Result<usize, EngineError>;

    /// Release the runtime. Called once when the owning thread exits.
    fn dispose(&mut self) {}
}

/// The script bundle the engine loads at start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineBundle {
    pub source: String,
    pub filename: String,
}

impl EngineBundle {
    pub fn new(source: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            filename: filename.into(),
        }
    }
}
