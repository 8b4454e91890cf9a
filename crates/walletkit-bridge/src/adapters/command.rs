//! Outbound instruction codec.
//!
//! Every call becomes one script statement:
//!
//! ```text
//! __walletKitCall("<id>","<method>",<payload>,"<encoding>");
//! ```
//!
//! `<payload>` is `null` or a string literal holding the payload JSON text.
//! JSON text longer than the inline limit is base64-encoded first so that
//! large payloads never depend on the transport's string escaping.
//! All literals are JSON string literals, which are valid script literals.

use crate::domain::{BridgeError, CorrelationId};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::Value;
use thiserror::Error;

/// How the payload literal is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadEncoding {
    Json,
    Base64,
}

impl PayloadEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Base64 => "base64",
        }
    }

    fn from_label(label: &str) -> Option<Self> {
        match label {
            "json" => Some(Self::Json),
            "base64" => Some(Self::Base64),
            _ => None,
        }
    }
}

/// Failure to read an instruction back.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InstructionError {
    #[error("instruction does not call {0}")]
    WrongEntrypoint(String),

    #[error("malformed instruction arguments: {0}")]
    MalformedArguments(String),

    #[error("invalid correlation id: {0}")]
    InvalidCorrelationId(String),

    #[error("unknown payload encoding: {0}")]
    UnknownEncoding(String),

    #[error("undecodable payload: {0}")]
    InvalidPayload(String),
}

/// One correlated method invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineInstruction {
    pub correlation_id: CorrelationId,
    pub method: String,
    pub payload: Option<Value>,
}

/// A rendered instruction plus the encoding chosen for its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedInstruction {
    pub script: String,
    pub encoding: PayloadEncoding,
}

impl EngineInstruction {
    pub fn new(correlation_id: CorrelationId, method: impl Into<String>, payload: Option<Value>) -> Self {
        Self {
            correlation_id,
            method: method.into(),
            payload,
        }
    }

    /// Render as a script statement calling `entrypoint`.
    pub fn render(&self, entrypoint: &str, inline_limit: usize) -> Result<RenderedInstruction, BridgeError> {
        let (payload_literal, encoding) = match &self.payload {
            None => ("null".to_string(), PayloadEncoding::Json),
            Some(value) => {
                let text = serde_json::to_string(value)?;
                if text.len() > inline_limit {
                    let encoded = STANDARD.encode(text.as_bytes());
                    (serde_json::to_string(&encoded)?, PayloadEncoding::Base64)
                } else {
                    (serde_json::to_string(&text)?, PayloadEncoding::Json)
                }
            }
        };

        let script = format!(
            "{}({},{},{},{});",
            entrypoint,
            serde_json::to_string(&self.correlation_id.to_string())?,
            serde_json::to_string(&self.method)?,
            payload_literal,
            serde_json::to_string(encoding.as_str())?,
        );
        Ok(RenderedInstruction { script, encoding })
    }

    /// Read back an instruction produced by [`EngineInstruction::render`].
    pub fn parse(entrypoint: &str, script: &str) -> Result<Self, InstructionError> {
        let arguments = script
            .trim()
            .strip_prefix(entrypoint)
            .and_then(|rest| rest.strip_prefix('('))
            .and_then(|rest| rest.strip_suffix(");"))
            .ok_or_else(|| InstructionError::WrongEntrypoint(entrypoint.to_string()))?;

        let values: Vec<Value> = serde_json::from_str(&format!("[{}]", arguments))
            .map_err(|e| InstructionError::MalformedArguments(e.to_string()))?;
        let [id, method, payload, encoding] = <[Value; 4]>::try_from(values).map_err(|values| {
            InstructionError::MalformedArguments(format!("expected 4 arguments, found {}", values.len()))
        })?;

        let (Value::String(id), Value::String(method), Value::String(encoding)) = (id, method, encoding)
        else {
            return Err(InstructionError::MalformedArguments(
                "id, method and encoding must be strings".into(),
            ));
        };

        let correlation_id =
            CorrelationId::parse(&id).map_err(|_| InstructionError::InvalidCorrelationId(id.clone()))?;
        let encoding =
            PayloadEncoding::from_label(&encoding).ok_or(InstructionError::UnknownEncoding(encoding))?;

        let payload = match payload {
            Value::Null => None,
            Value::String(literal) => {
                let text = match encoding {
                    PayloadEncoding::Json => literal,
                    PayloadEncoding::Base64 => {
                        let bytes = STANDARD
                            .decode(literal.as_bytes())
                            .map_err(|e| InstructionError::InvalidPayload(e.to_string()))?;
                        String::from_utf8(bytes).map_err(|e| InstructionError::InvalidPayload(e.to_string()))?
                    }
                };
                Some(serde_json::from_str(&text).map_err(|e| InstructionError::InvalidPayload(e.to_string()))?)
            }
            other => {
                return Err(InstructionError::MalformedArguments(format!(
                    "payload must be null or a string, found {}",
                    other
                )))
            }
        };

        Ok(Self {
            correlation_id,
            method,
            payload,
        })
    }
}
