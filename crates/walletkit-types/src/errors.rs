//! # Error Types
//!
//! Decode failures for inbound engine traffic. These are routing errors: the
//! bridge logs and drops them, they never reach a caller.

use thiserror::Error;

/// Errors raised while decoding a message coming from the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The raw text is not valid JSON.
    #[error("Malformed JSON: {0}")]
    MalformedJson(String),

    /// The message is valid JSON but not an object.
    #[error("Expected a JSON object, found {found}")]
    NotAnObject { found: &'static str },

    /// A required field is absent.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// A response carried both `result` and `error`.
    #[error("Response carries both result and error")]
    AmbiguousResponse,

    /// The `error` member of a response could not be read.
    #[error("Invalid error body: {0}")]
    InvalidErrorBody(String),

    /// A sign-data schema discriminant outside the known set.
    #[error("Unsupported sign-data schema: {0}")]
    UnsupportedSchema(String),

    /// The event payload did not match the shape its tag announces.
    #[error("Invalid {event_type} payload: {reason}")]
    InvalidPayload { event_type: String, reason: String },

    /// The message is neither a response nor an event.
    #[error("Unroutable message: {0}")]
    Unroutable(String),
}

impl DecodeError {
    /// Short label used as a metrics dimension.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MalformedJson(_) => "malformed_json",
            Self::NotAnObject { .. } => "not_an_object",
            Self::MissingField(_) => "missing_field",
            Self::AmbiguousResponse => "ambiguous_response",
            Self::InvalidErrorBody(_) => "invalid_error_body",
            Self::UnsupportedSchema(_) => "unsupported_schema",
            Self::InvalidPayload { .. } => "invalid_payload",
            Self::Unroutable(_) => "unroutable",
        }
    }
}

impl From<serde_json::Error> for DecodeError {
    fn from(e: serde_json::Error) -> Self {
        DecodeError::MalformedJson(e.to_string())
    }
}

/// Name of a JSON value's type, for error messages.
pub(crate) fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
