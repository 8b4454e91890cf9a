//! # Engine Message Envelopes
//!
//! Shapes of the two kinds of inbound traffic:
//!
//! - **Responses**: keyed by the correlation ID the bridge issued, carrying
//!   exactly one of `result` (any JSON value) or `error` (`{message, code?, data?}`).
//! - **Events**: `{type, data}` push notifications, see [`crate::events`].

use crate::errors::{json_type_name, DecodeError};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A push notification from the engine, before typed decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Event tag (`connectRequest`, `sessionsChanged`, ...).
    #[serde(rename = "type")]
    pub event_type: String,

    /// Event payload. Absent data decodes as an empty object.
    #[serde(default = "empty_object")]
    pub data: Value,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

impl EventEnvelope {
    /// Create an envelope from a tag and payload.
    pub fn new(event_type: impl Into<String>, data: Value) -> Self {
        Self {
            event_type: event_type.into(),
            data,
        }
    }

    /// Parse an envelope from raw JSON text.
    pub fn parse(raw: &str) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_str(raw)?;
        Self::from_value(value)
    }

    /// Build an envelope from an already-parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self, DecodeError> {
        let mut map = match value {
            Value::Object(map) => map,
            other => {
                return Err(DecodeError::NotAnObject {
                    found: json_type_name(&other),
                })
            }
        };

        let event_type = match map.remove("type") {
            Some(Value::String(tag)) => tag,
            Some(_) | None => return Err(DecodeError::MissingField("type")),
        };
        let data = match map.remove("data") {
            Some(Value::Null) | None => empty_object(),
            Some(data) => data,
        };

        Ok(Self { event_type, data })
    }
}

/// The `error` member of an engine response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable message.
    pub message: String,

    /// Optional numeric code. Numeric strings are accepted; any other code
    /// shape is dropped so the message still reaches the caller.
    #[serde(
        default,
        deserialize_with = "lenient_code",
        skip_serializing_if = "Option::is_none"
    )]
    pub code: Option<i64>,

    /// Optional structured detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

fn lenient_code<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

impl ErrorBody {
    /// Create an error body with only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            data: None,
        }
    }
}

/// Decoded body of a correlated response: exactly one of result or error.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// Success value. May be any JSON value, including `null`.
    Result(Value),
    /// Engine-reported failure.
    Error(ErrorBody),
}

impl ResponseBody {
    /// Parse a response body from raw JSON text.
    pub fn parse(raw: &str) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_str(raw)?;
        Self::from_value(value)
    }

    /// Decode a response body from a JSON object.
    ///
    /// A present `result` key counts even when its value is `null`; an `error`
    /// key set to `null` counts as absent.
    pub fn from_value(value: Value) -> Result<Self, DecodeError> {
        let mut map = match value {
            Value::Object(map) => map,
            other => {
                return Err(DecodeError::NotAnObject {
                    found: json_type_name(&other),
                })
            }
        };
        Self::from_map(&mut map)
    }

    fn from_map(map: &mut Map<String, Value>) -> Result<Self, DecodeError> {
        let result = map.remove("result");
        let error = match map.remove("error") {
            Some(Value::Null) | None => None,
            Some(error) => Some(error),
        };

        match (result, error) {
            (Some(_), Some(_)) => Err(DecodeError::AmbiguousResponse),
            (Some(result), None) => Ok(Self::Result(result)),
            (None, Some(error)) => decode_error_body(error).map(Self::Error),
            (None, None) => Err(DecodeError::MissingField("result|error")),
        }
    }

    /// Whether this body reports a failure.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

fn decode_error_body(error: Value) -> Result<ErrorBody, DecodeError> {
    match error {
        // Engines that throw plain strings still produce a usable message.
        Value::String(message) => Ok(ErrorBody::new(message)),
        other => serde_json::from_value(other)
            .map_err(|e| DecodeError::InvalidErrorBody(e.to_string())),
    }
}

/// One inbound message from a transport that multiplexes responses and events
/// over a single callback.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Correlated reply. A malformed body keeps its id so the waiting caller
    /// can be failed instead of left pending.
    Response {
        id: String,
        body: Result<ResponseBody, DecodeError>,
    },
    /// Push notification.
    Event(EventEnvelope),
}

impl InboundMessage {
    /// Classify and decode raw JSON text.
    ///
    /// Objects with a string `id` are responses; objects with a `type` tag are
    /// events. Anything else is unroutable.
    pub fn parse(raw: &str) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_str(raw)?;
        let mut map = match value {
            Value::Object(map) => map,
            other => {
                return Err(DecodeError::NotAnObject {
                    found: json_type_name(&other),
                })
            }
        };

        if let Some(id) = map.get("id").and_then(Value::as_str).map(str::to_owned) {
            map.remove("id");
            let body = ResponseBody::from_map(&mut map);
            return Ok(Self::Response { id, body });
        }

        if map.contains_key("type") {
            return EventEnvelope::from_value(Value::Object(map)).map(Self::Event);
        }

        Err(DecodeError::Unroutable(
            "expected an `id` (response) or a `type` (event)".into(),
        ))
    }
}
