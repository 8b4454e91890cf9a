//! # Engine Events
//!
//! The closed set of push notifications the engine emits. Tags outside this
//! set decode to [`InboundEvent::Unknown`] and are dropped by the router.

use crate::entities::{
    schema_from_value, string_or_number, DAppInfo, SessionInfo, SignDataPayload,
    TransactionPayload,
};
use crate::envelope::EventEnvelope;
use crate::errors::DecodeError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Kind of a known engine event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    ConnectRequest,
    TransactionRequest,
    SignDataRequest,
    Disconnect,
    StateChanged,
    SessionsChanged,
}

impl EventKind {
    /// Every known kind, in tag order.
    pub const ALL: [EventKind; 6] = [
        EventKind::ConnectRequest,
        EventKind::TransactionRequest,
        EventKind::SignDataRequest,
        EventKind::Disconnect,
        EventKind::StateChanged,
        EventKind::SessionsChanged,
    ];

    /// Wire tag of this kind.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::ConnectRequest => "connectRequest",
            Self::TransactionRequest => "transactionRequest",
            Self::SignDataRequest => "signDataRequest",
            Self::Disconnect => "disconnect",
            Self::StateChanged => "stateChanged",
            Self::SessionsChanged => "sessionsChanged",
        }
    }

    /// Look up a kind by wire tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    /// Whether events of this kind expect an approve/reject answer.
    pub fn is_request(&self) -> bool {
        matches!(
            self,
            Self::ConnectRequest | Self::TransactionRequest | Self::SignDataRequest
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A dApp asks to connect to a wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectRequestEvent {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub dapp: DAppInfo,
    /// Requested connect items (`ton_addr`, `ton_proof`, ...), opaque to the bridge.
    #[serde(default)]
    pub requested_items: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A connected dApp asks the wallet to sign and send a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequestEvent {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub dapp: DAppInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
    pub request: TransactionPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A connected dApp asks the wallet to sign arbitrary data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignDataRequestEvent {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub dapp: DAppInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
    pub payload: SignDataPayload,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A dApp session was closed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectEvent {
    #[serde(default, alias = "id", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// On-chain state of a tracked wallet changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateChangedEvent {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The set of active dApp sessions changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionsChangedEvent {
    #[serde(default)]
    pub sessions: Vec<SessionInfo>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A decoded engine event.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    ConnectRequest(ConnectRequestEvent),
    TransactionRequest(TransactionRequestEvent),
    SignDataRequest(SignDataRequestEvent),
    Disconnect(DisconnectEvent),
    StateChanged(StateChangedEvent),
    SessionsChanged(SessionsChangedEvent),
    /// Tag outside the known set; carries the tag for logging.
    Unknown(String),
}

impl InboundEvent {
    /// Decode an envelope into its typed event.
    ///
    /// Unknown tags are not an error. A known tag whose payload does not fit
    /// its shape is.
    pub fn decode(envelope: EventEnvelope) -> Result<Self, DecodeError> {
        let Some(kind) = EventKind::from_tag(&envelope.event_type) else {
            return Ok(Self::Unknown(envelope.event_type));
        };
        let data = envelope.data;

        Ok(match kind {
            EventKind::ConnectRequest => Self::ConnectRequest(decode_payload(kind, data)?),
            EventKind::TransactionRequest => {
                Self::TransactionRequest(decode_payload(kind, data)?)
            }
            EventKind::SignDataRequest => {
                check_sign_data_schema(&data)?;
                Self::SignDataRequest(decode_payload(kind, data)?)
            }
            EventKind::Disconnect => Self::Disconnect(decode_payload(kind, data)?),
            EventKind::StateChanged => Self::StateChanged(decode_payload(kind, data)?),
            EventKind::SessionsChanged => Self::SessionsChanged(decode_payload(kind, data)?),
        })
    }

    /// Kind of this event, `None` for unknown tags.
    pub fn kind(&self) -> Option<EventKind> {
        match self {
            Self::ConnectRequest(_) => Some(EventKind::ConnectRequest),
            Self::TransactionRequest(_) => Some(EventKind::TransactionRequest),
            Self::SignDataRequest(_) => Some(EventKind::SignDataRequest),
            Self::Disconnect(_) => Some(EventKind::Disconnect),
            Self::StateChanged(_) => Some(EventKind::StateChanged),
            Self::SessionsChanged(_) => Some(EventKind::SessionsChanged),
            Self::Unknown(_) => None,
        }
    }
}

/// Surface an unknown schema discriminant as its own error rather than a
/// generic payload mismatch.
fn check_sign_data_schema(data: &Value) -> Result<(), DecodeError> {
    let Some(payload) = data.get("payload") else {
        return Ok(());
    };
    match payload.get("schema_crc").or_else(|| payload.get("schema")) {
        Some(raw) => schema_from_value(raw).map(|_| ()),
        None => Ok(()),
    }
}

fn decode_payload<T: DeserializeOwned>(kind: EventKind, data: Value) -> Result<T, DecodeError> {
    serde_json::from_value(data).map_err(|e| DecodeError::InvalidPayload {
        event_type: kind.tag().to_string(),
        reason: e.to_string(),
    })
}
