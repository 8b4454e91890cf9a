//! # Core Entities
//!
//! Payload building blocks of TonConnect events and their approval results.
//! Field names follow the engine's camelCase JSON.

use crate::errors::DecodeError;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Identity of the dApp behind a request, as reported by its manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DAppInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The wallet a user picked when approving a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletIdentity {
    /// User-friendly wallet address.
    pub address: String,
    /// Hex public key, when the host already knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    /// Wallet contract version (`v4r2`, `v5r1`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl WalletIdentity {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            public_key: None,
            version: None,
        }
    }
}

/// A single outgoing message of a transaction request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionMessage {
    /// Destination address.
    pub address: String,
    /// Amount in nanotons, as a decimal string.
    pub amount: String,
    /// Base64 BOC body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    /// Base64 BOC state init.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_init: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The body of a transaction request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPayload {
    #[serde(default)]
    pub messages: Vec<TransactionMessage>,
    /// Unix seconds after which the request is void.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Sign-data schema.
///
/// Engines emit it either as a string or as the numeric `schema_crc`
/// discriminant; only 0, 1 and 2 are known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignDataSchema {
    Text,
    Binary,
    Cell,
}

impl SignDataSchema {
    /// Map the numeric `schema_crc` discriminant.
    pub fn from_crc(code: u64) -> Result<Self, DecodeError> {
        match code {
            0 => Ok(Self::Text),
            1 => Ok(Self::Binary),
            2 => Ok(Self::Cell),
            other => Err(DecodeError::UnsupportedSchema(other.to_string())),
        }
    }

    /// The numeric `schema_crc` discriminant.
    pub fn crc(&self) -> u64 {
        match self {
            Self::Text => 0,
            Self::Binary => 1,
            Self::Cell => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Binary => "binary",
            Self::Cell => "cell",
        }
    }
}

impl FromStr for SignDataSchema {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "binary" => Ok(Self::Binary),
            "cell" => Ok(Self::Cell),
            other => Err(DecodeError::UnsupportedSchema(other.to_string())),
        }
    }
}

impl fmt::Display for SignDataSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a dApp asks the wallet to sign.
///
/// Serialises with a numeric `schema_crc`; deserialises from either
/// `schema_crc` (number) or `schema` (string or number). When `schema_crc`
/// is present, a `schema` key is content: cell payloads carry their TL-B
/// definition there.
#[derive(Debug, Clone, PartialEq)]
pub struct SignDataPayload {
    pub schema: SignDataSchema,
    /// Schema-specific content (`text`, `bytes`, `cell`, `schema` ref, ...).
    pub content: Map<String, Value>,
}

impl SignDataPayload {
    pub fn text(text: impl Into<String>) -> Self {
        let mut content = Map::new();
        content.insert("text".into(), Value::String(text.into()));
        Self {
            schema: SignDataSchema::Text,
            content,
        }
    }

    /// The text to sign, for text payloads.
    pub fn as_text(&self) -> Option<&str> {
        self.content.get("text").and_then(Value::as_str)
    }

    /// TL-B definition of a cell payload.
    pub fn cell_schema(&self) -> Option<&str> {
        match self.schema {
            SignDataSchema::Cell => self.content.get("schema").and_then(Value::as_str),
            _ => None,
        }
    }
}

impl Serialize for SignDataPayload {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.content.len() + 1))?;
        map.serialize_entry("schema_crc", &self.schema.crc())?;
        for (key, value) in self.content.iter().filter(|(k, _)| k.as_str() != "schema_crc") {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

pub(crate) fn schema_from_value(value: &Value) -> Result<SignDataSchema, DecodeError> {
    match value {
        Value::String(s) => s.parse(),
        Value::Number(n) => match n.as_u64() {
            Some(code) => SignDataSchema::from_crc(code),
            None => Err(DecodeError::UnsupportedSchema(n.to_string())),
        },
        other => Err(DecodeError::UnsupportedSchema(other.to_string())),
    }
}

impl<'de> Deserialize<'de> for SignDataPayload {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut content = Map::<String, Value>::deserialize(deserializer)?;

        let raw_schema = match content.remove("schema_crc") {
            Some(crc) => crc,
            None => match content.remove("schema") {
                Some(schema) => schema,
                None => return Err(serde::de::Error::missing_field("schema_crc")),
            },
        };
        let schema = schema_from_value(&raw_schema).map_err(serde::de::Error::custom)?;

        Ok(Self { schema, content })
    }
}

/// A dApp session known to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dapp_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dapp_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Result of an approved sign-data request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignDataResult {
    /// Base64 signature.
    pub signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Result of an approved transaction request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionApproval {
    /// Signed external message, base64 BOC.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_boc: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Deserialise a TonConnect request id that may arrive as string or number.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, found {}",
            other
        ))),
    }
}
