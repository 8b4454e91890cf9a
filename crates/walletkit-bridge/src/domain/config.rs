//! Bridge configuration.
//!
//! Two separate concerns:
//!
//! - [`BridgeConfig`]: how the bridge itself behaves (timeouts, transport
//!   encoding thresholds).
//! - [`WalletKitConfig`]: what the engine is initialised with. Passed verbatim
//!   as the payload of the `init` call.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::env;
use std::time::Duration;

/// Bridge behaviour configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Per-call deadline. `None` waits indefinitely.
    #[serde(with = "humantime_serde::option")]
    pub call_timeout: Option<Duration>,

    /// Payload JSON longer than this many bytes is base64-encoded in the
    /// outbound instruction.
    pub inline_payload_limit: usize,

    /// How often expired entries are swept when a call timeout is set.
    #[serde(with = "humantime_serde")]
    pub cleanup_interval: Duration,

    /// Engine-side function every instruction invokes.
    pub engine_entrypoint: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            call_timeout: None,
            inline_payload_limit: 1024,
            cleanup_interval: Duration::from_secs(30),
            engine_entrypoint: "__walletKitCall".to_string(),
        }
    }
}

impl BridgeConfig {
    /// Defaults overridden from the environment.
    ///
    /// - `WALLETKIT_CALL_TIMEOUT_MS`: per-call deadline in milliseconds (0 disables)
    /// - `WALLETKIT_INLINE_PAYLOAD_LIMIT`: base64 threshold in bytes
    /// - `WALLETKIT_ENGINE_ENTRYPOINT`: engine dispatch function name
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(raw) = env::var("WALLETKIT_CALL_TIMEOUT_MS") {
            let millis = parse_env::<u64>("WALLETKIT_CALL_TIMEOUT_MS", &raw)?;
            config.call_timeout = (millis > 0).then(|| Duration::from_millis(millis));
        }
        if let Ok(raw) = env::var("WALLETKIT_INLINE_PAYLOAD_LIMIT") {
            config.inline_payload_limit = parse_env("WALLETKIT_INLINE_PAYLOAD_LIMIT", &raw)?;
        }
        if let Ok(entrypoint) = env::var("WALLETKIT_ENGINE_ENTRYPOINT") {
            config.engine_entrypoint = entrypoint;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    pub fn with_inline_payload_limit(mut self, limit: usize) -> Self {
        self.inline_payload_limit = limit;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.inline_payload_limit == 0 {
            return Err(ConfigError::InvalidLimit(
                "inline_payload_limit cannot be 0".into(),
            ));
        }
        if self.cleanup_interval.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "cleanup_interval cannot be 0".into(),
            ));
        }
        if self.call_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::InvalidTimeout(
                "call_timeout cannot be 0, leave it unset to wait indefinitely".into(),
            ));
        }
        if !is_identifier(&self.engine_entrypoint) {
            return Err(ConfigError::InvalidField {
                field: "engine_entrypoint",
                reason: format!("{:?} is not a valid identifier", self.engine_entrypoint),
            });
        }
        Ok(())
    }
}

/// Engine network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    #[default]
    Testnet,
}

/// Where the engine keeps wallets and sessions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    #[default]
    Persistent,
    Memory,
}

/// Engine initialisation payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletKitConfig {
    pub network: Network,

    /// TON HTTP API endpoint.
    pub api_url: String,

    /// TonConnect HTTP bridge endpoint.
    pub bridge_url: String,

    pub storage: StorageMode,

    /// Wallet's own TonConnect manifest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Forwarded untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WalletKitConfig {
    /// Public endpoints for `network`.
    pub fn for_network(network: Network) -> Self {
        let api_url = match network {
            Network::Mainnet => "https://toncenter.com/api/v2/jsonRPC",
            Network::Testnet => "https://testnet.toncenter.com/api/v2/jsonRPC",
        };
        Self {
            network,
            api_url: api_url.to_string(),
            bridge_url: "https://bridge.tonapi.io/bridge".to_string(),
            storage: StorageMode::default(),
            manifest_url: None,
            api_key: None,
            extra: Map::new(),
        }
    }

    pub fn with_storage(mut self, storage: StorageMode) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [("api_url", &self.api_url), ("bridge_url", &self.bridge_url)] {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidField {
                    field,
                    reason: "cannot be empty".into(),
                });
            }
        }
        if self
            .manifest_url
            .as_deref()
            .is_some_and(|url| url.trim().is_empty())
        {
            return Err(ConfigError::InvalidField {
                field: "manifest_url",
                reason: "cannot be empty when set".into(),
            });
        }
        Ok(())
    }
}

impl Default for WalletKitConfig {
    fn default() -> Self {
        Self::for_network(Network::default())
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Invalid size or count limit
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    /// Invalid duration
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// A field failed validation
    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
    /// An environment override could not be parsed
    #[error("invalid value {value:?} for {var}")]
    InvalidEnv { var: &'static str, value: String },
}

fn parse_env<T: std::str::FromStr>(var: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        var,
        value: raw.to_string(),
    })
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' || first == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '.')
}

/// Human-friendly durations: `"30s"`, `"500ms"`, `"2m"` or plain seconds.
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_duration(*duration))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use super::{format_duration, parse_duration};
        use serde::{Deserialize, Deserializer, Serializer};
        use std::time::Duration;

        pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match duration {
                Some(d) => serializer.serialize_some(&format_duration(*d)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
        where
            D: Deserializer<'de>,
        {
            match Option::<String>::deserialize(deserializer)? {
                Some(s) => parse_duration(&s).map(Some).map_err(serde::de::Error::custom),
                None => Ok(None),
            }
        }
    }

    pub(super) fn format_duration(duration: Duration) -> String {
        if duration.subsec_nanos() == 0 {
            format!("{}s", duration.as_secs())
        } else {
            format!("{}ms", duration.as_millis())
        }
    }

    pub(super) fn parse_duration(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid milliseconds")
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid seconds")
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.trim()
                .parse::<u64>()
                .map(|m| Duration::from_secs(m * 60))
                .map_err(|_| "invalid minutes")
        } else {
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid duration format")
        }
    }
}
