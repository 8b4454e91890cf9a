//! Domain layer for the bridge.
//!
//! Pure bookkeeping: correlation ids, the pending-call table, the init guard,
//! configuration and the error taxonomy. Nothing here knows the transport.

pub mod config;
pub mod correlation;
pub mod error;
pub mod init;
pub mod methods;
pub mod pending;

pub use config::{BridgeConfig, ConfigError, Network, StorageMode, WalletKitConfig};
pub use correlation::CorrelationId;
pub use error::{BridgeError, BridgeResult, RemoteError};
pub use init::InitGuard;
pub use pending::{
    cleanup_task, CallOutcome, PendingCallTable, PendingStats, PendingStatsSnapshot,
};
