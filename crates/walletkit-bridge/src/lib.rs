//! # WalletKit Bridge
//!
//! Turns one opaque message channel to an embedded wallet engine into typed,
//! awaitable calls, and turns the engine's push notifications into typed
//! TonConnect requests with an approve/reject lifecycle.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────── WalletKitBridge ───────────────────────────┐
//! │                                                                        │
//! │  call() ─▶ ReadinessGate ─▶ InitGuard ─▶ PendingCallTable ─▶ channel   │
//! │                                              ▲                   │     │
//! │                                   on_response│                   ▼     │
//! │                                     ┌────────┴───────┐      ┌────────┐ │
//! │  handlers / subscriptions ◀─ Router ◀─── on_event ───┤      │ engine │ │
//! │                                     └────────────────┘◀─────┴────────┘ │
//! └────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **Readiness Gate**: calls suspend until the engine reports it loaded
//! - **Auto-Init Guard**: the engine's `init` runs once per success, lazily
//! - **Call Correlation Table**: one oneshot per correlation id, resolved once
//! - **Event Router**: isolated fan-out to dynamically (de)registered handlers
//! - **Request objects**: single-use approve/reject for connect, transaction
//!   and sign-data requests
//!
//! ## Example
//!
//! ```ignore
//! let bridge = WalletKitBridge::with_engine(engine, bundle, BridgeConfig::default(), WalletKitConfig::default())?;
//!
//! let _registration = bridge.add_event_handler_fn(|event| {
//!     if let WalletEvent::ConnectRequest(request) = event {
//!         println!("{} wants to connect", request.dapp().name);
//!     }
//!     Ok(())
//! });
//!
//! let sessions = bridge.list_sessions().await?;
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod events;
pub mod ports;
pub mod requests;
pub mod service;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use adapters::{EngineWorker, Readiness};
pub use domain::{
    BridgeConfig, BridgeError, BridgeResult, ConfigError, CorrelationId, Network, RemoteError,
    StorageMode, WalletKitConfig,
};
pub use events::WalletEvent;
pub use ports::{EngineBundle, EngineCallbacks, EngineChannel, EngineError, ScriptEngine};
pub use requests::{ConnectionRequest, RequestState, SignDataRequest, TransactionRequest};
pub use service::{BridgeStats, WalletKitBridge};

pub use walletkit_bus::{EventFilter, HandlerError, HandlerRegistration};
pub use walletkit_types::{EventKind, SignDataSchema, WalletIdentity};
