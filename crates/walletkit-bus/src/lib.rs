//! # WalletKit Bus - Typed Event Fan-Out
//!
//! Delivers decoded engine events to every interested listener.
//!
//! ```text
//!                        ┌──────────────────┐
//!   engine delivery ───▶ │   EventRouter    │ ──▶ handler (callback)
//!   thread  dispatch()   │                  │ ──▶ handler (callback)
//!                        │  handler set +   │
//!                        │  broadcast tx    │ ──▶ Subscription / EventStream
//!                        └──────────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - **Isolation:** a handler that returns an error or panics is logged and
//!   skipped; the remaining handlers still run and nothing propagates back to
//!   the dispatching thread.
//! - **Re-entrancy:** the handler set is snapshotted before invocation, so a
//!   handler may register or dispose handlers (including itself) while a
//!   dispatch is running. The current dispatch is unaffected.
//! - **Disposal:** [`HandlerRegistration`] removes its handler when disposed
//!   or dropped.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod router;
pub mod subscriber;

pub use events::{EventFilter, RoutedEvent};
pub use router::{
    DispatchReport, EventHandler, EventRouter, HandlerError, HandlerId, HandlerRegistration,
};
pub use subscriber::{EventStream, Subscription, SubscriptionError};

/// Events buffered per subscription before slow subscribers start lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;
