//! # WalletKit Types Crate
//!
//! Wire shapes exchanged between the host bridge and the embedded wallet engine.
//!
//! ## Design Principles
//!
//! - **Closed event set**: inbound push messages decode into exactly one of the
//!   six [`InboundEvent`] shapes, or into [`InboundEvent::Unknown`] which the
//!   router drops silently.
//! - **Lossless payloads**: every typed payload keeps the fields it does not
//!   model in an `extra` map, so approving a request can hand the engine back
//!   the same data it emitted.
//! - **Exactly-one response body**: a reply carries either `result` or
//!   `error`, never both; [`ResponseBody`] enforces that at decode time.

pub mod entities;
pub mod envelope;
pub mod errors;
pub mod events;

pub use entities::*;
pub use envelope::{ErrorBody, EventEnvelope, InboundMessage, ResponseBody};
pub use errors::DecodeError;
pub use events::*;
