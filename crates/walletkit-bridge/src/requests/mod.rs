//! Protocol Request Objects.
//!
//! Typed, single-use wrappers around inbound dApp requests. Each holds a
//! snapshot of its event and a back-reference to the bridge so that
//! `approve()` / `reject()` issue correlated calls for the same request.

pub mod connect;
mod lifecycle;
pub mod sign_data;
pub mod transaction;

pub use connect::ConnectionRequest;
pub use lifecycle::RequestState;
pub use sign_data::SignDataRequest;
pub use transaction::TransactionRequest;
