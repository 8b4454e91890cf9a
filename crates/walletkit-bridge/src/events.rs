//! Events delivered to bridge consumers.
//!
//! Request events arrive already wrapped in their request objects, so every
//! handler and subscriber that sees one shares the same single-use lifecycle.

use crate::ports::RpcInvoker;
use crate::requests::{ConnectionRequest, SignDataRequest, TransactionRequest};
use std::sync::Arc;
use walletkit_bus::RoutedEvent;
use walletkit_types::{
    DisconnectEvent, EventKind, InboundEvent, SessionsChangedEvent, StateChangedEvent,
};

#[derive(Debug, Clone)]
pub enum WalletEvent {
    ConnectRequest(ConnectionRequest),
    TransactionRequest(TransactionRequest),
    SignDataRequest(SignDataRequest),
    Disconnect(DisconnectEvent),
    StateChanged(StateChangedEvent),
    SessionsChanged(SessionsChangedEvent),
}

impl WalletEvent {
    /// Wrap a decoded engine event. Unknown events have no counterpart.
    pub fn from_inbound(event: InboundEvent, invoker: &Arc<dyn RpcInvoker>) -> Option<Self> {
        let event = match event {
            InboundEvent::ConnectRequest(e) => Self::ConnectRequest(ConnectionRequest::new(e, invoker.clone())),
            InboundEvent::TransactionRequest(e) => {
                Self::TransactionRequest(TransactionRequest::new(e, invoker.clone()))
            }
            InboundEvent::SignDataRequest(e) => Self::SignDataRequest(SignDataRequest::new(e, invoker.clone())),
            InboundEvent::Disconnect(e) => Self::Disconnect(e),
            InboundEvent::StateChanged(e) => Self::StateChanged(e),
            InboundEvent::SessionsChanged(e) => Self::SessionsChanged(e),
            InboundEvent::Unknown(_) => return None,
        };
        Some(event)
    }

    /// Request id for request events.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Self::ConnectRequest(r) => Some(r.id()),
            Self::TransactionRequest(r) => Some(r.id()),
            Self::SignDataRequest(r) => Some(r.id()),
            _ => None,
        }
    }
}

impl RoutedEvent for WalletEvent {
    fn kind(&self) -> EventKind {
        match self {
            Self::ConnectRequest(_) => EventKind::ConnectRequest,
            Self::TransactionRequest(_) => EventKind::TransactionRequest,
            Self::SignDataRequest(_) => EventKind::SignDataRequest,
            Self::Disconnect(_) => EventKind::Disconnect,
            Self::StateChanged(_) => EventKind::StateChanged,
            Self::SessionsChanged(_) => EventKind::SessionsChanged,
        }
    }
}
