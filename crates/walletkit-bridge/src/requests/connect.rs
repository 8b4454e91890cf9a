//! A dApp's request to connect.

use super::lifecycle::{Decision, RequestCore, RequestState};
use crate::domain::methods;
use crate::domain::BridgeResult;
use crate::ports::RpcInvoker;
use serde_json::{json, Value};
use std::sync::Arc;
use walletkit_types::{ConnectRequestEvent, DAppInfo, WalletIdentity};

/// Connect request awaiting the user's decision.
///
/// Clones share one lifecycle: only the first approve/reject across all
/// clones issues a call.
#[derive(Debug, Clone)]
pub struct ConnectionRequest {
    event: Arc<ConnectRequestEvent>,
    core: Arc<RequestCore>,
}

impl ConnectionRequest {
    pub(crate) fn new(event: ConnectRequestEvent, invoker: Arc<dyn RpcInvoker>) -> Self {
        let core = RequestCore::new(event.id.clone(), methods::CONNECT, invoker);
        Self {
            event: Arc::new(event),
            core: Arc::new(core),
        }
    }

    pub fn id(&self) -> &str {
        self.core.request_id()
    }

    pub fn dapp(&self) -> &DAppInfo {
        &self.event.dapp
    }

    pub fn requested_items(&self) -> &[Value] {
        &self.event.requested_items
    }

    /// The event this request was built from.
    pub fn event(&self) -> &ConnectRequestEvent {
        &self.event
    }

    pub fn state(&self) -> RequestState {
        self.core.state()
    }

    /// Connect `wallet` to the dApp.
    ///
    /// The new session shows up in a later `sessionsChanged` event.
    pub async fn approve(&self, wallet: &WalletIdentity) -> BridgeResult<()> {
        let payload = json!({
            "event": serde_json::to_value(self.event.as_ref())?,
            "walletAddress": wallet.address,
            "wallet": serde_json::to_value(wallet)?,
        });
        self.core.respond(Decision::Approve, payload).await.map(|_| ())
    }

    pub async fn reject(&self, reason: Option<&str>) -> BridgeResult<()> {
        let payload = json!({
            "event": serde_json::to_value(self.event.as_ref())?,
            "reason": reason,
        });
        self.core.respond(Decision::Reject, payload).await.map(|_| ())
    }
}
