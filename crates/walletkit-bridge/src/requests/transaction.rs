//! A dApp's request to sign and send a transaction.

use super::lifecycle::{Decision, RequestCore, RequestState};
use crate::domain::methods;
use crate::domain::BridgeResult;
use crate::ports::RpcInvoker;
use serde_json::{json, Value};
use std::sync::Arc;
use walletkit_types::{DAppInfo, TransactionApproval, TransactionMessage, TransactionRequestEvent};

/// Transaction request awaiting the user's decision.
///
/// Approval always uses the messages captured when the event arrived.
#[derive(Debug, Clone)]
pub struct TransactionRequest {
    event: Arc<TransactionRequestEvent>,
    core: Arc<RequestCore>,
}

impl TransactionRequest {
    pub(crate) fn new(event: TransactionRequestEvent, invoker: Arc<dyn RpcInvoker>) -> Self {
        let core = RequestCore::new(event.id.clone(), methods::TRANSACTION, invoker);
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

    pub fn messages(&self) -> &[TransactionMessage] {
        &self.event.request.messages
    }

    pub fn valid_until(&self) -> Option<u64> {
        self.event.request.valid_until
    }

    pub fn wallet_address(&self) -> Option<&str> {
        self.event.wallet_address.as_deref()
    }

    pub fn event(&self) -> &TransactionRequestEvent {
        &self.event
    }

    pub fn state(&self) -> RequestState {
        self.core.state()
    }

    /// Sign and send. Returns whatever the engine reports about the sent
    /// message; a bare `null` result yields an empty approval.
    pub async fn approve(&self) -> BridgeResult<TransactionApproval> {
        let payload = json!({ "event": serde_json::to_value(self.event.as_ref())? });
        let result = self.core.respond(Decision::Approve, payload).await?;
        match result {
            Value::Null => Ok(TransactionApproval::default()),
            Value::String(signed_boc) => Ok(TransactionApproval {
                signed_boc: Some(signed_boc),
                ..Default::default()
            }),
            other => Ok(serde_json::from_value(other)?),
        }
    }

    pub async fn reject(&self, reason: Option<&str>) -> BridgeResult<()> {
        let payload = json!({
            "event": serde_json::to_value(self.event.as_ref())?,
            "reason": reason,
        });
        self.core.respond(Decision::Reject, payload).await.map(|_| ())
    }
}
