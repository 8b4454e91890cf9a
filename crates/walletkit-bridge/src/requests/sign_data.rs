//! A dApp's request to sign arbitrary data.

use super::lifecycle::{Decision, RequestCore, RequestState};
use crate::domain::methods;
use crate::domain::{BridgeError, BridgeResult};
use crate::ports::RpcInvoker;
use serde_json::{json, Value};
use std::sync::Arc;
use walletkit_types::{DAppInfo, SignDataPayload, SignDataRequestEvent, SignDataResult, SignDataSchema};

#[derive(Debug, Clone)]
pub struct SignDataRequest {
    event: Arc<SignDataRequestEvent>,
    core: Arc<RequestCore>,
}

impl SignDataRequest {
    pub(crate) fn new(event: SignDataRequestEvent, invoker: Arc<dyn RpcInvoker>) -> Self {
        let core = RequestCore::new(event.id.clone(), methods::SIGN_DATA, invoker);
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

    pub fn payload(&self) -> &SignDataPayload {
        &self.event.payload
    }

    pub fn schema(&self) -> SignDataSchema {
        self.event.payload.schema
    }

    pub fn event(&self) -> &SignDataRequestEvent {
        &self.event
    }

    pub fn state(&self) -> RequestState {
        self.core.state()
    }

    /// Sign the data. Fails with [`BridgeError::Protocol`] when the engine's
    /// answer carries no signature.
    pub async fn approve(&self) -> BridgeResult<SignDataResult> {
        let payload = json!({ "event": serde_json::to_value(self.event.as_ref())? });
        let result = self.core.respond(Decision::Approve, payload).await?;
        decode_signature(result)
    }

    pub async fn reject(&self, reason: Option<&str>) -> BridgeResult<()> {
        let payload = json!({
            "event": serde_json::to_value(self.event.as_ref())?,
            "reason": reason,
        });
        self.core.respond(Decision::Reject, payload).await.map(|_| ())
    }
}

fn decode_signature(result: Value) -> BridgeResult<SignDataResult> {
    let has_signature = result
        .get("signature")
        .and_then(Value::as_str)
        .is_some_and(|s| !s.is_empty());
    if !has_signature {
        return Err(BridgeError::Protocol(
            "sign-data approval returned no signature".into(),
        ));
    }
    serde_json::from_value(result).map_err(|e| BridgeError::Protocol(format!("invalid sign-data result: {}", e)))
}
