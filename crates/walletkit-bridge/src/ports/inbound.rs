//! Inbound (Driving) ports for the bridge.

use crate::domain::BridgeResult;
use async_trait::async_trait;
use serde_json::Value;

/// Callbacks the engine transport invokes on its delivery thread.
///
/// Implementations must not block: they only hand data over to the
/// correlation table and the event router.
pub trait EngineCallbacks: Send + Sync {
    /// The engine bundle finished loading.
    fn on_ready(&self);

    /// The engine bundle failed to load. Terminal for this bridge instance.
    fn on_load_failed(&self, message: &str);

    /// A correlated reply. `raw` is the JSON response body
    /// (`{"result": ...}` or `{"error": {...}}`).
    fn on_response(&self, correlation_id: &str, raw: &str);

    /// A push notification. `raw` is the JSON event envelope.
    fn on_event(&self, raw: &str);

    /// A message from a transport with a single callback; classified into a
    /// response or an event.
    fn on_message(&self, raw: &str);
}

/// Issues a correlated call and awaits its outcome.
///
/// Request objects hold one of these to answer the request they wrap.
#[async_trait]
pub trait RpcInvoker: Send + Sync {
    async fn invoke(&self, method: &str, payload: Option<Value>) -> BridgeResult<Value>;
}
