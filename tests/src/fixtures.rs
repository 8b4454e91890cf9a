//! Shared builders for integration tests.

use serde_json::Value;
use std::time::Duration;
use tokio::task::JoinHandle;
use walletkit_bridge::testing::{EngineHarness, RecordingChannel};
use walletkit_bridge::{BridgeConfig, WalletKitBridge, WalletKitConfig};

/// Upper bound for any single await in a test.
pub const WAIT: Duration = Duration::from_secs(2);

/// Bridge over a recording channel, plus the harness that answers for the
/// engine. The engine is not ready until `harness.ready()`.
pub fn recording_bridge(config: BridgeConfig) -> (WalletKitBridge, EngineHarness) {
    let channel = RecordingChannel::new();
    let bridge = WalletKitBridge::new(channel.clone(), config, WalletKitConfig::default())
        .unwrap_or_else(|e| panic!("bridge construction failed: {}", e));
    let harness = EngineHarness::new(channel, bridge.callbacks(), &bridge.config().engine_entrypoint);
    (bridge, harness)
}

/// Recording bridge with default config and a ready engine.
pub fn ready_bridge() -> (WalletKitBridge, EngineHarness) {
    let (bridge, harness) = recording_bridge(BridgeConfig::default());
    harness.ready();
    (bridge, harness)
}

/// Await a spawned call, failing the test if it hangs or panics.
pub async fn settle<T>(handle: JoinHandle<T>) -> T {
    tokio::time::timeout(WAIT, handle)
        .await
        .unwrap_or_else(|_| panic!("task did not finish within {:?}", WAIT))
        .unwrap_or_else(|e| panic!("task panicked: {}", e))
}

/// Answer the pending `init` instruction so later calls go straight through.
pub async fn complete_init(harness: &EngineHarness) {
    let init = harness.next_instruction(WAIT).await;
    assert_eq!(init.method, "init", "expected init, got {}", init.method);
    harness.respond(&init, Ok(Value::Null));
}
