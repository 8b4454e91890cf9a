//! Auto-initialisation: the engine's `init` runs lazily, once per success,
//! and is retried after a failure.

#[cfg(test)]
mod tests {
    use crate::fixtures::{complete_init, ready_bridge, recording_bridge, settle, WAIT};
    use serde_json::{json, Value};
    use std::time::Duration;
    use walletkit_bridge::adapters::EngineInstruction;
    use walletkit_bridge::{BridgeConfig, BridgeError, Network, WalletKitConfig};

    #[tokio::test]
    async fn test_calls_wait_for_engine_ready() {
        let (bridge, harness) = recording_bridge(BridgeConfig::default());

        let call = tokio::spawn({
            let bridge = bridge.clone();
            async move { bridge.call("getWallets", None).await }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(harness.channel().sent_count(), 0);

        harness.ready();
        complete_init(&harness).await;
        let wallets = harness.next_instruction(WAIT).await;
        assert_eq!(wallets.method, "getWallets");
        harness.respond(&wallets, Ok(json!([])));

        assert_eq!(settle(call).await.unwrap(), json!([]));
    }

    #[tokio::test]
    async fn test_concurrent_first_calls_init_once() {
        let (bridge, harness) = ready_bridge();

        let calls: Vec<_> = (0..5)
            .map(|i| {
                let bridge = bridge.clone();
                tokio::spawn(async move { bridge.call("echo", Some(json!({ "n": i }))).await })
            })
            .collect();

        complete_init(&harness).await;

        let echoes = harness.next_instructions(5, WAIT).await;
        for instruction in &echoes {
            assert_eq!(instruction.method, "echo");
            harness.respond(instruction, Ok(instruction.payload.clone().unwrap_or(Value::Null)));
        }

        for (i, call) in calls.into_iter().enumerate() {
            assert_eq!(settle(call).await.unwrap(), json!({ "n": i }));
        }

        let init_count = harness
            .channel()
            .sent()
            .iter()
            .filter_map(|script| EngineInstruction::parse(&bridge.config().engine_entrypoint, script).ok())
            .filter(|instruction| instruction.method == "init")
            .count();
        assert_eq!(init_count, 1);
        assert_eq!(bridge.init_attempts(), 1);
        assert!(bridge.is_initialized());
    }

    #[tokio::test]
    async fn test_init_failure_is_shared_then_retried() {
        let (bridge, harness) = ready_bridge();

        let calls: Vec<_> = (0..3)
            .map(|_| {
                let bridge = bridge.clone();
                tokio::spawn(async move { bridge.call("getWallets", None).await })
            })
            .collect();

        let init = harness.next_instruction(WAIT).await;
        assert_eq!(init.method, "init");
        harness.respond(&init, Err(json!({ "message": "storage unavailable" })));

        for call in calls {
            match settle(call).await {
                Err(BridgeError::InitializationFailed { attempt, source }) => {
                    assert_eq!(attempt, 1);
                    assert_eq!(source.to_string(), "storage unavailable");
                }
                other => panic!("expected InitializationFailed, got {:?}", other),
            }
        }
        // The failed init never let the calls themselves through.
        assert_eq!(harness.channel().sent_count(), 1);
        assert!(!bridge.is_initialized());

        let retry = tokio::spawn({
            let bridge = bridge.clone();
            async move { bridge.call("getWallets", None).await }
        });
        complete_init(&harness).await;
        let wallets = harness.next_instruction(WAIT).await;
        harness.respond(&wallets, Ok(json!([{ "address": "EQ..." }])));

        assert_eq!(settle(retry).await.unwrap(), json!([{ "address": "EQ..." }]));
        assert_eq!(bridge.init_attempts(), 2);
        assert!(bridge.is_initialized());
    }

    #[tokio::test]
    async fn test_init_payload_is_engine_config() {
        let (bridge, harness) = ready_bridge();

        let call = tokio::spawn({
            let bridge = bridge.clone();
            async move { bridge.call("listSessions", None).await }
        });

        let init = harness.next_instruction(WAIT).await;
        let expected = serde_json::to_value(WalletKitConfig::default()).unwrap();
        assert_eq!(init.payload, Some(expected));
        harness.respond(&init, Ok(Value::Null));

        let sessions = harness.next_instruction(WAIT).await;
        harness.respond(&sessions, Ok(json!([])));
        settle(call).await.unwrap();
    }

    #[tokio::test]
    async fn test_explicit_init_always_runs() {
        let (bridge, harness) = ready_bridge();

        let first = tokio::spawn({
            let bridge = bridge.clone();
            async move { bridge.ensure_initialized().await }
        });
        complete_init(&harness).await;
        settle(first).await.unwrap();
        assert!(bridge.is_initialized());

        let mainnet = WalletKitConfig::for_network(Network::Mainnet);
        let explicit = tokio::spawn({
            let bridge = bridge.clone();
            let config = mainnet.clone();
            async move { bridge.init(config).await }
        });

        let init = harness.next_instruction(WAIT).await;
        assert_eq!(init.method, "init");
        assert_eq!(init.payload, Some(serde_json::to_value(&mainnet).unwrap()));
        harness.respond(&init, Ok(Value::Null));

        settle(explicit).await.unwrap();
        assert_eq!(bridge.init_attempts(), 2);
        assert!(bridge.is_initialized());
    }

    #[tokio::test]
    async fn test_invoke_skips_init() {
        let (bridge, harness) = ready_bridge();

        let call = tokio::spawn({
            let bridge = bridge.clone();
            async move { bridge.invoke("getWallets", None).await }
        });

        let instruction = harness.next_instruction(WAIT).await;
        assert_eq!(instruction.method, "getWallets");
        harness.respond(&instruction, Ok(json!([])));

        settle(call).await.unwrap();
        assert_eq!(bridge.init_attempts(), 0);
    }
}
