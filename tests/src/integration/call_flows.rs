//! Correlation: every caller gets exactly its own answer, whatever order the
//! engine replies in.

#[cfg(test)]
mod tests {
    use crate::fixtures::{complete_init, ready_bridge, recording_bridge, settle, WAIT};
    use serde_json::{json, Value};
    use std::collections::HashSet;
    use std::time::Duration;
    use walletkit_bridge::adapters::PayloadEncoding;
    use walletkit_bridge::{BridgeConfig, BridgeError};

    #[tokio::test]
    async fn test_concurrent_calls_answered_in_reverse_order() {
        let (bridge, harness) = ready_bridge();
        let warmup = tokio::spawn({
            let bridge = bridge.clone();
            async move { bridge.ensure_initialized().await }
        });
        complete_init(&harness).await;
        settle(warmup).await.unwrap();

        let methods = ["getWallets", "listSessions", "getBalance", "echo"];
        let calls: Vec<_> = (0..20)
            .map(|i| {
                let bridge = bridge.clone();
                let method = methods[i % methods.len()];
                tokio::spawn(async move { (i, bridge.call(method, Some(json!({ "seq": i }))).await) })
            })
            .collect();

        let instructions = harness.next_instructions(20, WAIT).await;
        let ids: HashSet<_> = instructions.iter().map(|i| i.correlation_id).collect();
        assert_eq!(ids.len(), 20, "correlation ids must be unique");

        for instruction in instructions.iter().rev() {
            let seq = instruction.payload.as_ref().map(|p| p["seq"].clone());
            harness.respond(
                instruction,
                Ok(json!({ "method": instruction.method, "seq": seq })),
            );
        }

        for call in calls {
            let (i, outcome) = settle(call).await;
            let result = outcome.unwrap();
            assert_eq!(result["seq"], json!(i));
            assert_eq!(result["method"], json!(methods[i % methods.len()]));
        }
        assert_eq!(bridge.stats().calls.pending, 0);
    }

    #[tokio::test]
    async fn test_unknown_and_garbage_ids_are_ignored() {
        let (bridge, harness) = ready_bridge();

        let call = tokio::spawn({
            let bridge = bridge.clone();
            async move { bridge.invoke("getWallets", None).await }
        });
        let instruction = harness.next_instruction(WAIT).await;

        let callbacks = harness.callbacks();
        callbacks.on_response("not-a-uuid", r#"{"result":1}"#);
        callbacks.on_response("0190a0b0-0000-7000-8000-000000000000", r#"{"result":2}"#);
        callbacks.on_message(r#"{"id":"also-unknown","result":3}"#);

        harness.respond(&instruction, Ok(json!(["wallet"])));
        assert_eq!(settle(call).await.unwrap(), json!(["wallet"]));

        let stats = bridge.stats().calls;
        assert_eq!(stats.completed, 1);
        // Only the well-formed id reaches the table; the others are dropped earlier.
        assert_eq!(stats.unmatched, 1);
    }

    #[tokio::test]
    async fn test_remote_error_reaches_caller_verbatim() {
        let (bridge, harness) = ready_bridge();

        let call = tokio::spawn({
            let bridge = bridge.clone();
            async move {
                bridge
                    .invoke("importWallet", Some(json!({ "mnemonic": vec!["abandon"; 24] })))
                    .await
            }
        });
        let instruction = harness.next_instruction(WAIT).await;
        harness.respond(&instruction, Err(json!({ "message": "Invalid mnemonic phrase" })));

        let err = settle(call).await.unwrap_err();
        let remote = err.remote().expect("remote error");
        assert_eq!(remote.message, "Invalid mnemonic phrase");
        assert_eq!(remote.code, None);
        assert_eq!(err.to_string(), "Invalid mnemonic phrase");
    }

    #[tokio::test]
    async fn test_large_payload_goes_base64() {
        let config = BridgeConfig::default().with_inline_payload_limit(64);
        let (bridge, harness) = recording_bridge(config);
        harness.ready();

        let note = "x".repeat(500);
        let call = tokio::spawn({
            let bridge = bridge.clone();
            let note = note.clone();
            async move { bridge.invoke("saveNote", Some(json!({ "note": note }))).await }
        });

        let instruction = harness.next_instruction(WAIT).await;
        let script = harness.channel().sent()[0].clone();
        assert!(script.ends_with(&format!(",\"{}\");", PayloadEncoding::Base64.as_str())));
        assert!(!script.contains(&note));
        assert_eq!(instruction.payload, Some(json!({ "note": note })));

        harness.respond(&instruction, Ok(Value::Null));
        assert_eq!(settle(call).await.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn test_timeout_then_late_answer() {
        let config = BridgeConfig::default().with_call_timeout(Duration::from_millis(50));
        let (bridge, harness) = recording_bridge(config);
        harness.ready();

        let call = tokio::spawn({
            let bridge = bridge.clone();
            async move { bridge.invoke("slow", None).await }
        });
        let instruction = harness.next_instruction(WAIT).await;

        match settle(call).await {
            Err(BridgeError::Timeout { method, after }) => {
                assert_eq!(method, "slow");
                assert_eq!(after, Duration::from_millis(50));
            }
            other => panic!("expected timeout, got {:?}", other),
        }

        harness.respond(&instruction, Ok(json!("too late")));
        let stats = bridge.stats().calls;
        assert_eq!(stats.timeouts, 1);
        assert_eq!(stats.pending, 0);
    }

    #[tokio::test]
    async fn test_shutdown_fails_pending_calls() {
        let (bridge, harness) = ready_bridge();

        let call = tokio::spawn({
            let bridge = bridge.clone();
            async move { bridge.invoke("getWallets", None).await }
        });
        harness.next_instruction(WAIT).await;

        bridge.shutdown();
        assert!(matches!(settle(call).await, Err(BridgeError::ShuttingDown)));
        assert!(matches!(
            bridge.call("getWallets", None).await,
            Err(BridgeError::ShuttingDown)
        ));
        assert!(bridge.is_shut_down());
    }
}
