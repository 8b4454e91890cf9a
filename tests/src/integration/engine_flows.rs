//! Full round trips through the engine worker thread and the scripted
//! wallet engine.

#[cfg(test)]
mod tests {
    use crate::engine::{EngineState, ScriptedWalletEngine, WALLET_ADDRESS};
    use crate::fixtures::WAIT;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;
    use walletkit_bridge::{
        BridgeConfig, BridgeError, EventFilter, EventKind, Readiness, RequestState, WalletEvent,
        WalletIdentity, WalletKitBridge, WalletKitConfig,
    };
    use walletkit_bus::Subscription;

    fn scripted_bridge() -> (WalletKitBridge, Arc<EngineState>) {
        let config = BridgeConfig::default();
        let (engine, state) = ScriptedWalletEngine::new(&config.engine_entrypoint);
        let bridge = WalletKitBridge::with_engine(
            engine,
            ScriptedWalletEngine::bundle(),
            config,
            WalletKitConfig::default(),
        )
        .unwrap();
        (bridge, state)
    }

    async fn next_event(subscription: &mut Subscription<WalletEvent>) -> WalletEvent {
        tokio::time::timeout(WAIT, subscription.recv())
            .await
            .expect("event within timeout")
            .expect("subscription open")
    }

    #[tokio::test]
    async fn test_connect_session_lifecycle() {
        let (bridge, state) = scripted_bridge();
        let mut events = bridge.subscribe(EventFilter::all());

        bridge
            .handle_ton_connect_url("tc://?v=2&id=abc&r=connect")
            .await
            .unwrap();
        assert_eq!(state.methods(), vec!["init", "handleTonConnectUrl"]);

        let WalletEvent::ConnectRequest(request) = next_event(&mut events).await else {
            panic!("expected a connect request");
        };
        assert_eq!(request.dapp().name, "Example dApp");

        request.approve(&WalletIdentity::new(WALLET_ADDRESS)).await.unwrap();
        assert_eq!(request.state(), RequestState::Approved);

        let WalletEvent::SessionsChanged(changed) = next_event(&mut events).await else {
            panic!("expected sessionsChanged");
        };
        assert_eq!(changed.sessions.len(), 1);

        let sessions = bridge.list_sessions().await.unwrap();
        assert_eq!(sessions.len(), 1);
        let session = &sessions[0];
        assert_eq!(session.session_id, format!("session-{}", request.id()));
        assert_eq!(session.wallet_address.as_deref(), Some(WALLET_ADDRESS));

        bridge.disconnect_session(&session.session_id).await.unwrap();
        let WalletEvent::Disconnect(disconnect) = next_event(&mut events).await else {
            panic!("expected disconnect");
        };
        assert_eq!(disconnect.session_id.as_deref(), Some(session.session_id.as_str()));
        assert!(bridge.list_sessions().await.unwrap().is_empty());

        assert_eq!(state.count("init"), 1);
        assert_eq!(bridge.init_attempts(), 1);
    }

    #[tokio::test]
    async fn test_sign_data_and_transaction_approvals() {
        let (bridge, state) = scripted_bridge();
        let mut requests = bridge.subscribe(EventFilter::requests());

        bridge.handle_ton_connect_url("tc://sign").await.unwrap();
        let WalletEvent::SignDataRequest(sign) = next_event(&mut requests).await else {
            panic!("expected a sign-data request");
        };
        assert_eq!(sign.payload().as_text(), Some("Confirm login to example.org"));
        let signed = sign.approve().await.unwrap();
        assert!(!signed.signature.is_empty());
        assert_eq!(signed.domain.as_deref(), Some("example.org"));

        bridge.handle_ton_connect_url("tc://tx").await.unwrap();
        let WalletEvent::TransactionRequest(transaction) = next_event(&mut requests).await else {
            panic!("expected a transaction request");
        };
        assert_eq!(transaction.messages()[0].amount, "50000000");
        let approval = transaction.approve().await.unwrap();
        assert!(approval.signed_boc.is_some());

        let err = transaction.reject(None).await.unwrap_err();
        assert!(matches!(err, BridgeError::AlreadyHandled { .. }));
        assert_eq!(state.count("rejectTransactionRequest"), 0);
    }

    #[tokio::test]
    async fn test_engine_errors_reach_caller() {
        let (bridge, _state) = scripted_bridge();

        let err = bridge.call("burnAllFunds", None).await.unwrap_err();
        let remote = err.remote().expect("remote error");
        assert_eq!(remote.message, "Unknown method: burnAllFunds");
        assert_eq!(remote.code, Some(-32601));

        let wallets = bridge.get_wallets().await.unwrap();
        assert_eq!(wallets[0]["address"], WALLET_ADDRESS);

        let exposition = walletkit_telemetry::metrics::gather_metrics().unwrap();
        assert!(exposition.contains("walletkit_calls_failed_total"));
        assert!(exposition.contains("walletkit_init_attempts_total"));
    }

    #[tokio::test]
    async fn test_bundle_failure_fails_calls() {
        let config = BridgeConfig::default();
        let (engine, _state) = ScriptedWalletEngine::new(&config.engine_entrypoint);
        let engine = engine.failing_load("SyntaxError: unexpected token");
        let bridge = WalletKitBridge::with_engine(
            engine,
            ScriptedWalletEngine::bundle(),
            config,
            WalletKitConfig::default(),
        )
        .unwrap();

        match bridge.get_wallets().await {
            Err(BridgeError::ChannelUnavailable(message)) => {
                assert_eq!(message, "SyntaxError: unexpected token");
            }
            other => panic!("expected ChannelUnavailable, got {:?}", other),
        }
        assert!(matches!(bridge.stats().readiness, Readiness::Failed(_)));
        assert!(!bridge.is_initialized());
    }

    #[tokio::test]
    async fn test_dropping_bridge_disposes_engine() {
        let (bridge, state) = scripted_bridge();
        bridge.get_wallets().await.unwrap();

        let subscription = bridge.subscribe(EventFilter::kinds(vec![EventKind::Disconnect]));
        drop(bridge);
        drop(subscription);

        let disposed = tokio::time::timeout(WAIT, async {
            while !state.disposed.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        assert!(disposed.is_ok(), "engine was not disposed");
    }
}
