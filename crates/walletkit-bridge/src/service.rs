//! WalletKit bridge service.
//!
//! Ties the engine channel to the correlation table, the init guard and the
//! event router.
//!
//! ## Outbound
//!
//! ```text
//! call() ──▶ ReadinessGate::wait ──▶ InitGuard::ensure ──▶ register id
//!        ──▶ render instruction ──▶ EngineChannel::execute ──▶ await oneshot
//! ```
//!
//! ## Inbound (engine delivery thread)
//!
//! - responses complete the matching pending entry
//! - events are decoded, wrapped into [`WalletEvent`]s and fanned out
//!
//! Neither path holds a lock while handlers run.

use crate::adapters::{EngineInstruction, EngineWorker, ReadinessGate, Readiness};
use crate::domain::methods;
use crate::domain::{
    cleanup_task, BridgeConfig, BridgeError, BridgeResult, CorrelationId, InitGuard,
    PendingCallTable, PendingStatsSnapshot, WalletKitConfig,
};
use crate::events::WalletEvent;
use crate::ports::{EngineBundle, EngineCallbacks, EngineChannel, RpcInvoker, ScriptEngine};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{watch, OnceCell};
use tracing::{debug, info, warn, Instrument};
use walletkit_bus::{
    EventFilter, EventHandler, EventRouter, EventStream, HandlerError, HandlerRegistration,
    Subscription,
};
use walletkit_telemetry::{bridge_span, log_engine_event, metrics};
use walletkit_types::{
    DecodeError, EventEnvelope, InboundEvent, InboundMessage, ResponseBody, SessionInfo,
};

/// Handle to one WalletKit engine connection.
///
/// Cheap to clone; all clones share the same engine, pending calls and
/// handlers.
#[derive(Clone)]
pub struct WalletKitBridge {
    inner: Arc<Inner>,
}

struct Inner {
    engine_config: Mutex<WalletKitConfig>,
    outbound: Arc<Outbound>,
    inbound: Arc<Inbound>,
    init: InitGuard,
    sweeper: Mutex<Option<watch::Sender<bool>>>,
}

/// Sending side. Holds no reference back to [`Inner`], so an init attempt
/// parked in the guard cannot keep the bridge alive.
struct Outbound {
    config: BridgeConfig,
    channel: Arc<dyn EngineChannel>,
    inbound: Arc<Inbound>,
    closed: AtomicBool,
}

/// Bridge statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeStats {
    pub calls: PendingStatsSnapshot,
    pub init_attempts: u64,
    pub initialized: bool,
    pub handlers: usize,
    pub events_dispatched: u64,
    pub handler_failures: u64,
    pub readiness: Readiness,
}

impl WalletKitBridge {
    /// Bridge over a channel whose transport delivers into [`Self::callbacks`].
    pub fn new<C>(channel: C, config: BridgeConfig, engine_config: WalletKitConfig) -> BridgeResult<Self>
    where
        C: EngineChannel + 'static,
    {
        Self::connect(config, engine_config, |_| Ok(channel))
    }

    /// Bridge over a channel built from the bridge's own callbacks.
    pub fn connect<C, F>(config: BridgeConfig, engine_config: WalletKitConfig, make_channel: F) -> BridgeResult<Self>
    where
        C: EngineChannel + 'static,
        F: FnOnce(Arc<dyn EngineCallbacks>) -> BridgeResult<C>,
    {
        config.validate()?;
        engine_config.validate()?;

        let slot: BridgeSlot = Arc::new(OnceCell::new());
        let inbound = Arc::new(Inbound::new(Arc::new(BridgeInvoker { slot: slot.clone() })));
        let channel: Arc<dyn EngineChannel> = Arc::new(make_channel(inbound.clone())?);

        let outbound = Arc::new(Outbound {
            config,
            channel,
            inbound: inbound.clone(),
            closed: AtomicBool::new(false),
        });
        let inner = Arc::new(Inner {
            engine_config: Mutex::new(engine_config),
            outbound,
            inbound,
            init: InitGuard::new(),
            sweeper: Mutex::new(None),
        });
        let _ = slot.set(Arc::downgrade(&inner));
        inner.start_sweeper();

        info!(
            entrypoint = %inner.outbound.config.engine_entrypoint,
            call_timeout_ms = inner.outbound.config.call_timeout.map(|t| t.as_millis() as u64),
            "WalletKit bridge created"
        );
        Ok(Self { inner })
    }

    /// Bridge over an in-process engine running on its own thread.
    pub fn with_engine<E: ScriptEngine>(
        engine: E,
        bundle: EngineBundle,
        config: BridgeConfig,
        engine_config: WalletKitConfig,
    ) -> BridgeResult<Self> {
        let entrypoint = config.engine_entrypoint.clone();
        Self::connect(config, engine_config, move |callbacks| {
            EngineWorker::spawn(engine, bundle, callbacks, &entrypoint)
        })
    }

    /// Inbound callbacks for the engine transport.
    pub fn callbacks(&self) -> Arc<dyn EngineCallbacks> {
        self.inner.inbound.clone()
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.inner.outbound.config
    }

    /// Explicit init with `config`.
    ///
    /// Always runs a fresh init call, even if the engine is already set up.
    /// The config also becomes the one used by later automatic retries.
    pub async fn init(&self, config: WalletKitConfig) -> BridgeResult<()> {
        config.validate()?;
        *self.inner.engine_config.lock() = config.clone();
        self.inner.init.reinitialize(self.inner.init_call(config)).await
    }

    /// Run the engine's one-time setup unless it already succeeded.
    pub async fn ensure_initialized(&self) -> BridgeResult<()> {
        self.inner.ensure_initialized().await
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.init.is_initialized()
    }

    pub fn init_attempts(&self) -> u64 {
        self.inner.init.attempts()
    }

    /// Call an engine method, initialising the engine first if needed.
    pub async fn call(&self, method: &str, payload: Option<Value>) -> BridgeResult<Value> {
        self.inner.call(method, payload).await
    }

    /// Call and decode the result.
    pub async fn call_as<T: DeserializeOwned>(&self, method: &str, payload: Option<Value>) -> BridgeResult<T> {
        let result = self.call(method, payload).await?;
        serde_json::from_value(result)
            .map_err(|e| BridgeError::Protocol(format!("unexpected {} result: {}", method, e)))
    }

    /// Call an engine method without touching the init guard.
    pub async fn invoke(&self, method: &str, payload: Option<Value>) -> BridgeResult<Value> {
        self.inner.outbound.invoke(method, payload).await
    }

    /// Hand a `tc://` / universal link to the engine. Connect requests it
    /// triggers arrive as events.
    pub async fn handle_ton_connect_url(&self, url: &str) -> BridgeResult<()> {
        self.call(methods::HANDLE_TON_CONNECT_URL, Some(json!({ "url": url })))
            .await
            .map(|_| ())
    }

    pub async fn list_sessions(&self) -> BridgeResult<Vec<SessionInfo>> {
        self.call_as(methods::LIST_SESSIONS, None).await
    }

    pub async fn disconnect_session(&self, session_id: &str) -> BridgeResult<()> {
        self.call(methods::DISCONNECT_SESSION, Some(json!({ "sessionId": session_id })))
            .await
            .map(|_| ())
    }

    /// Wallets known to the engine, as the engine describes them.
    pub async fn get_wallets(&self) -> BridgeResult<Vec<Value>> {
        self.call_as(methods::GET_WALLETS, None).await
    }

    /// Register a handler for every event.
    pub fn add_event_handler<H>(&self, handler: H) -> HandlerRegistration
    where
        H: EventHandler<WalletEvent> + 'static,
    {
        self.inner.inbound.router.add_handler(handler)
    }

    pub fn add_event_handler_fn<F>(&self, handler: F) -> HandlerRegistration
    where
        F: Fn(&WalletEvent) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.inner.inbound.router.add_handler_fn(handler)
    }

    /// Register a handler for events passing `filter`.
    pub fn add_filtered_event_handler<H>(&self, filter: EventFilter, handler: H) -> HandlerRegistration
    where
        H: EventHandler<WalletEvent> + 'static,
    {
        self.inner.inbound.router.add_filtered_handler(filter, handler)
    }

    pub fn subscribe(&self, filter: EventFilter) -> Subscription<WalletEvent> {
        self.inner.inbound.router.subscribe(filter)
    }

    pub fn event_stream(&self, filter: EventFilter) -> EventStream<WalletEvent> {
        self.inner.inbound.router.event_stream(filter)
    }

    pub fn stats(&self) -> BridgeStats {
        let inbound = &self.inner.inbound;
        BridgeStats {
            calls: inbound.pending.snapshot(),
            init_attempts: self.inner.init.attempts(),
            initialized: self.inner.init.is_initialized(),
            handlers: inbound.router.handler_count(),
            events_dispatched: inbound.router.events_dispatched(),
            handler_failures: inbound.router.handler_failures(),
            readiness: inbound.readiness.current(),
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.outbound.closed.load(Ordering::SeqCst)
    }

    /// Tear down: fail every pending call with [`BridgeError::ShuttingDown`],
    /// stop the sweeper and refuse further calls. Idempotent.
    pub fn shutdown(&self) {
        self.inner.shutdown();
    }
}

impl std::fmt::Debug for WalletKitBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletKitBridge")
            .field("stats", &self.stats())
            .finish()
    }
}

impl Inner {
    async fn call(&self, method: &str, payload: Option<Value>) -> BridgeResult<Value> {
        if self.outbound.closed.load(Ordering::SeqCst) {
            return Err(BridgeError::ShuttingDown);
        }
        // A failed load is reported as such, not as a failed init attempt.
        self.inbound.readiness.wait().await?;
        self.ensure_initialized().await?;
        self.outbound.invoke(method, payload).await
    }

    async fn ensure_initialized(&self) -> BridgeResult<()> {
        self.init
            .ensure(|| {
                let config = self.engine_config.lock().clone();
                self.init_call(config)
            })
            .await
    }

    /// The `init` call as a detached future, shared by every caller that
    /// joins the attempt.
    fn init_call(&self, config: WalletKitConfig) -> impl Future<Output = BridgeResult<()>> + Send + 'static {
        let outbound = self.outbound.clone();
        async move {
            let payload = serde_json::to_value(&config)?;
            outbound.invoke(methods::INIT, Some(payload)).await.map(|_| ())
        }
    }

    fn start_sweeper(self: &Arc<Self>) {
        let config = &self.outbound.config;
        if config.call_timeout.is_none() {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("No runtime, expired calls are failed by their callers only");
            return;
        };
        let (tx, rx) = watch::channel(false);
        runtime.spawn(cleanup_task(
            self.inbound.pending.clone(),
            config.cleanup_interval,
            rx,
        ));
        *self.sweeper.lock() = Some(tx);
    }

    fn shutdown(&self) {
        if self.outbound.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inbound.readiness.close();
        let failed = self.inbound.pending.close(BridgeError::ShuttingDown);
        if let Some(sweeper) = self.sweeper.lock().take() {
            let _ = sweeper.send(true);
        }
        self.init.reset();
        info!(failed_calls = failed, "WalletKit bridge shut down");
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Outbound {
    async fn invoke(&self, method: &str, payload: Option<Value>) -> BridgeResult<Value> {
        let span = bridge_span!("bridge_invoke", method = method);
        self.invoke_inner(method, payload).instrument(span).await
    }

    async fn invoke_inner(&self, method: &str, payload: Option<Value>) -> BridgeResult<Value> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BridgeError::ShuttingDown);
        }
        self.inbound.readiness.wait().await?;

        let pending = &self.inbound.pending;
        let (correlation_id, mut rx) = pending.register(method, self.config.call_timeout)?;
        let _cancel = CancelOnDrop {
            table: pending,
            correlation_id,
        };

        let rendered = EngineInstruction::new(correlation_id, method, payload)
            .render(&self.config.engine_entrypoint, self.config.inline_payload_limit)?;
        debug!(
            correlation_id = %correlation_id,
            encoding = rendered.encoding.as_str(),
            "Sending instruction"
        );
        self.channel
            .execute(rendered.script)
            .await
            .map_err(|e| BridgeError::ChannelUnavailable(e.to_string()))?;

        let received = match self.config.call_timeout {
            None => (&mut rx).await,
            Some(after) => match tokio::time::timeout(after, &mut rx).await {
                Ok(received) => received,
                Err(_) => {
                    pending.time_out(&correlation_id);
                    rx.await
                }
            },
        };
        received.unwrap_or(Err(BridgeError::Cancelled))
    }
}

/// Removes the pending entry if the awaiting call is abandoned. A no-op once
/// the entry resolved.
struct CancelOnDrop<'a> {
    table: &'a PendingCallTable,
    correlation_id: CorrelationId,
}

impl Drop for CancelOnDrop<'_> {
    fn drop(&mut self) {
        self.table.cancel(&self.correlation_id);
    }
}

type BridgeSlot = Arc<OnceCell<Weak<Inner>>>;

/// Back-reference handed to request objects. Weak, so request events kept
/// in subscriber buffers do not keep the bridge alive.
struct BridgeInvoker {
    slot: BridgeSlot,
}

#[async_trait]
impl RpcInvoker for BridgeInvoker {
    async fn invoke(&self, method: &str, payload: Option<Value>) -> BridgeResult<Value> {
        let inner = self
            .slot
            .get()
            .and_then(Weak::upgrade)
            .ok_or(BridgeError::ShuttingDown)?;
        inner.call(method, payload).await
    }
}

/// Receiving side: everything the engine's delivery thread touches.
struct Inbound {
    pending: Arc<PendingCallTable>,
    router: EventRouter<WalletEvent>,
    readiness: ReadinessGate,
    invoker: Arc<BridgeInvoker>,
}

impl Inbound {
    fn new(invoker: Arc<BridgeInvoker>) -> Self {
        Self {
            pending: Arc::new(PendingCallTable::new()),
            router: EventRouter::new(),
            readiness: ReadinessGate::new(),
            invoker,
        }
    }

    fn complete(&self, correlation_id: &str, body: Result<ResponseBody, DecodeError>) {
        let Ok(correlation_id) = CorrelationId::parse(correlation_id) else {
            metrics::record_unmatched_response();
            warn!(correlation_id, "Dropping response with malformed correlation ID");
            return;
        };

        let outcome = match body {
            Ok(ResponseBody::Result(value)) => Ok(value),
            Ok(ResponseBody::Error(error)) => Err(BridgeError::Remote(error.into())),
            Err(e) => {
                warn!(correlation_id = %correlation_id, error = %e, "Malformed response body");
                Err(BridgeError::Protocol(format!("malformed response: {}", e)))
            }
        };
        self.pending.complete(correlation_id, outcome);
    }

    fn route(&self, envelope: EventEnvelope) {
        let tag = envelope.event_type.clone();
        let event = match InboundEvent::decode(envelope) {
            Ok(InboundEvent::Unknown(_)) => {
                log_engine_event!(debug, tag, "Ignoring unknown event type");
                metrics::record_event_dropped("unknown_type");
                return;
            }
            Ok(event) => event,
            Err(e) => {
                log_engine_event!(warn, tag, "Dropping undecodable event", error = %e);
                metrics::record_event_dropped(e.reason());
                return;
            }
        };

        let invoker: Arc<dyn RpcInvoker> = self.invoker.clone();
        let Some(event) = WalletEvent::from_inbound(event, &invoker) else {
            return;
        };
        let report = self.router.dispatch(event);
        metrics::record_event_dispatched(&tag, report.failed);
    }
}

impl EngineCallbacks for Inbound {
    fn on_ready(&self) {
        self.readiness.mark_ready();
    }

    fn on_load_failed(&self, message: &str) {
        self.readiness.mark_failed(message);
    }

    fn on_response(&self, correlation_id: &str, raw: &str) {
        self.complete(correlation_id, ResponseBody::parse(raw));
    }

    fn on_event(&self, raw: &str) {
        match EventEnvelope::parse(raw) {
            Ok(envelope) => self.route(envelope),
            Err(e) => {
                warn!(error = %e, "Dropping malformed event envelope");
                metrics::record_event_dropped(e.reason());
            }
        }
    }

    fn on_message(&self, raw: &str) {
        match InboundMessage::parse(raw) {
            Ok(InboundMessage::Response { id, body }) => self.complete(&id, body),
            Ok(InboundMessage::Event(envelope)) => self.route(envelope),
            Err(e) => {
                warn!(error = %e, "Dropping unroutable engine message");
                metrics::record_event_dropped(e.reason());
            }
        }
    }
}
