//! Test doubles for the engine side of the bridge.
//!
//! - [`RecordingChannel`] captures every instruction the bridge sends
//! - [`EngineHarness`] reads those instructions back and answers them, in any
//!   order, through the bridge's inbound callbacks

use crate::adapters::EngineInstruction;
use crate::ports::{ChannelError, EngineCallbacks, EngineChannel};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Default)]
struct Recorded {
    sent: Mutex<Vec<String>>,
    refuse: AtomicBool,
    notify: Notify,
}

/// Channel that records instead of executing.
#[derive(Clone, Default)]
pub struct RecordingChannel {
    inner: Arc<Recorded>,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `execute` fail with [`ChannelError::Rejected`].
    pub fn refuse_sends(&self, refuse: bool) {
        self.inner.refuse.store(refuse, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<String> {
        self.inner.sent.lock().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.inner.sent.lock().len()
    }

    /// Wait until more than `count` instructions were sent.
    pub async fn wait_for_more_than(&self, count: usize, within: Duration) -> bool {
        tokio::time::timeout(within, async {
            loop {
                let notified = self.inner.notify.notified();
                if self.sent_count() > count {
                    return;
                }
                notified.await;
            }
        })
        .await
        .is_ok()
    }
}

#[async_trait]
impl EngineChannel for RecordingChannel {
    async fn execute(&self, instruction: String) -> Result<(), ChannelError> {
        if self.inner.refuse.load(Ordering::SeqCst) {
            return Err(ChannelError::Rejected("refused by test".into()));
        }
        self.inner.sent.lock().push(instruction);
        self.inner.notify.notify_waiters();
        Ok(())
    }
}

/// Plays the engine against a [`RecordingChannel`].
pub struct EngineHarness {
    channel: RecordingChannel,
    callbacks: Arc<dyn EngineCallbacks>,
    entrypoint: String,
    cursor: AtomicUsize,
}

impl EngineHarness {
    pub fn new(channel: RecordingChannel, callbacks: Arc<dyn EngineCallbacks>, entrypoint: &str) -> Self {
        Self {
            channel,
            callbacks,
            entrypoint: entrypoint.to_string(),
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn channel(&self) -> &RecordingChannel {
        &self.channel
    }

    pub fn callbacks(&self) -> &Arc<dyn EngineCallbacks> {
        &self.callbacks
    }

    /// Report the engine as loaded.
    pub fn ready(&self) {
        self.callbacks.on_ready();
    }

    /// Next instruction not yet returned by this harness.
    ///
    /// Panics if none arrives in time or it cannot be decoded.
    pub async fn next_instruction(&self, within: Duration) -> EngineInstruction {
        let index = self.cursor.fetch_add(1, Ordering::SeqCst);
        assert!(
            self.channel.wait_for_more_than(index, within).await,
            "no instruction #{} within {:?}",
            index,
            within
        );
        let script = self.channel.sent()[index].clone();
        EngineInstruction::parse(&self.entrypoint, &script)
            .unwrap_or_else(|e| panic!("undecodable instruction {:?}: {}", script, e))
    }

    /// Collect the next `count` instructions.
    pub async fn next_instructions(&self, count: usize, within: Duration) -> Vec<EngineInstruction> {
        let mut instructions = Vec::with_capacity(count);
        for _ in 0..count {
            instructions.push(self.next_instruction(within).await);
        }
        instructions
    }

    /// Answer an instruction: `Ok` becomes `{"result": ..}`, `Err` becomes
    /// `{"error": ..}`.
    pub fn respond(&self, instruction: &EngineInstruction, outcome: Result<Value, Value>) {
        let body = match outcome {
            Ok(result) => json!({ "result": result }),
            Err(error) => json!({ "error": error }),
        };
        self.callbacks
            .on_response(&instruction.correlation_id.to_string(), &body.to_string());
    }

    /// Push an event envelope.
    pub fn emit(&self, event_type: &str, data: Value) {
        let envelope = json!({ "type": event_type, "data": data });
        self.callbacks.on_event(&envelope.to_string());
    }
}
