//! In-process engine worker.
//!
//! Owns one [`ScriptEngine`] on a dedicated thread. That thread is the single
//! delivery context: every response and event the engine emits reaches the
//! bridge from it.
//!
//! Lifecycle:
//! 1. install the host callbacks, evaluate the bundle, drain pending jobs
//! 2. report `on_ready` (or `on_load_failed` and exit)
//! 3. evaluate each instruction, draining pending jobs after each one
//! 4. dispose the engine when stopped or dropped

use crate::adapters::command::EngineInstruction;
use crate::domain::BridgeError;
use crate::ports::{ChannelError, EngineBundle, EngineCallbacks, EngineChannel, EngineError, ScriptEngine};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

const THREAD_NAME: &str = "walletkit-engine";
const INSTRUCTION_FILENAME: &str = "<instruction>";

enum WorkerCommand {
    Evaluate(String),
    Stop,
}

pub struct EngineWorker {
    commands: mpsc::UnboundedSender<WorkerCommand>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl EngineWorker {
    /// Start the engine thread.
    ///
    /// `entrypoint` lets the worker turn an instruction that fails to evaluate
    /// into an error response for its caller.
    pub fn spawn<E: ScriptEngine>(
        engine: E,
        bundle: EngineBundle,
        callbacks: Arc<dyn EngineCallbacks>,
        entrypoint: &str,
    ) -> Result<Self, BridgeError> {
        let (commands, rx) = mpsc::unbounded_channel();
        let entrypoint = entrypoint.to_string();

        let handle = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || run_engine(engine, bundle, callbacks, rx, entrypoint))
            .map_err(|e| BridgeError::ChannelUnavailable(format!("failed to start engine thread: {}", e)))?;

        Ok(Self {
            commands,
            thread: Mutex::new(Some(handle)),
        })
    }

    pub fn is_running(&self) -> bool {
        self.thread
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop the engine thread and dispose the engine.
    ///
    /// Instructions already queued are evaluated first.
    pub fn stop(&self) {
        let Some(handle) = self.thread.lock().take() else {
            return;
        };
        let _ = self.commands.send(WorkerCommand::Stop);

        // Stopping from a callback on the engine thread itself cannot join.
        if handle.thread().id() == thread::current().id() {
            return;
        }
        if handle.join().is_err() {
            warn!("Engine thread panicked");
        }
    }
}

impl Drop for EngineWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[async_trait]
impl EngineChannel for EngineWorker {
    async fn execute(&self, instruction: String) -> Result<(), ChannelError> {
        self.commands
            .send(WorkerCommand::Evaluate(instruction))
            .map_err(|_| ChannelError::Closed)
    }
}

fn run_engine<E: ScriptEngine>(
    mut engine: E,
    bundle: EngineBundle,
    callbacks: Arc<dyn EngineCallbacks>,
    mut commands: mpsc::UnboundedReceiver<WorkerCommand>,
    entrypoint: String,
) {
    if let Err(e) = load(&mut engine, &bundle, callbacks.clone()) {
        callbacks.on_load_failed(&e.message);
        engine.dispose();
        return;
    }
    info!(bundle = %bundle.filename, "Engine bundle loaded");
    callbacks.on_ready();

    while let Some(command) = commands.blocking_recv() {
        match command {
            WorkerCommand::Evaluate(script) => {
                match engine.evaluate(&script, INSTRUCTION_FILENAME) {
                    // Answers arrive through the callbacks; the completion value is only logged.
                    Ok(value) => trace!(completion = %value, "Instruction evaluated"),
                    Err(e) => {
                        warn!(error = %e, "Instruction evaluation failed");
                        report_failure(callbacks.as_ref(), &entrypoint, &script, &e);
                    }
                }
                drain_jobs(&mut engine);
            }
            WorkerCommand::Stop => break,
        }
    }

    engine.dispose();
    info!("Engine disposed");
}

fn load<E: ScriptEngine>(
    engine: &mut E,
    bundle: &EngineBundle,
    callbacks: Arc<dyn EngineCallbacks>,
) -> Result<(), EngineError> {
    engine.install_callbacks(callbacks)?;
    engine.evaluate(&bundle.source, &bundle.filename)?;
    engine.run_pending_jobs()?;
    Ok(())
}

fn drain_jobs<E: ScriptEngine>(engine: &mut E) {
    match engine.run_pending_jobs() {
        Ok(0) => {}
        Ok(ran) => debug!(jobs = ran, "Drained engine jobs"),
        Err(e) => warn!(error = %e, "Engine job failed"),
    }
}

/// Answer the instruction's caller with the evaluation error, if the
/// instruction can be read back.
fn report_failure(callbacks: &dyn EngineCallbacks, entrypoint: &str, script: &str, error: &EngineError) {
    match EngineInstruction::parse(entrypoint, script) {
        Ok(instruction) => {
            let body = json!({ "error": { "message": error.message } });
            callbacks.on_response(&instruction.correlation_id.to_string(), &body.to_string());
        }
        Err(e) => warn!(error = %e, "Failed instruction has no correlation id"),
    }
}
