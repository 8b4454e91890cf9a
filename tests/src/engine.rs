//! Scripted in-process wallet engine.
//!
//! Implements [`ScriptEngine`] by reading back each instruction and answering
//! it from a small in-memory wallet: one wallet, a session list, and dApp
//! requests triggered by `handleTonConnectUrl`. Answers and events are
//! delivered from the engine thread while draining jobs, like a real engine.

use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use walletkit_bridge::adapters::EngineInstruction;
use walletkit_bridge::{EngineBundle, EngineCallbacks, EngineError, ScriptEngine};

pub const WALLET_ADDRESS: &str = "UQBvW8Z5huBkMJYdnfAEM5JqTNkuWX3diqYENkWsIL0XggGG";
pub const BUNDLE_FILENAME: &str = "walletkit.bundle.js";

/// What the engine saw, readable from the test thread.
#[derive(Default)]
pub struct EngineState {
    pub calls: Mutex<Vec<(String, Option<Value>)>>,
    pub sessions: Mutex<Vec<Value>>,
    pub disposed: AtomicBool,
    next_request: AtomicU64,
}

impl EngineState {
    pub fn methods(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(method, _)| method.clone()).collect()
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls.lock().iter().filter(|(m, _)| m == method).count()
    }

    pub fn payloads(&self, method: &str) -> Vec<Value> {
        self.calls
            .lock()
            .iter()
            .filter(|(m, _)| m == method)
            .filter_map(|(_, payload)| payload.clone())
            .collect()
    }
}

enum Job {
    Respond { id: String, body: Value },
    Emit(Value),
}

pub struct ScriptedWalletEngine {
    entrypoint: String,
    callbacks: Option<Arc<dyn EngineCallbacks>>,
    jobs: VecDeque<Job>,
    state: Arc<EngineState>,
    load_error: Option<String>,
}

impl ScriptedWalletEngine {
    pub fn new(entrypoint: &str) -> (Self, Arc<EngineState>) {
        let state = Arc::new(EngineState::default());
        let engine = Self {
            entrypoint: entrypoint.to_string(),
            callbacks: None,
            jobs: VecDeque::new(),
            state: state.clone(),
            load_error: None,
        };
        (engine, state)
    }

    /// Make the bundle fail to evaluate with `message`.
    pub fn failing_load(mut self, message: &str) -> Self {
        self.load_error = Some(message.to_string());
        self
    }

    pub fn bundle() -> EngineBundle {
        EngineBundle::new("globalThis.__walletKitCall = () => {};", BUNDLE_FILENAME)
    }

    fn next_request_id(&self) -> u64 {
        self.state.next_request.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn handle(&mut self, id: String, method: &str, payload: Option<Value>) {
        let payload = payload.unwrap_or(Value::Null);
        let respond = |body: Value| Job::Respond { id: id.clone(), body };

        match method {
            "init" | "rejectConnectRequest" | "rejectTransactionRequest" | "rejectSignDataRequest" => {
                self.jobs.push_back(respond(json!({ "result": null })));
            }
            "getWallets" => {
                self.jobs.push_back(respond(json!({
                    "result": [{ "address": WALLET_ADDRESS, "version": "v5r1" }]
                })));
            }
            "handleTonConnectUrl" => {
                let url = payload["url"].as_str().unwrap_or_default().to_string();
                self.jobs.push_back(respond(json!({ "result": null })));
                let event = self.request_for(&url);
                self.jobs.push_back(Job::Emit(event));
            }
            "approveConnectRequest" => {
                let request_id = payload["event"]["id"].as_str().unwrap_or_default().to_string();
                let session = json!({
                    "sessionId": format!("session-{}", request_id),
                    "dappName": payload["event"]["dapp"]["name"],
                    "walletAddress": payload["walletAddress"],
                });
                let sessions = {
                    let mut sessions = self.state.sessions.lock();
                    sessions.push(session);
                    sessions.clone()
                };
                self.jobs.push_back(respond(json!({ "result": null })));
                self.jobs.push_back(Job::Emit(json!({
                    "type": "sessionsChanged",
                    "data": { "sessions": sessions }
                })));
            }
            "listSessions" => {
                let sessions = self.state.sessions.lock().clone();
                self.jobs.push_back(respond(json!({ "result": sessions })));
            }
            "disconnect" => {
                let session_id = payload["sessionId"].as_str().unwrap_or_default().to_string();
                self.state
                    .sessions
                    .lock()
                    .retain(|s| s["sessionId"].as_str() != Some(session_id.as_str()));
                self.jobs.push_back(respond(json!({ "result": null })));
                self.jobs.push_back(Job::Emit(json!({
                    "type": "disconnect",
                    "data": { "sessionId": session_id, "reason": "wallet" }
                })));
            }
            "approveTransactionRequest" => {
                self.jobs.push_back(respond(json!({
                    "result": { "signedBoc": "te6cckEBAQEAAgAAAEysuc0=" }
                })));
            }
            "approveSignDataRequest" => {
                self.jobs.push_back(respond(json!({
                    "result": {
                        "signature": "c2lnbmVkIGJ5IHRoZSB3YWxsZXQ=",
                        "address": WALLET_ADDRESS,
                        "timestamp": 1_700_000_000u64,
                        "domain": "example.org"
                    }
                })));
            }
            other => {
                self.jobs.push_back(respond(json!({
                    "error": { "message": format!("Unknown method: {}", other), "code": -32601 }
                })));
            }
        }
    }

    fn request_for(&self, url: &str) -> Value {
        let id = self.next_request_id();
        let dapp = json!({ "name": "Example dApp", "url": "https://example.org" });
        if url.contains("sign") {
            json!({
                "type": "signDataRequest",
                "data": {
                    "id": id,
                    "dapp": dapp,
                    "walletAddress": WALLET_ADDRESS,
                    "payload": { "schema_crc": 0, "text": "Confirm login to example.org" }
                }
            })
        } else if url.contains("tx") {
            json!({
                "type": "transactionRequest",
                "data": {
                    "id": id,
                    "dapp": dapp,
                    "walletAddress": WALLET_ADDRESS,
                    "request": {
                        "validUntil": 1_900_000_000u64,
                        "messages": [{ "address": "EQCxE6mUtQJKFnGfaROTKOt1lZbDiiX1kCixRv7Nw2Id_sDs", "amount": "50000000" }]
                    }
                }
            })
        } else {
            json!({
                "type": "connectRequest",
                "data": {
                    "id": id,
                    "dapp": dapp,
                    "requestedItems": [{ "name": "ton_addr" }]
                }
            })
        }
    }
}

impl ScriptEngine for ScriptedWalletEngine {
    fn install_callbacks(&mut self, callbacks: Arc<dyn EngineCallbacks>) -> Result<(), EngineError> {
        self.callbacks = Some(callbacks);
        Ok(())
    }

    fn evaluate(&mut self, script: &str, filename: &str) -> Result<Value, EngineError> {
        if filename == BUNDLE_FILENAME {
            return match &self.load_error {
                Some(message) => Err(EngineError::new(Some(message))),
                None => Ok(Value::Null),
            };
        }

        let instruction = EngineInstruction::parse(&self.entrypoint, script)
            .map_err(|e| EngineError::from(e.to_string()))?;
        self.state
            .calls
            .lock()
            .push((instruction.method.clone(), instruction.payload.clone()));
        self.handle(
            instruction.correlation_id.to_string(),
            &instruction.method,
            instruction.payload,
        );
        Ok(Value::Null)
    }

    fn run_pending_jobs(&mut self) -> Result<usize, EngineError> {
        let Some(callbacks) = self.callbacks.clone() else {
            return Ok(0);
        };
        let mut ran = 0;
        while let Some(job) = self.jobs.pop_front() {
            match job {
                Job::Respond { id, body } => callbacks.on_response(&id, &body.to_string()),
                Job::Emit(envelope) => callbacks.on_event(&envelope.to_string()),
            }
            ran += 1;
        }
        Ok(ran)
    }

    fn dispose(&mut self) {
        self.state.disposed.store(true, Ordering::SeqCst);
    }
}
