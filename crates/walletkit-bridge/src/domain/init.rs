//! Auto-Init Guard.
//!
//! Runs the engine's one-time setup lazily, exactly once per success.
//!
//! ```text
//!            ensure()                     success
//! NotStarted ────────▶ InProgress{n} ───────────────▶ Done
//!      ▲                    │                          │
//!      └────── failure ─────┘      reinitialize() ─────┘ (fresh attempt)
//! ```
//!
//! Concurrent callers arriving while an attempt is in progress await the same
//! shared outcome; only the caller that started the attempt supplied its
//! future. Transitions are keyed by attempt number so a superseded attempt
//! cannot overwrite the state of a newer one.

use crate::domain::error::BridgeError;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};
use walletkit_telemetry::metrics;

type InitOutcome = Result<(), BridgeError>;
type SharedInit = Shared<BoxFuture<'static, InitOutcome>>;

enum InitState {
    NotStarted,
    InProgress { attempt: u64, outcome: SharedInit },
    Done,
}

impl InitState {
    fn name(&self) -> &'static str {
        match self {
            InitState::NotStarted => "not_started",
            InitState::InProgress { .. } => "in_progress",
            InitState::Done => "done",
        }
    }
}

pub struct InitGuard {
    state: Mutex<InitState>,
    attempts: AtomicU64,
    last_failure: Mutex<Option<BridgeError>>,
}

impl InitGuard {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(InitState::NotStarted),
            attempts: AtomicU64::new(0),
            last_failure: Mutex::new(None),
        }
    }

    /// Make sure setup has succeeded, starting an attempt if none is running.
    ///
    /// `start` is only invoked when this caller begins a new attempt.
    pub async fn ensure<F, Fut>(&self, start: F) -> InitOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = InitOutcome> + Send + 'static,
    {
        let (attempt, outcome) = {
            let mut state = self.state.lock();
            let in_flight = match &*state {
                InitState::Done => return Ok(()),
                InitState::InProgress { attempt, outcome } => Some((*attempt, outcome.clone())),
                InitState::NotStarted => None,
            };
            match in_flight {
                Some((attempt, outcome)) => {
                    debug!(attempt, "Joining in-flight engine init");
                    (attempt, outcome)
                }
                None => self.begin(&mut state, start()),
            }
        };
        self.settle(attempt, outcome).await
    }

    /// Run a fresh attempt regardless of the current state.
    ///
    /// Callers that arrive while it runs join it.
    pub async fn reinitialize<Fut>(&self, init: Fut) -> InitOutcome
    where
        Fut: Future<Output = InitOutcome> + Send + 'static,
    {
        let (attempt, outcome) = {
            let mut state = self.state.lock();
            if let InitState::InProgress { attempt, .. } = &*state {
                debug!(superseded = *attempt, "Explicit init supersedes in-flight attempt");
            }
            self.begin(&mut state, init)
        };
        self.settle(attempt, outcome).await
    }

    pub fn is_initialized(&self) -> bool {
        matches!(*self.state.lock(), InitState::Done)
    }

    /// Number of attempts started so far.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Failure of the most recent failed attempt, cleared on success.
    pub fn last_failure(&self) -> Option<BridgeError> {
        self.last_failure.lock().clone()
    }

    pub fn state_name(&self) -> &'static str {
        self.state.lock().name()
    }

    /// Drop any in-flight attempt. Callers already awaiting it still get
    /// its outcome.
    pub fn reset(&self) {
        *self.state.lock() = InitState::NotStarted;
    }

    fn begin<Fut>(&self, state: &mut InitState, init: Fut) -> (u64, SharedInit)
    where
        Fut: Future<Output = InitOutcome> + Send + 'static,
    {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        info!(attempt, "Starting engine init");

        let outcome = async move {
            let result = init.await;
            metrics::record_init_attempt(result.is_ok());
            result.map_err(|source| BridgeError::InitializationFailed {
                attempt,
                source: Box::new(source),
            })
        }
        .boxed()
        .shared();

        *state = InitState::InProgress {
            attempt,
            outcome: outcome.clone(),
        };
        (attempt, outcome)
    }

    async fn settle(&self, attempt: u64, outcome: SharedInit) -> InitOutcome {
        let result = outcome.await;

        let mut state = self.state.lock();
        let current = matches!(&*state, InitState::InProgress { attempt: a, .. } if *a == attempt);
        if current {
            match &result {
                Ok(()) => {
                    *state = InitState::Done;
                    *self.last_failure.lock() = None;
                    info!(attempt, "Engine init complete");
                }
                Err(error) => {
                    *state = InitState::NotStarted;
                    *self.last_failure.lock() = Some(error.clone());
                    warn!(attempt, error = %error, "Engine init failed, next call retries");
                }
            }
        }
        result
    }
}

impl Default for InitGuard {
    fn default() -> Self {
        Self::new()
    }
}
