//! Readiness Gate.
//!
//! Set once when the engine reports it finished loading. Calls issued before
//! that suspend on [`ReadinessGate::wait`]. A load failure or a shutdown are
//! terminal and release every waiter with an error.

use crate::domain::BridgeError;
use tokio::sync::watch;
use tracing::{error, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Loading,
    Ready,
    Failed(String),
    Closed,
}

impl Readiness {
    fn is_settled(&self) -> bool {
        !matches!(self, Readiness::Loading)
    }
}

pub struct ReadinessGate {
    state: watch::Sender<Readiness>,
}

impl ReadinessGate {
    pub fn new() -> Self {
        let (state, _) = watch::channel(Readiness::Loading);
        Self { state }
    }

    /// Mark the engine loaded. Only the first settlement counts.
    pub fn mark_ready(&self) -> bool {
        let changed = self.settle(Readiness::Ready);
        if changed {
            info!("Engine ready");
        }
        changed
    }

    /// Mark the engine as failed to load.
    pub fn mark_failed(&self, message: &str) -> bool {
        let changed = self.settle(Readiness::Failed(message.to_string()));
        if changed {
            error!(error = message, "Engine failed to load");
        }
        changed
    }

    /// Close the gate for teardown. Overrides any earlier state.
    pub fn close(&self) {
        self.state.send_replace(Readiness::Closed);
    }

    pub fn current(&self) -> Readiness {
        self.state.borrow().clone()
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.state.borrow(), Readiness::Ready)
    }

    /// Suspend until the gate settles.
    pub async fn wait(&self) -> Result<(), BridgeError> {
        let mut rx = self.state.subscribe();
        let settled = rx
            .wait_for(Readiness::is_settled)
            .await
            .map(|state| (*state).clone())
            .unwrap_or(Readiness::Closed);

        match settled {
            Readiness::Ready => Ok(()),
            Readiness::Failed(message) => Err(BridgeError::ChannelUnavailable(message)),
            Readiness::Closed | Readiness::Loading => Err(BridgeError::ShuttingDown),
        }
    }

    fn settle(&self, next: Readiness) -> bool {
        self.state.send_if_modified(|state| {
            if state.is_settled() {
                return false;
            }
            *state = next;
            true
        })
    }
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}
