//! Single-use approve/reject lifecycle shared by every request object.
//!
//! ```text
//!          approve()              call returns
//! Pending ──────────▶ Approving ──────────────▶ Approved
//!    │     reject()               call returns
//!    └──────────────▶ Rejecting ──────────────▶ Rejected
//! ```
//!
//! Leaving `Pending` is a single compare-exchange, so of two racing answers
//! exactly one issues a call. The object resolves when the call returns,
//! whether it succeeded or not.

use crate::domain::methods::ResponseMethods;
use crate::domain::{BridgeError, BridgeResult};
use crate::ports::RpcInvoker;
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Pending,
    Approving,
    Rejecting,
    Approved,
    Rejected,
}

impl RequestState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Approving,
            2 => Self::Rejecting,
            3 => Self::Approved,
            4 => Self::Rejected,
            _ => Self::Pending,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Approving => 1,
            Self::Rejecting => 2,
            Self::Approved => 3,
            Self::Rejected => 4,
        }
    }

    /// Phrase used in "already ..." usage errors.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approving => "being approved",
            Self::Rejecting => "being rejected",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Decision {
    Approve,
    Reject,
}

impl Decision {
    fn in_flight(self) -> RequestState {
        match self {
            Decision::Approve => RequestState::Approving,
            Decision::Reject => RequestState::Rejecting,
        }
    }

    fn resolved(self) -> RequestState {
        match self {
            Decision::Approve => RequestState::Approved,
            Decision::Reject => RequestState::Rejected,
        }
    }
}

/// State and back-reference shared by the clones of one request object.
pub(crate) struct RequestCore {
    request_id: String,
    methods: ResponseMethods,
    invoker: Arc<dyn RpcInvoker>,
    state: AtomicU8,
}

impl RequestCore {
    pub(crate) fn new(request_id: String, methods: ResponseMethods, invoker: Arc<dyn RpcInvoker>) -> Self {
        Self {
            request_id,
            methods,
            invoker,
            state: AtomicU8::new(RequestState::Pending.as_u8()),
        }
    }

    pub(crate) fn request_id(&self) -> &str {
        &self.request_id
    }

    pub(crate) fn state(&self) -> RequestState {
        RequestState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Issue the one correlated call this request is allowed.
    pub(crate) async fn respond(&self, decision: Decision, payload: Value) -> BridgeResult<Value> {
        self.begin(decision)?;
        let _resolve = ResolveOnDrop {
            state: &self.state,
            resolved: decision.resolved(),
        };

        let method = match decision {
            Decision::Approve => self.methods.approve,
            Decision::Reject => self.methods.reject,
        };
        debug!(request_id = %self.request_id, method, "Answering request");
        self.invoker.invoke(method, Some(payload)).await
    }

    fn begin(&self, decision: Decision) -> Result<(), BridgeError> {
        self.state
            .compare_exchange(
                RequestState::Pending.as_u8(),
                decision.in_flight().as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(|_| ())
            .map_err(|current| BridgeError::AlreadyHandled {
                request_id: self.request_id.clone(),
                state: RequestState::from_u8(current).describe(),
            })
    }
}

impl fmt::Debug for RequestCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestCore")
            .field("request_id", &self.request_id)
            .field("state", &self.state())
            .finish()
    }
}

/// Moves the request to its terminal state when the call returns or the
/// answering future is dropped.
struct ResolveOnDrop<'a> {
    state: &'a AtomicU8,
    resolved: RequestState,
}

impl Drop for ResolveOnDrop<'_> {
    fn drop(&mut self) {
        self.state.store(self.resolved.as_u8(), Ordering::Release);
    }
}
