//! Call Correlation Table.
//!
//! Maps correlation IDs to callers awaiting an engine response.
//!
//! Flow:
//! 1. `invoke()` calls [`PendingCallTable::register`] and gets a oneshot receiver
//! 2. The instruction carrying that ID is sent to the engine
//! 3. The engine's delivery thread calls [`PendingCallTable::complete`]
//! 4. The caller's receiver resolves
//!
//! Every path that takes an entry out of the map (complete, cancel, expiry,
//! fail-all) goes through `DashMap::remove`, so an ID resolves at most once.

use crate::domain::correlation::CorrelationId;
use crate::domain::error::BridgeError;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{oneshot, watch};
use tracing::{debug, warn};
use walletkit_telemetry::{log_call_event, metrics};

/// What a pending caller eventually receives.
pub type CallOutcome = Result<Value, BridgeError>;

struct PendingCall {
    sender: oneshot::Sender<CallOutcome>,
    created_at: Instant,
    method: String,
    timeout: Option<Duration>,
}

/// Counters for the correlation table.
#[derive(Debug, Default)]
pub struct PendingStats {
    pub total_registered: AtomicU64,
    /// Resolved with a result
    pub total_completed: AtomicU64,
    /// Resolved with a failure
    pub total_failed: AtomicU64,
    /// Removed before resolution, or resolved after the caller left
    pub total_cancelled: AtomicU64,
    pub total_timeouts: AtomicU64,
    /// Responses whose ID matched nothing
    pub total_unmatched: AtomicU64,
}

/// Point-in-time copy of [`PendingStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingStatsSnapshot {
    pub registered: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub timeouts: u64,
    pub unmatched: u64,
    pub pending: usize,
}

pub struct PendingCallTable {
    pending: DashMap<CorrelationId, PendingCall>,
    stats: PendingStats,
    closed: AtomicBool,
}

impl PendingCallTable {
    pub fn new() -> Self {
        Self {
            pending: DashMap::new(),
            stats: PendingStats::default(),
            closed: AtomicBool::new(false),
        }
    }

    /// Register a pending call and get a receiver for its outcome.
    ///
    /// Fails with [`BridgeError::ShuttingDown`] once the table is closed.
    pub fn register(
        &self,
        method: &str,
        timeout: Option<Duration>,
    ) -> Result<(CorrelationId, oneshot::Receiver<CallOutcome>), BridgeError> {
        if self.is_closed() {
            return Err(BridgeError::ShuttingDown);
        }

        let (tx, rx) = oneshot::channel();
        let mut call = PendingCall {
            sender: tx,
            created_at: Instant::now(),
            method: method.to_string(),
            timeout,
        };

        let correlation_id = loop {
            let candidate = CorrelationId::new();
            match self.pending.entry(candidate) {
                dashmap::mapref::entry::Entry::Vacant(slot) => {
                    slot.insert(call);
                    break candidate;
                }
                dashmap::mapref::entry::Entry::Occupied(_) => {
                    // Never observed with v7 ids; retry rather than clobber.
                    call.created_at = Instant::now();
                }
            }
        };

        // A close racing with this insert may already have drained the map.
        if self.is_closed() {
            self.pending.remove(&correlation_id);
            return Err(BridgeError::ShuttingDown);
        }

        self.stats.total_registered.fetch_add(1, Ordering::Relaxed);
        metrics::record_call_issued(method);
        debug!(
            correlation_id = %correlation_id,
            method = method,
            "Registered pending call"
        );

        Ok((correlation_id, rx))
    }

    /// Resolve a pending call.
    ///
    /// Returns `true` if the entry existed and its caller was still waiting.
    /// Unknown or already-resolved IDs are logged and ignored.
    pub fn complete(&self, correlation_id: CorrelationId, outcome: CallOutcome) -> bool {
        match self.pending.remove(&correlation_id) {
            Some((_, call)) => self.finish(correlation_id, call, outcome),
            None => {
                self.stats.total_unmatched.fetch_add(1, Ordering::Relaxed);
                metrics::record_unmatched_response();
                warn!(
                    correlation_id = %correlation_id,
                    "Response for unknown or already resolved correlation ID"
                );
                false
            }
        }
    }

    /// Drop a pending call without resolving it. Its receiver observes a
    /// closed channel.
    pub fn cancel(&self, correlation_id: &CorrelationId) -> bool {
        match self.pending.remove(correlation_id) {
            Some((_, call)) => {
                self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
                metrics::record_call_resolved(&call.method, call.created_at.elapsed(), Some("cancelled"));
                log_call_event!(debug, call.method, correlation_id, "Pending call cancelled");
                true
            }
            None => false,
        }
    }

    /// Fail calls that outlived their timeout.
    ///
    /// Returns the number of calls failed.
    pub fn remove_expired(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<CorrelationId> = self
            .pending
            .iter()
            .filter(|entry| {
                entry
                    .timeout
                    .is_some_and(|timeout| now.duration_since(entry.created_at) > timeout)
            })
            .map(|entry| *entry.key())
            .collect();

        expired
            .into_iter()
            .filter(|correlation_id| self.time_out(correlation_id))
            .count()
    }

    /// Fail one call with [`BridgeError::Timeout`].
    ///
    /// Returns `false` if it already resolved.
    pub fn time_out(&self, correlation_id: &CorrelationId) -> bool {
        let Some((correlation_id, call)) = self.pending.remove(correlation_id) else {
            return false;
        };
        let after = call.timeout.unwrap_or_else(|| call.created_at.elapsed());
        warn!(
            correlation_id = %correlation_id,
            method = %call.method,
            timeout_ms = after.as_millis() as u64,
            "Pending call timed out"
        );
        self.stats.total_timeouts.fetch_add(1, Ordering::Relaxed);
        let error = BridgeError::Timeout {
            method: call.method.clone(),
            after,
        };
        self.finish(correlation_id, call, Err(error));
        true
    }

    /// Fail every pending call with `error`.
    pub fn fail_all(&self, error: BridgeError) -> usize {
        let ids: Vec<CorrelationId> = self.pending.iter().map(|entry| *entry.key()).collect();
        let mut failed = 0;
        for correlation_id in ids {
            if let Some((_, call)) = self.pending.remove(&correlation_id) {
                self.finish(correlation_id, call, Err(error.clone()));
                failed += 1;
            }
        }
        failed
    }

    /// Refuse new registrations and fail everything pending with `error`.
    pub fn close(&self, error: BridgeError) -> usize {
        self.closed.store(true, Ordering::SeqCst);
        self.fail_all(error)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Get number of currently pending calls
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Check if a correlation ID is pending
    pub fn is_pending(&self, correlation_id: &CorrelationId) -> bool {
        self.pending.contains_key(correlation_id)
    }

    pub fn stats(&self) -> &PendingStats {
        &self.stats
    }

    pub fn snapshot(&self) -> PendingStatsSnapshot {
        PendingStatsSnapshot {
            registered: self.stats.total_registered.load(Ordering::Relaxed),
            completed: self.stats.total_completed.load(Ordering::Relaxed),
            failed: self.stats.total_failed.load(Ordering::Relaxed),
            cancelled: self.stats.total_cancelled.load(Ordering::Relaxed),
            timeouts: self.stats.total_timeouts.load(Ordering::Relaxed),
            unmatched: self.stats.total_unmatched.load(Ordering::Relaxed),
            pending: self.pending.len(),
        }
    }

    fn finish(&self, correlation_id: CorrelationId, call: PendingCall, outcome: CallOutcome) -> bool {
        let elapsed = call.created_at.elapsed();
        let failure = outcome.as_ref().err().map(BridgeError::reason);
        metrics::record_call_resolved(&call.method, elapsed, failure);

        match call.sender.send(outcome) {
            Ok(()) => {
                let counter = if failure.is_some() {
                    &self.stats.total_failed
                } else {
                    &self.stats.total_completed
                };
                counter.fetch_add(1, Ordering::Relaxed);
                log_call_event!(
                    debug,
                    call.method,
                    correlation_id,
                    "Resolved pending call",
                    elapsed_ms = elapsed.as_millis() as u64,
                    failure = failure.unwrap_or("none")
                );
                true
            }
            Err(_) => {
                self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
                log_call_event!(debug, call.method, correlation_id, "Pending call receiver dropped");
                false
            }
        }
    }
}

impl Default for PendingCallTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Background sweep of expired calls. Exits when `shutdown` flips to `true`
/// or its sender is dropped.
pub async fn cleanup_task(
    table: Arc<PendingCallTable>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut cleanup_interval = tokio::time::interval(interval);
    cleanup_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cleanup_interval.tick() => {
                let removed = table.remove_expired();
                if removed > 0 {
                    debug!(removed = removed, "Cleaned up expired pending calls");
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    debug!("Pending call sweeper stopped");
                    return;
                }
            }
        }
    }
}
