//! Multi-token completion barrier.
//!
//! Independent producers announce that a named startup stage is done via
//! [`CompletionBarrier::complete`]; independent consumers block on their
//! own subset of stages via [`CompletionBarrier::wait_for_tokens`]. A
//! single token releases every request currently waiting on it, not just
//! one. Completed tokens are never forgotten, so waits registered after
//! the fact return immediately.

use crossbeam_channel::{bounded, Sender};
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

/// Outcome of a [`CompletionBarrier::wait_for_tokens`] call.
///
/// Timeout is a reported condition, not an error: callers inspect
/// [`WaitOutcome::is_complete`] and may still make forward progress on a
/// partial completion.
#[derive(Debug, Clone)]
pub struct WaitOutcome {
    /// Diagnostic label the wait was registered under.
    pub id: String,
    /// Tokens that had not completed when the wait returned. Empty on
    /// success.
    pub remaining: HashSet<String>,
}

impl WaitOutcome {
    pub fn is_complete(&self) -> bool {
        self.remaining.is_empty()
    }

    fn complete(id: &str) -> Self {
        WaitOutcome {
            id: id.to_string(),
            remaining: HashSet::new(),
        }
    }
}

struct WaitRequest {
    request: u64,
    id: String,
    pending: HashSet<String>,
    release: Sender<()>,
}

#[derive(Default)]
struct BarrierState {
    completed: HashSet<String>,
    requests: Vec<WaitRequest>,
    next_request: u64,
}

/// In-process registry of completed startup stages with fan-out
/// notification of blocked waiters.
///
/// One mutex guards both the completed-token set and the active request
/// list; releasing a waiter is a pure channel send, so no I/O ever runs
/// under the lock. A `complete` racing a brand-new registration for the
/// same token either observes the request and releases it, or wins the
/// lock first, in which case the registering call's fast path sees the
/// token as already completed.
#[derive(Default)]
pub struct CompletionBarrier {
    state: Mutex<BarrierState>,
}

impl CompletionBarrier {
    pub fn new() -> Self {
        CompletionBarrier::default()
    }

    /// Mark a startup stage as completed. Idempotent; completing a token
    /// nobody waits on is legal and only grows the completed set.
    pub fn complete(&self, token: &str) {
        let mut state = self.state.lock().expect("barrier lock poisoned");

        if state.completed.contains(token) {
            log::debug!("Token [{}] already completed", token);
            return;
        }

        log::info!("Completing token [{}]", token);

        state.requests.retain_mut(|req| {
            if req.pending.remove(token) {
                log::debug!(
                    "Received token [{}] for [{}], remaining tokens {:?}",
                    token,
                    req.id,
                    req.pending
                );
                if req.pending.is_empty() {
                    log::debug!("Token list [{}] done, releasing waiter", req.id);
                    let _ = req.release.send(());
                    return false;
                }
            }
            true
        });

        state.completed.insert(token.to_string());
    }

    /// Whether a token has already been completed.
    pub fn is_completed(&self, token: &str) -> bool {
        let state = self.state.lock().expect("barrier lock poisoned");
        state.completed.contains(token)
    }

    /// Block the calling thread until every given token has completed or
    /// `timeout` elapses, whichever comes first.
    ///
    /// An empty token list and a fully-completed token list both return
    /// immediately without allocating any blocking primitive. On timeout
    /// the returned outcome carries the still-pending tokens; the
    /// request is removed from the barrier either way.
    pub fn wait_for_tokens(&self, id: &str, timeout: Duration, tokens: &[&str]) -> WaitOutcome {
        if tokens.is_empty() {
            return WaitOutcome::complete(id);
        }

        log::info!("Initialising wait [{}]", id);

        let (request, rx) = {
            let mut state = self.state.lock().expect("barrier lock poisoned");

            let pending: HashSet<String> = tokens
                .iter()
                .filter(|t| !state.completed.contains(**t))
                .map(|t| t.to_string())
                .collect();

            log::debug!("Tokens to be completed for [{}]: {:?}", id, pending);

            if pending.is_empty() {
                log::info!("Finished wait [{}]", id);
                return WaitOutcome::complete(id);
            }

            let (tx, rx) = bounded(1);
            let request = state.next_request;
            state.next_request += 1;
            state.requests.push(WaitRequest {
                request,
                id: id.to_string(),
                pending,
                release: tx,
            });
            (request, rx)
        };

        // Released by complete() or abandoned on timeout; either way the
        // request is unregistered below before returning.
        let _ = rx.recv_timeout(timeout);

        let mut state = self.state.lock().expect("barrier lock poisoned");
        let remaining = match state.requests.iter().position(|r| r.request == request) {
            Some(pos) => state.requests.swap_remove(pos).pending,
            // complete() already released and removed the request.
            None => HashSet::new(),
        };

        if remaining.is_empty() {
            log::info!("Finished wait [{}]", id);
        } else {
            log::warn!("Wait [{}] timed out, remaining tokens {:?}", id, remaining);
        }

        WaitOutcome {
            id: id.to_string(),
            remaining,
        }
    }
}
