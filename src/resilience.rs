//! Replay convergence, checkpoint merging, and circuit breaking for
//! recovering from partial failures without losing or duplicating work.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::error::DispatchError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    pub id: String,
    pub sequence: u64,
    pub payload: String,
}

impl Event {
    pub fn new(id: impl Into<String>, sequence: u64, payload: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            sequence,
            payload: payload.into(),
        }
    }
}

/// Keeps, for each id, the event with the highest `sequence` seen — the
/// latest write wins. Output is sorted ascending by `(sequence, id)` so
/// replaying the result is deterministic regardless of input order.
pub fn replay(events: &[Event]) -> Vec<Event> {
    let mut latest: HashMap<&str, &Event> = HashMap::new();
    for event in events {
        latest
            .entry(event.id.as_str())
            .and_modify(|existing| {
                if event.sequence > existing.sequence {
                    *existing = event;
                }
            })
            .or_insert(event);
    }
    let mut out: Vec<Event> = latest.into_values().cloned().collect();
    out.sort_by(|a, b| a.sequence.cmp(&b.sequence).then_with(|| a.id.cmp(&b.id)));
    out
}

/// True iff replaying an already-replayed stream changes nothing.
pub fn replay_converges(events: &[Event]) -> bool {
    replay(events) == replay(&replay(events))
}

/// First-seen-wins deduplication by id, preserving input order.
pub fn deduplicate(events: &[Event]) -> Vec<Event> {
    let mut seen = std::collections::HashSet::new();
    events
        .iter()
        .filter(|e| seen.insert(e.id.clone()))
        .cloned()
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Checkpoint {
    sequence: u64,
    timestamp: u64,
}

/// Tracks the last-recorded sequence per stream id and decides when a new
/// checkpoint is due.
pub struct CheckpointManager {
    interval: u64,
    checkpoints: Mutex<HashMap<String, Checkpoint>>,
}

impl CheckpointManager {
    pub fn new(interval: u64) -> Self {
        Self {
            interval: interval.max(1),
            checkpoints: Mutex::new(HashMap::new()),
        }
    }

    pub fn record(&self, id: impl Into<String>, sequence: u64, timestamp: u64) {
        self.checkpoints
            .lock()
            .insert(id.into(), Checkpoint { sequence, timestamp });
    }

    pub fn get(&self, id: &str) -> Option<(u64, u64)> {
        self.checkpoints.lock().get(id).map(|c| (c.sequence, c.timestamp))
    }

    /// A checkpoint is due once `sequence` has advanced by `interval` or
    /// more since the last recorded one (or none has been recorded yet).
    pub fn should_checkpoint(&self, id: &str, sequence: u64) -> bool {
        match self.checkpoints.lock().get(id) {
            Some(existing) => sequence.saturating_sub(existing.sequence) >= self.interval,
            None => true,
        }
    }

    pub fn all(&self) -> HashMap<String, (u64, u64)> {
        self.checkpoints
            .lock()
            .iter()
            .map(|(id, c)| (id.clone(), (c.sequence, c.timestamp)))
            .collect()
    }

    pub fn reset(&self) {
        self.checkpoints.lock().clear();
    }

    /// Merges another manager's checkpoints into this one. On id collision
    /// the entry with the later `timestamp` wins.
    pub fn merge(&self, other: &CheckpointManager) {
        let incoming = other.checkpoints.lock().clone();
        let mut ours = self.checkpoints.lock();
        for (id, candidate) in incoming {
            ours
                .entry(id)
                .and_modify(|existing| {
                    if candidate.timestamp > existing.timestamp {
                        *existing = candidate.clone();
                    }
                })
                .or_insert(candidate);
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

struct CircuitBreakerState {
    state: CircuitState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    opened_at: Option<u64>,
}

/// Point-in-time snapshot returned by [`CircuitBreaker::stats`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CircuitBreakerStats {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,
    pub opened_at: Option<u64>,
}

/// Failure/success counting circuit breaker. `now` is injected by the
/// caller rather than read from the system clock so state transitions are
/// deterministic and testable.
pub struct CircuitBreaker {
    failure_threshold: u32,
    success_threshold: u32,
    timeout_seconds: u64,
    state: Mutex<CircuitBreakerState>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, success_threshold: u32, timeout_seconds: u64) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            success_threshold: success_threshold.max(1),
            timeout_seconds,
            state: Mutex::new(CircuitBreakerState {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                consecutive_successes: 0,
                opened_at: None,
            }),
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state.lock().state
    }

    /// True if a call is currently permitted: closed or half-open. A caller
    /// should check this before attempting the guarded operation.
    pub fn is_allowed(&self, now: u64) -> bool {
        let mut state = self.state.lock();
        if state.state == CircuitState::Open {
            if let Some(opened_at) = state.opened_at {
                if now.saturating_sub(opened_at) >= self.timeout_seconds {
                    state.state = CircuitState::HalfOpen;
                    state.consecutive_failures = 0;
                    state.consecutive_successes = 0;
                    tracing::info!("circuit breaker entering half-open");
                }
            }
        }
        state.state != CircuitState::Open
    }

    pub fn record_success(&self, _now: u64) {
        let mut state = self.state.lock();
        match state.state {
            CircuitState::HalfOpen => {
                state.consecutive_failures = 0;
                state.consecutive_successes += 1;
                if state.consecutive_successes >= self.success_threshold {
                    state.state = CircuitState::Closed;
                    state.opened_at = None;
                    state.consecutive_successes = 0;
                    tracing::info!("circuit breaker closed");
                }
            }
            CircuitState::Closed => {
                state.consecutive_failures = 0;
            }
            CircuitState::Open => {}
        }
    }

    pub fn record_failure(&self, now: u64) -> Result<(), DispatchError> {
        let mut state = self.state.lock();
        match state.state {
            CircuitState::Open => Err(DispatchError::ResourceUnavailable(
                "circuit breaker is open".to_string(),
            )),
            CircuitState::HalfOpen => {
                state.state = CircuitState::Open;
                state.consecutive_successes = 0;
                state.opened_at = Some(now);
                tracing::warn!("circuit breaker reopened after half-open failure");
                Ok(())
            }
            CircuitState::Closed => {
                state.consecutive_failures += 1;
                if state.consecutive_failures >= self.failure_threshold {
                    state.state = CircuitState::Open;
                    state.opened_at = Some(now);
                    tracing::warn!(
                        failures = state.consecutive_failures,
                        "circuit breaker opened"
                    );
                }
                Ok(())
            }
        }
    }

    /// Forces the breaker back to `closed` with all counters cleared,
    /// bypassing the usual timeout/probe path. An explicit operator action,
    /// not part of the normal closed/open/half-open state machine.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.state = CircuitState::Closed;
        state.consecutive_failures = 0;
        state.consecutive_successes = 0;
        state.opened_at = None;
        tracing::info!("circuit breaker reset");
    }

    pub fn stats(&self) -> CircuitBreakerStats {
        let state = self.state.lock();
        CircuitBreakerStats {
            state: state.state,
            consecutive_failures: state.consecutive_failures,
            consecutive_successes: state.consecutive_successes,
            opened_at: state.opened_at,
        }
    }
}
