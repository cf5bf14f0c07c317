//! Four-level escalation state machine driven by failure bursts and success
//! streaks. Adjusts the retry/timeout budget every other subsystem reads.

use parking_lot::Mutex;

/// Total order: `Normal < Watch < Restricted < Halted`. Declaration order
/// drives the derived `Ord`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PolicyLevel {
    Normal,
    Watch,
    Restricted,
    Halted,
}

impl PolicyLevel {
    const ALL: [PolicyLevel; 4] = [
        PolicyLevel::Normal,
        PolicyLevel::Watch,
        PolicyLevel::Restricted,
        PolicyLevel::Halted,
    ];

    fn index(self) -> usize {
        Self::ALL.iter().position(|l| *l == self).unwrap()
    }

    pub fn max_retries(self) -> u32 {
        match self {
            PolicyLevel::Normal => 3,
            PolicyLevel::Watch => 2,
            PolicyLevel::Restricted => 1,
            PolicyLevel::Halted => 0,
        }
    }

    pub fn timeout_seconds(self) -> u64 {
        match self {
            PolicyLevel::Normal => 30,
            PolicyLevel::Watch => 20,
            PolicyLevel::Restricted => 10,
            PolicyLevel::Halted => 5,
        }
    }

    /// Success streak required to de-escalate one level toward `Normal`.
    /// `Normal` has no threshold: there is nowhere lower to go.
    pub fn deescalate_threshold(self) -> Option<u32> {
        match self {
            PolicyLevel::Normal => None,
            PolicyLevel::Watch => Some(4),
            PolicyLevel::Restricted => Some(7),
            PolicyLevel::Halted => Some(10),
        }
    }

    fn step_toward_halted(self) -> PolicyLevel {
        Self::ALL[(self.index() + 1).min(Self::ALL.len() - 1)]
    }

    fn step_toward_normal(self) -> PolicyLevel {
        Self::ALL[self.index().saturating_sub(1)]
    }
}

impl Default for PolicyLevel {
    fn default() -> Self {
        PolicyLevel::Normal
    }
}

/// Unknown initial levels fall back to `Normal`, which parsing from an
/// external string representation can rely on.
pub fn parse_level(name: &str) -> PolicyLevel {
    match name {
        "watch" => PolicyLevel::Watch,
        "restricted" => PolicyLevel::Restricted,
        "halted" => PolicyLevel::Halted,
        _ => PolicyLevel::Normal,
    }
}

/// Advances one level toward `Halted` when `failure_burst > 2`; otherwise
/// returns `current` unchanged. Saturates at `Halted`.
pub fn next_policy(current: PolicyLevel, failure_burst: u32) -> PolicyLevel {
    if failure_burst > 2 {
        current.step_toward_halted()
    } else {
        current
    }
}

/// True iff `success_streak` has met the de-escalation threshold for
/// `current` and `current` isn't already `Normal`.
pub fn should_deescalate(current: PolicyLevel, success_streak: u32) -> bool {
    match current.deescalate_threshold() {
        Some(threshold) => success_streak >= threshold,
        None => false,
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolicyTransition {
    pub from: PolicyLevel,
    pub to: PolicyLevel,
    pub reason: String,
    pub timestamp: u64,
}

/// Thread-safe wrapper around the process-wide policy level, with an
/// append-only transition audit.
pub struct PolicyEngine {
    state: Mutex<PolicyEngineState>,
}

struct PolicyEngineState {
    current: PolicyLevel,
    history: Vec<PolicyTransition>,
}

impl Default for PolicyEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyEngine {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PolicyEngineState {
                current: PolicyLevel::Normal,
                history: Vec::new(),
            }),
        }
    }

    pub fn current(&self) -> PolicyLevel {
        self.state.lock().current
    }

    fn record(state: &mut PolicyEngineState, to: PolicyLevel, reason: String, timestamp: u64) {
        if to != state.current {
            tracing::info!(from = ?state.current, ?to, %reason, "policy level transition");
            state.history.push(PolicyTransition {
                from: state.current,
                to,
                reason,
                timestamp,
            });
            state.current = to;
        }
    }

    pub fn escalate(&self, failure_burst: u32, timestamp: u64) -> PolicyLevel {
        let mut state = self.state.lock();
        let next = next_policy(state.current, failure_burst);
        Self::record(
            &mut state,
            next,
            format!("escalation: failure_burst={failure_burst}"),
            timestamp,
        );
        state.current
    }

    pub fn deescalate(&self, success_streak: u32, timestamp: u64) -> PolicyLevel {
        let mut state = self.state.lock();
        let next = if should_deescalate(state.current, success_streak) {
            state.current.step_toward_normal()
        } else {
            state.current
        };
        Self::record(
            &mut state,
            next,
            format!("deescalation: success_streak={success_streak}"),
            timestamp,
        );
        state.current
    }

    /// Applies escalation, then de-escalation, as one atomic step.
    pub fn auto_adjust(&self, failure_burst: u32, success_streak: u32, timestamp: u64) -> PolicyLevel {
        let mut state = self.state.lock();
        let escalated = next_policy(state.current, failure_burst);
        Self::record(
            &mut state,
            escalated,
            format!("escalation: failure_burst={failure_burst}"),
            timestamp,
        );
        let deescalated = if should_deescalate(state.current, success_streak) {
            state.current.step_toward_normal()
        } else {
            state.current
        };
        Self::record(
            &mut state,
            deescalated,
            format!("deescalation: success_streak={success_streak}"),
            timestamp,
        );
        state.current
    }

    pub fn history(&self) -> Vec<PolicyTransition> {
        self.state.lock().history.clone()
    }

    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.current = PolicyLevel::Normal;
        state.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escalation_examples_from_scenario() {
        assert_eq!(next_policy(PolicyLevel::Normal, 3), PolicyLevel::Watch);
        assert_eq!(next_policy(PolicyLevel::Normal, 2), PolicyLevel::Normal);
        assert_eq!(next_policy(PolicyLevel::Halted, 9), PolicyLevel::Halted);
    }

    #[test]
    fn escalation_never_skips_a_level() {
        assert_eq!(next_policy(PolicyLevel::Watch, 99), PolicyLevel::Restricted);
        assert_eq!(next_policy(PolicyLevel::Restricted, 99), PolicyLevel::Halted);
    }

    #[test]
    fn deescalation_requires_threshold_and_non_normal() {
        assert!(!should_deescalate(PolicyLevel::Normal, 1000));
        assert!(!should_deescalate(PolicyLevel::Watch, 3));
        assert!(should_deescalate(PolicyLevel::Watch, 4));
    }

    #[test]
    fn engine_escalates_and_records_audit() {
        let engine = PolicyEngine::new();
        assert_eq!(engine.escalate(3, 100), PolicyLevel::Watch);
        assert_eq!(engine.history().len(), 1);
        assert_eq!(engine.history()[0].from, PolicyLevel::Normal);
        assert_eq!(engine.history()[0].to, PolicyLevel::Watch);
    }

    #[test]
    fn engine_autoadjust_noop_with_zero_burst_and_streak() {
        let engine = PolicyEngine::new();
        engine.escalate(5, 0);
        let before = engine.current();
        engine.auto_adjust(0, 0, 1);
        assert_eq!(engine.current(), before);
    }

    #[test]
    fn engine_reset_returns_to_normal() {
        let engine = PolicyEngine::new();
        engine.escalate(3, 0);
        engine.reset();
        assert_eq!(engine.current(), PolicyLevel::Normal);
        assert!(engine.history().is_empty());
    }
}
