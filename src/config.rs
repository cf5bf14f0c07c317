//! Kernel-wide configuration: the knobs every subsystem is parameterized by.
//!
//! The kernel only validates and holds these values once constructed; the
//! wrapping service (out of scope here) is responsible for sourcing them
//! from a file, environment, or service registry.

use crate::error::DispatchError;

#[derive(Clone, Debug, PartialEq)]
pub struct KernelConfig {
    /// Admission queue hard limit (see [`crate::queue::PriorityQueue`]).
    pub queue_hard_limit: usize,
    /// Rolling rate-limit window width in seconds.
    pub rate_window_seconds: u64,
    /// Max admissions per rate-limit window.
    pub rate_max_per_window: usize,
    /// Consecutive failures before [`crate::resilience::CircuitBreaker`] opens.
    pub circuit_failure_threshold: u32,
    /// Consecutive successes required to close from half-open.
    pub circuit_success_threshold: u32,
    /// Seconds an open circuit waits before probing half-open.
    pub circuit_timeout_seconds: u64,
    /// Sequence-count interval between checkpoints.
    pub checkpoint_interval: u64,
    /// Sample capacity retained by a [`crate::statistics::ResponseTimeTracker`].
    pub response_tracker_capacity: usize,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            queue_hard_limit: 1000,
            rate_window_seconds: 60,
            rate_max_per_window: 500,
            circuit_failure_threshold: 5,
            circuit_success_threshold: 2,
            circuit_timeout_seconds: 30,
            checkpoint_interval: 100,
            response_tracker_capacity: 1000,
        }
    }
}

impl KernelConfig {
    /// Rejects configuration that would make a subsystem meaningless
    /// (e.g. a zero-width rate window) rather than silently clamping it.
    pub fn validate(&self) -> Result<(), DispatchError> {
        if self.queue_hard_limit == 0 {
            return Err(DispatchError::InvalidInput(
                "queue_hard_limit must be positive".to_string(),
            ));
        }
        if self.rate_window_seconds == 0 {
            return Err(DispatchError::InvalidInput(
                "rate_window_seconds must be positive".to_string(),
            ));
        }
        if self.rate_max_per_window == 0 {
            return Err(DispatchError::InvalidInput(
                "rate_max_per_window must be positive".to_string(),
            ));
        }
        if self.circuit_failure_threshold == 0 {
            return Err(DispatchError::InvalidInput(
                "circuit_failure_threshold must be positive".to_string(),
            ));
        }
        if self.circuit_success_threshold == 0 {
            return Err(DispatchError::InvalidInput(
                "circuit_success_threshold must be positive".to_string(),
            ));
        }
        if self.checkpoint_interval == 0 {
            return Err(DispatchError::InvalidInput(
                "checkpoint_interval must be positive".to_string(),
            ));
        }
        if self.response_tracker_capacity == 0 {
            return Err(DispatchError::InvalidInput(
                "response_tracker_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(KernelConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_queue_limit_is_rejected() {
        let mut config = KernelConfig::default();
        config.queue_hard_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_rate_window_is_rejected() {
        let mut config = KernelConfig::default();
        config.rate_window_seconds = 0;
        assert!(config.validate().is_err());
    }
}
