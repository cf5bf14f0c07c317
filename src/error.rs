//! Error taxonomy for the dispatch kernel.
//!
//! Recoverable conditions (not found, invalid transition, resource exhaustion)
//! are returned as structured [`DispatchError`] variants rather than panics.
//! "No eligible candidate" results (no route, no path) are represented as
//! `None`/empty collections at the call site, not as errors.

use thiserror::Error;

/// Errors surfaced across subsystem boundaries.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// Capacity, window, or threshold argument was not a usable value.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Referenced entity or stream id has no known state.
    #[error("entity not found: {0}")]
    EntityNotFound(String),

    /// Referenced entity id was already registered.
    #[error("entity already registered: {0}")]
    AlreadyRegistered(String),

    /// Attempted transition is not an edge in the lifecycle graph.
    #[error("cannot transition {entity} from {from} to {to}; allowed: {allowed:?}")]
    InvalidTransition {
        entity: String,
        from: String,
        to: String,
        allowed: Vec<String>,
    },

    /// A bounded resource (queue, rate-limit window, circuit breaker) has no capacity.
    #[error("resource unavailable: {0}")]
    ResourceUnavailable(String),

    /// An invariant the kernel assumes was violated; indicates a caller or internal bug.
    #[error("internal invariant broken: {0}")]
    Invariant(String),
}

impl DispatchError {
    /// Recoverable errors are ones a caller may retry, back off from, or route around.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DispatchError::ResourceUnavailable(_) | DispatchError::InvalidTransition { .. }
        )
    }
}

pub type DispatchResult<T> = Result<T, DispatchError>;
