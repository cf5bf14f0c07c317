//! Shared entity types that cross subsystem boundaries.
//!
//! Per the ownership rule, each subsystem owns its own state enum
//! (`PolicyLevel` in [`crate::policy`], `WorkflowState` in [`crate::workflow`],
//! `CircuitState` in [`crate::resilience`]); `Order` lives here because intake,
//! the allocator, and the queue all read it without mutating it in place.

use serde::{Deserialize, Serialize};

/// A unit of dispatchable work. Never mutated in place once created by intake.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub urgency: i64,
    /// Lexically comparable "HH:MM" target time.
    pub eta: String,
    pub severity: Option<i32>,
    pub sla_minutes: Option<i32>,
}

impl Order {
    pub fn new(id: impl Into<String>, urgency: i64, eta: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            urgency,
            eta: eta.into(),
            severity: None,
            sla_minutes: None,
        }
    }

    /// Builds an order whose urgency is derived from severity and SLA per
    /// `urgency = 8*severity + max(0, 120 - sla_minutes)`.
    pub fn with_derived_urgency(
        id: impl Into<String>,
        eta: impl Into<String>,
        severity: i32,
        sla_minutes: i32,
    ) -> Self {
        Self {
            id: id.into(),
            urgency: derive_urgency(severity, sla_minutes),
            eta: eta.into(),
            severity: Some(severity),
            sla_minutes: Some(sla_minutes),
        }
    }
}

/// `urgency = 8*severity + max(0, 120 - sla_minutes)`.
pub fn derive_urgency(severity: i32, sla_minutes: i32) -> i64 {
    let severity = severity as i64;
    let sla_minutes = sla_minutes as i64;
    8 * severity + (120 - sla_minutes).max(0)
}
