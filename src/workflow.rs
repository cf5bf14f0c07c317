//! Per-entity lifecycle enforcement: a small DAG with two terminal states.

use std::collections::{HashMap, HashSet, VecDeque};

use parking_lot::Mutex;

use crate::error::DispatchError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorkflowState {
    Queued,
    Allocated,
    Departed,
    Arrived,
    Cancelled,
}

impl WorkflowState {
    fn as_str(self) -> &'static str {
        match self {
            WorkflowState::Queued => "queued",
            WorkflowState::Allocated => "allocated",
            WorkflowState::Departed => "departed",
            WorkflowState::Arrived => "arrived",
            WorkflowState::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn is_valid_state(_state: WorkflowState) -> bool {
    // Always true by construction; kept for parity with the external API,
    // which accepts state names from untyped callers.
    true
}

/// The allowed outgoing edges for each state. Terminal states have none.
pub fn allowed_transitions(from: WorkflowState) -> Vec<WorkflowState> {
    match from {
        WorkflowState::Queued => vec![WorkflowState::Allocated, WorkflowState::Cancelled],
        WorkflowState::Allocated => vec![WorkflowState::Departed, WorkflowState::Cancelled],
        WorkflowState::Departed => vec![WorkflowState::Arrived, WorkflowState::Cancelled],
        WorkflowState::Arrived | WorkflowState::Cancelled => Vec::new(),
    }
}

pub fn can_transition(from: WorkflowState, to: WorkflowState) -> bool {
    allowed_transitions(from).contains(&to)
}

pub fn is_terminal(state: WorkflowState) -> bool {
    allowed_transitions(state).is_empty()
}

/// BFS shortest path through the lifecycle graph. `[from]` if already equal;
/// `None` if `to` is unreachable from `from`.
pub fn shortest_path(from: WorkflowState, to: WorkflowState) -> Option<Vec<WorkflowState>> {
    if from == to {
        return Some(vec![from]);
    }
    let mut visited: HashSet<WorkflowState> = HashSet::new();
    visited.insert(from);
    let mut queue: VecDeque<Vec<WorkflowState>> = VecDeque::new();
    queue.push_back(vec![from]);
    while let Some(path) = queue.pop_front() {
        let current = *path.last().unwrap();
        for next in allowed_transitions(current) {
            if next == to {
                let mut result = path.clone();
                result.push(next);
                return Some(result);
            }
            if visited.insert(next) {
                let mut extended = path.clone();
                extended.push(next);
                queue.push_back(extended);
            }
        }
    }
    None
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionRecord {
    pub entity_id: String,
    pub from: WorkflowState,
    pub to: WorkflowState,
    pub timestamp: u64,
    pub reopened: bool,
}

struct WorkflowEngineState {
    entities: HashMap<String, WorkflowState>,
    history: Vec<TransitionRecord>,
}

/// Owns per-entity lifecycle state and the global transition audit.
pub struct WorkflowEngine {
    state: Mutex<WorkflowEngineState>,
}

impl Default for WorkflowEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowEngine {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(WorkflowEngineState {
                entities: HashMap::new(),
                history: Vec::new(),
            }),
        }
    }

    pub fn register(&self, entity_id: impl Into<String>) -> Result<(), DispatchError> {
        self.register_with_state(entity_id, WorkflowState::Queued)
    }

    pub fn register_with_state(
        &self,
        entity_id: impl Into<String>,
        initial: WorkflowState,
    ) -> Result<(), DispatchError> {
        let entity_id = entity_id.into();
        let mut state = self.state.lock();
        if state.entities.contains_key(&entity_id) {
            return Err(DispatchError::AlreadyRegistered(entity_id));
        }
        state.entities.insert(entity_id, initial);
        Ok(())
    }

    pub fn get_state(&self, entity_id: &str) -> Option<WorkflowState> {
        self.state.lock().entities.get(entity_id).copied()
    }

    /// Atomic check-and-set. Errors carry the allowed next states so a
    /// caller can retry against a valid target.
    pub fn transition(
        &self,
        entity_id: &str,
        to: WorkflowState,
        timestamp: u64,
    ) -> Result<WorkflowState, DispatchError> {
        let mut state = self.state.lock();
        let from = *state
            .entities
            .get(entity_id)
            .ok_or_else(|| DispatchError::EntityNotFound(entity_id.to_string()))?;
        if !can_transition(from, to) {
            tracing::debug!(entity_id, %from, %to, "rejected invalid workflow transition");
            return Err(DispatchError::InvalidTransition {
                entity: entity_id.to_string(),
                from: from.to_string(),
                to: to.to_string(),
                allowed: allowed_transitions(from).iter().map(|s| s.to_string()).collect(),
            });
        }
        state.entities.insert(entity_id.to_string(), to);
        state.history.push(TransitionRecord {
            entity_id: entity_id.to_string(),
            from,
            to,
            timestamp,
            reopened: false,
        });
        tracing::info!(entity_id, %from, %to, "workflow transition");
        Ok(to)
    }

    /// Explicit admin escape hatch: moves an entity out of a terminal state.
    /// Bypasses the graph's edge check (terminal states have none by
    /// definition) but is always recorded distinctly in the audit log.
    pub fn reopen(
        &self,
        entity_id: &str,
        to: WorkflowState,
        timestamp: u64,
    ) -> Result<WorkflowState, DispatchError> {
        let mut state = self.state.lock();
        let from = *state
            .entities
            .get(entity_id)
            .ok_or_else(|| DispatchError::EntityNotFound(entity_id.to_string()))?;
        if !is_terminal(from) {
            return Err(DispatchError::InvalidTransition {
                entity: entity_id.to_string(),
                from: from.to_string(),
                to: to.to_string(),
                allowed: allowed_transitions(from).iter().map(|s| s.to_string()).collect(),
            });
        }
        state.entities.insert(entity_id.to_string(), to);
        state.history.push(TransitionRecord {
            entity_id: entity_id.to_string(),
            from,
            to,
            timestamp,
            reopened: true,
        });
        tracing::warn!(entity_id, %from, %to, "workflow entity reopened from terminal state");
        Ok(to)
    }

    pub fn is_terminal(&self, entity_id: &str) -> bool {
        self.get_state(entity_id).map(is_terminal).unwrap_or(false)
    }

    pub fn active_count(&self) -> usize {
        self.state
            .lock()
            .entities
            .values()
            .filter(|s| !is_terminal(**s))
            .count()
    }

    pub fn entities_in_state(&self, target: WorkflowState) -> Vec<String> {
        self.state
            .lock()
            .entities
            .iter()
            .filter(|(_, s)| **s == target)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn history(&self) -> Vec<TransitionRecord> {
        self.state.lock().history.clone()
    }

    pub fn audit_log(&self) -> Vec<String> {
        self.state
            .lock()
            .history
            .iter()
            .map(|r| format!("[{}] {} -> {} (entity: {})", r.timestamp, r.from, r.to, r.entity_id))
            .collect()
    }
}

/// Applies each step of `shortest_path(engine.get_state(id), target)` in
/// turn via [`WorkflowEngine::transition`]; aborts and reports the failing
/// step on any invalid transition.
pub fn resolve_transition_chain(
    engine: &WorkflowEngine,
    entity_id: &str,
    target: WorkflowState,
    timestamp: u64,
) -> Result<Vec<WorkflowState>, DispatchError> {
    let from = engine
        .get_state(entity_id)
        .ok_or_else(|| DispatchError::EntityNotFound(entity_id.to_string()))?;
    let path = shortest_path(from, target)
        .ok_or_else(|| DispatchError::Invariant(format!("no path from {from} to {target}")))?;
    let mut visited = vec![from];
    for step in path.into_iter().skip(1) {
        engine.transition(entity_id, step, timestamp)?;
        visited.push(step);
    }
    Ok(visited)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrived_accepts_no_transitions() {
        assert!(!can_transition(WorkflowState::Arrived, WorkflowState::Queued));
        assert!(allowed_transitions(WorkflowState::Arrived).is_empty());
        assert!(is_terminal(WorkflowState::Arrived));
    }

    #[test]
    fn departed_can_arrive_or_cancel() {
        assert!(can_transition(WorkflowState::Departed, WorkflowState::Arrived));
        assert!(can_transition(WorkflowState::Departed, WorkflowState::Cancelled));
    }

    #[test]
    fn shortest_path_traverses_full_lifecycle() {
        let path = shortest_path(WorkflowState::Queued, WorkflowState::Arrived).unwrap();
        assert_eq!(
            path,
            vec![
                WorkflowState::Queued,
                WorkflowState::Allocated,
                WorkflowState::Departed,
                WorkflowState::Arrived,
            ]
        );
    }

    #[test]
    fn shortest_path_same_state_is_singleton() {
        assert_eq!(
            shortest_path(WorkflowState::Queued, WorkflowState::Queued),
            Some(vec![WorkflowState::Queued])
        );
    }

    #[test]
    fn shortest_path_unreachable_is_none() {
        assert_eq!(shortest_path(WorkflowState::Arrived, WorkflowState::Queued), None);
    }

    #[test]
    fn engine_rejects_transition_from_terminal_with_allowed_list() {
        let engine = WorkflowEngine::new();
        engine.register("e1").unwrap();
        engine.transition("e1", WorkflowState::Allocated, 0).unwrap();
        engine.transition("e1", WorkflowState::Departed, 1).unwrap();
        engine.transition("e1", WorkflowState::Arrived, 2).unwrap();
        let err = engine.transition("e1", WorkflowState::Queued, 3).unwrap_err();
        match err {
            DispatchError::InvalidTransition { allowed, .. } => assert!(allowed.is_empty()),
            other => panic!("expected InvalidTransition, got {other:?}"),
        }
    }

    #[test]
    fn engine_rejects_duplicate_registration() {
        let engine = WorkflowEngine::new();
        engine.register("e1").unwrap();
        assert!(engine.register("e1").is_err());
    }

    #[test]
    fn engine_reports_entity_not_found() {
        let engine = WorkflowEngine::new();
        let err = engine.transition("ghost", WorkflowState::Allocated, 0).unwrap_err();
        assert!(matches!(err, DispatchError::EntityNotFound(_)));
    }

    #[test]
    fn resolve_transition_chain_drives_full_lifecycle() {
        let engine = WorkflowEngine::new();
        engine.register("e1").unwrap();
        let visited = resolve_transition_chain(&engine, "e1", WorkflowState::Arrived, 10).unwrap();
        assert_eq!(visited.last(), Some(&WorkflowState::Arrived));
        assert!(engine.is_terminal("e1"));
    }

    #[test]
    fn reopen_requires_terminal_source() {
        let engine = WorkflowEngine::new();
        engine.register("e1").unwrap();
        assert!(engine.reopen("e1", WorkflowState::Queued, 0).is_err());
        engine.transition("e1", WorkflowState::Cancelled, 1).unwrap();
        assert!(engine.reopen("e1", WorkflowState::Queued, 2).is_ok());
        assert_eq!(engine.get_state("e1"), Some(WorkflowState::Queued));
    }

    #[test]
    fn active_count_excludes_terminal_entities() {
        let engine = WorkflowEngine::new();
        engine.register("a").unwrap();
        engine.register("b").unwrap();
        engine.transition("b", WorkflowState::Cancelled, 0).unwrap();
        assert_eq!(engine.active_count(), 1);
    }
}
