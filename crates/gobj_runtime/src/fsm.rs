//! FSM dispatch tables
//!
//! Each gclass carries one state table: an ordered set of named states, each
//! with an ordered transition list mapping event names to an action and an
//! optional next state. Tables are compiled once at registration; state names
//! are interned to indices there, so a transition can never target an unknown
//! state after a class has been accepted.

use crate::runtime::GRuntime;
use gobj_core::{GObjError, GObjId, GValue, Result};
use indexmap::IndexMap;
use smallvec::SmallVec;
use std::sync::Arc;

/// An action bound to a transition.
///
/// Runs synchronously on the caller's stack and may reenter the runtime,
/// including sending events to its own target. Returns an integer result
/// code: `0` success, negative a handled failure signaled to the caller.
pub type ActionFn =
    Arc<dyn Fn(&mut GRuntime, GObjId, &str, &GValue, Option<GObjId>) -> i32 + Send + Sync>;

/// Outcome of one dispatch
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A transition matched; carries the action's result code
    Handled(i32),
    /// No transition for this event in the current state; not an error
    Unhandled,
}

impl DispatchOutcome {
    /// Result code of a handled dispatch, `0` when no action was bound
    pub fn code(&self) -> Option<i32> {
        match self {
            DispatchOutcome::Handled(code) => Some(*code),
            DispatchOutcome::Unhandled => None,
        }
    }

    pub fn is_handled(&self) -> bool {
        matches!(self, DispatchOutcome::Handled(_))
    }
}

/// Declarative transition bound to one event within one state
#[derive(Clone)]
pub struct EventTransition {
    pub(crate) event: String,
    pub(crate) action: Option<ActionFn>,
    pub(crate) next_state: Option<String>,
}

impl EventTransition {
    /// Transition that handles `event` and stays in the same state
    pub fn new(event: &str) -> Self {
        Self {
            event: event.to_string(),
            action: None,
            next_state: None,
        }
    }

    /// Bind the action invoked when this transition fires
    pub fn with_action<F>(mut self, action: F) -> Self
    where
        F: Fn(&mut GRuntime, GObjId, &str, &GValue, Option<GObjId>) -> i32 + Send + Sync + 'static,
    {
        self.action = Some(Arc::new(action));
        self
    }

    /// Set the state entered after the action returns
    pub fn to(mut self, next_state: &str) -> Self {
        self.next_state = Some(next_state.to_string());
        self
    }
}

/// A transition with its target state resolved to a table index
pub(crate) struct CompiledTransition {
    pub event: String,
    pub action: Option<ActionFn>,
    pub next_state: Option<usize>,
}

/// Validated, immutable state table of one gclass
pub struct StateTable {
    names: Vec<String>,
    transitions: Vec<SmallVec<[CompiledTransition; 4]>>,
}

impl std::fmt::Debug for StateTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateTable")
            .field("names", &self.names)
            .field("transitions", &self.transitions.len())
            .finish()
    }
}

impl StateTable {
    /// Compile a declarative table, interning state names.
    ///
    /// Rejects empty tables, duplicate `(state, event)` pairs, transitions on
    /// undeclared events and transitions targeting unknown states. `declared`
    /// answers whether an event name exists in the class's event types.
    pub(crate) fn compile(
        gclass: &str,
        states: &IndexMap<String, Vec<EventTransition>>,
        declared: impl Fn(&str) -> bool,
    ) -> Result<Self> {
        if states.is_empty() {
            return Err(GObjError::StructuralFsm {
                gclass: gclass.to_string(),
                reason: "no states declared".to_string(),
            });
        }

        let names: Vec<String> = states.keys().cloned().collect();
        let index_of = |name: &str| names.iter().position(|n| n == name);

        let mut transitions = Vec::with_capacity(names.len());
        for (state, declared_transitions) in states {
            let mut compiled: SmallVec<[CompiledTransition; 4]> = SmallVec::new();
            for tr in declared_transitions {
                if !declared(&tr.event) {
                    return Err(GObjError::UnknownEventType {
                        gclass: gclass.to_string(),
                        event: tr.event.clone(),
                    });
                }
                if compiled.iter().any(|c: &CompiledTransition| c.event == tr.event) {
                    return Err(GObjError::StructuralFsm {
                        gclass: gclass.to_string(),
                        reason: format!("state {state}: duplicate transition on {}", tr.event),
                    });
                }
                let next_state = match &tr.next_state {
                    Some(target) => Some(index_of(target).ok_or_else(|| {
                        GObjError::StructuralFsm {
                            gclass: gclass.to_string(),
                            reason: format!(
                                "state {state}: transition on {} targets unknown state {target}",
                                tr.event
                            ),
                        }
                    })?),
                    None => None,
                };
                compiled.push(CompiledTransition {
                    event: tr.event.clone(),
                    action: tr.action.clone(),
                    next_state,
                });
            }
            transitions.push(compiled);
        }

        Ok(Self { names, transitions })
    }

    /// Index of the named state
    pub fn state_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Name of the state at `index`
    pub fn state_name(&self, index: usize) -> &str {
        &self.names[index]
    }

    /// State names in declaration order; the first is the initial state
    pub fn state_names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Transition for `event` in the state at `state`, if any
    pub(crate) fn find(&self, state: usize, event: &str) -> Option<&CompiledTransition> {
        self.transitions[state].iter().find(|t| t.event == event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(
        states: Vec<(&str, Vec<EventTransition>)>,
        events: &[&str],
    ) -> Result<StateTable> {
        let map: IndexMap<String, Vec<EventTransition>> = states
            .into_iter()
            .map(|(name, trs)| (name.to_string(), trs))
            .collect();
        let declared: Vec<String> = events.iter().map(|e| e.to_string()).collect();
        StateTable::compile("TestClass", &map, |e| declared.iter().any(|d| d == e))
    }

    #[test]
    fn test_compile_interns_targets() {
        let t = table(
            vec![
                ("ST_IDLE", vec![EventTransition::new("EV_GO").to("ST_BUSY")]),
                ("ST_BUSY", vec![EventTransition::new("EV_DONE").to("ST_IDLE")]),
            ],
            &["EV_GO", "EV_DONE"],
        )
        .unwrap();

        assert_eq!(t.len(), 2);
        assert_eq!(t.state_name(0), "ST_IDLE");
        assert_eq!(t.state_index("ST_BUSY"), Some(1));
        let tr = t.find(0, "EV_GO").unwrap();
        assert_eq!(tr.next_state, Some(1));
        assert!(t.find(0, "EV_DONE").is_none());
    }

    #[test]
    fn test_compile_rejects_empty_table() {
        let err = table(vec![], &[]).unwrap_err();
        assert!(matches!(err, GObjError::StructuralFsm { .. }));
    }

    #[test]
    fn test_compile_rejects_unknown_target() {
        let err = table(
            vec![("ST_IDLE", vec![EventTransition::new("EV_GO").to("ST_NOWHERE")])],
            &["EV_GO"],
        )
        .unwrap_err();
        assert!(matches!(err, GObjError::StructuralFsm { gclass, .. } if gclass == "TestClass"));
    }

    #[test]
    fn test_compile_rejects_undeclared_event() {
        let err = table(
            vec![("ST_IDLE", vec![EventTransition::new("EV_MYSTERY")])],
            &["EV_GO"],
        )
        .unwrap_err();
        assert!(
            matches!(err, GObjError::UnknownEventType { event, .. } if event == "EV_MYSTERY")
        );
    }

    #[test]
    fn test_compile_rejects_duplicate_transition() {
        let err = table(
            vec![(
                "ST_IDLE",
                vec![EventTransition::new("EV_GO"), EventTransition::new("EV_GO")],
            )],
            &["EV_GO"],
        )
        .unwrap_err();
        assert!(matches!(err, GObjError::StructuralFsm { .. }));
    }

    #[test]
    fn test_sink_state_has_no_transitions() {
        let t = table(
            vec![
                ("ST_IDLE", vec![EventTransition::new("EV_GO").to("ST_DONE")]),
                ("ST_DONE", vec![]),
            ],
            &["EV_GO"],
        )
        .unwrap();
        assert!(t.find(1, "EV_GO").is_none());
    }
}
