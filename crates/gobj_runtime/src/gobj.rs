//! Live instances
//!
//! A `GObj` is one node of the ownership tree: it carries its class reference,
//! attribute store, private data, FSM position, lifecycle status and the
//! subscription edges registered against it. Instances live in the runtime's
//! arena and are addressed by `GObjId`; the parent link is a plain key, so
//! ownership stays acyclic by construction.

use crate::gclass::GClass;
use gobj_core::{AttrStore, GObjId, GValue};
use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use std::sync::Arc;

/// Lifecycle status of an instance
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleStatus {
    Created,
    Started,
    Playing,
    Paused,
    Stopped,
    Destroyed,
}

impl LifecycleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleStatus::Created => "created",
            LifecycleStatus::Started => "started",
            LifecycleStatus::Playing => "playing",
            LifecycleStatus::Paused => "paused",
            LifecycleStatus::Stopped => "stopped",
            LifecycleStatus::Destroyed => "destroyed",
        }
    }

    /// Started, playing or paused
    pub fn is_running(&self) -> bool {
        matches!(
            self,
            LifecycleStatus::Started | LifecycleStatus::Playing | LifecycleStatus::Paused
        )
    }
}

/// One publish/subscribe edge registered against a publisher.
///
/// `event = None` is the wildcard: every event the publisher emits.
#[derive(Clone)]
pub struct Subscription {
    pub event: Option<String>,
    pub kw_filter: Option<GValue>,
    pub subscriber: GObjId,
}

impl Subscription {
    /// Whether a published `(event, kw)` pair satisfies this edge.
    ///
    /// A dict filter requires every entry to appear in the payload with an
    /// equal value; a missing filter matches everything.
    pub(crate) fn matches(&self, event: &str, kw: &GValue) -> bool {
        if let Some(wanted) = &self.event {
            if wanted != event {
                return false;
            }
        }
        match &self.kw_filter {
            Some(GValue::Dict(filter)) => filter.iter().all(|(k, v)| kw.get(k) == Some(v)),
            _ => true,
        }
    }
}

/// A live instance of a gclass
pub struct GObj {
    pub(crate) gclass: Arc<GClass>,
    pub(crate) name: String,
    pub(crate) attrs: AttrStore,
    pub(crate) private_data: GValue,
    pub(crate) current_state: usize,
    pub(crate) status: LifecycleStatus,
    pub(crate) parent: Option<GObjId>,
    pub(crate) children: Vec<GObjId>,
    pub(crate) publishers: FxHashSet<GObjId>,
    pub(crate) subscriptions: SmallVec<[Subscription; 4]>,
}

impl GObj {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn gclass(&self) -> &Arc<GClass> {
        &self.gclass
    }

    /// Name of the FSM state the instance is currently in
    pub fn current_state(&self) -> &str {
        self.gclass.states().state_name(self.current_state)
    }

    pub fn status(&self) -> LifecycleStatus {
        self.status
    }

    pub fn parent(&self) -> Option<GObjId> {
        self.parent
    }

    /// Children in creation order
    pub fn children(&self) -> &[GObjId] {
        &self.children
    }

    pub fn attrs(&self) -> &AttrStore {
        &self.attrs
    }

    pub fn private_data(&self) -> &GValue {
        &self.private_data
    }

    /// Subscription edges registered against this instance, in
    /// registration order
    pub fn subscriptions(&self) -> &[Subscription] {
        &self.subscriptions
    }

    /// Instances this one is subscribed to
    pub fn publishers(&self) -> impl Iterator<Item = GObjId> + '_ {
        self.publishers.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn some_id() -> GObjId {
        let mut arena: SlotMap<GObjId, ()> = SlotMap::with_key();
        arena.insert(())
    }

    #[test]
    fn test_wildcard_subscription_matches_any_event() {
        let sub = Subscription {
            event: None,
            kw_filter: None,
            subscriber: some_id(),
        };
        assert!(sub.matches("EV_ANYTHING", &GValue::Null));
        assert!(sub.matches("EV_OTHER", &GValue::dict()));
    }

    #[test]
    fn test_named_subscription_filters_event() {
        let sub = Subscription {
            event: Some("EV_TICK".to_string()),
            kw_filter: None,
            subscriber: some_id(),
        };
        assert!(sub.matches("EV_TICK", &GValue::Null));
        assert!(!sub.matches("EV_TOCK", &GValue::Null));
    }

    #[test]
    fn test_kw_filter_requires_matching_entries() {
        let sub = Subscription {
            event: None,
            kw_filter: Some(GValue::dict().entry("channel", "alpha")),
            subscriber: some_id(),
        };
        let matching = GValue::dict().entry("channel", "alpha").entry("extra", 1);
        let wrong = GValue::dict().entry("channel", "beta");
        assert!(sub.matches("EV_X", &matching));
        assert!(!sub.matches("EV_X", &wrong));
        assert!(!sub.matches("EV_X", &GValue::Null));
    }

    #[test]
    fn test_running_statuses() {
        assert!(LifecycleStatus::Started.is_running());
        assert!(LifecycleStatus::Playing.is_running());
        assert!(LifecycleStatus::Paused.is_running());
        assert!(!LifecycleStatus::Created.is_running());
        assert!(!LifecycleStatus::Stopped.is_running());
        assert!(!LifecycleStatus::Destroyed.is_running());
    }
}
