//! The runtime: instance tree, event dispatch and lifecycle control
//!
//! `GRuntime` owns every live instance in a slotmap arena and is the single
//! mutual-exclusion boundary of the model: all dispatch, fan-out and lifecycle
//! transitions run synchronously under one `&mut` borrow, on the caller's
//! stack. Actions and hooks receive that same borrow, so nested dispatch is
//! reentrant by construction and bounded only by the configured depth guard.

use crate::fsm::DispatchOutcome;
use crate::gobj::{GObj, LifecycleStatus, Subscription};
use crate::persist::PersistStore;
use crate::registry::GClassRegistry;
use crate::startup::GlobalSettings;
use crate::timer::{TimerId, TimerScheduler};
use gobj_core::{GObjError, GObjId, GType, GValue, Result};
use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use slotmap::SlotMap;
use smallvec::SmallVec;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Process-wide fallback for commands missing from a class table
pub type CommandParser = Arc<
    dyn Fn(&mut GRuntime, GObjId, &str, &GValue, Option<GObjId>) -> Result<GValue> + Send + Sync,
>;

/// Process-wide stats collector overriding the default attribute snapshot
pub type StatsParser =
    Arc<dyn Fn(&mut GRuntime, GObjId, Option<&str>) -> Result<GValue> + Send + Sync>;

/// The object tree, subscription router and lifecycle controller
pub struct GRuntime {
    objs: SlotMap<GObjId, GObj>,
    roots: Vec<GObjId>,
    timers: TimerScheduler,
    settings: GlobalSettings,
    persist: Option<Box<dyn PersistStore>>,
    command_parser: Option<CommandParser>,
    stats_parser: Option<StatsParser>,
    dispatch_depth: usize,
}

impl GRuntime {
    /// Build a runtime; initializes the global registry when this is the
    /// first runtime of the process
    pub fn new(settings: GlobalSettings) -> Self {
        GClassRegistry::init();
        Self {
            objs: SlotMap::with_key(),
            roots: Vec::new(),
            timers: TimerScheduler::new(),
            settings,
            persist: None,
            command_parser: None,
            stats_parser: None,
            dispatch_depth: 0,
        }
    }

    pub fn settings(&self) -> &GlobalSettings {
        &self.settings
    }

    /// Install the host persistence store
    pub fn set_persist_store(&mut self, store: Box<dyn PersistStore>) {
        self.persist = Some(store);
    }

    /// Install the process-wide command fallback
    pub fn set_command_parser(&mut self, parser: CommandParser) {
        self.command_parser = Some(parser);
    }

    /// Install the process-wide stats collector
    pub fn set_stats_parser(&mut self, parser: StatsParser) {
        self.stats_parser = Some(parser);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Tree
    // ─────────────────────────────────────────────────────────────────────

    /// Create an instance of a registered class in its initial state.
    ///
    /// `kw` holds construction-time attribute overrides (a dict, or null for
    /// none). The instance is appended to its parent's children (`None` =
    /// implicit root), the `create` hook runs, then the instance starts
    /// automatically unless its class carries the manual-start flag.
    pub fn create(
        &mut self,
        gclass_name: &str,
        name: &str,
        kw: &GValue,
        parent: Option<GObjId>,
    ) -> Result<GObjId> {
        self.create_impl(gclass_name, name, kw, parent, None)
    }

    /// `create`, but starting from the named state instead of the first one
    pub fn create_in_state(
        &mut self,
        gclass_name: &str,
        name: &str,
        kw: &GValue,
        parent: Option<GObjId>,
        initial_state: &str,
    ) -> Result<GObjId> {
        self.create_impl(gclass_name, name, kw, parent, Some(initial_state))
    }

    fn create_impl(
        &mut self,
        gclass_name: &str,
        name: &str,
        kw: &GValue,
        parent: Option<GObjId>,
        initial_state: Option<&str>,
    ) -> Result<GObjId> {
        let gclass = GClassRegistry::get()?.lookup(gclass_name)?;

        let overrides = match kw {
            GValue::Null => IndexMap::new(),
            GValue::Dict(map) => map.clone(),
            other => {
                return Err(GObjError::TypeMismatch {
                    attr: "kw".to_string(),
                    expected: GType::Dict,
                    got: other.type_name(),
                })
            }
        };

        let siblings = match parent {
            Some(p) => {
                let pobj = self.objs.get(p).ok_or(GObjError::DeadObject)?;
                &pobj.children
            }
            None => &self.roots,
        };
        if siblings
            .iter()
            .any(|id| self.objs.get(*id).is_some_and(|o| o.name == name))
        {
            return Err(GObjError::DuplicateSiblingName(name.to_string()));
        }

        let current_state = match initial_state {
            Some(state) => {
                gclass
                    .states()
                    .state_index(state)
                    .ok_or_else(|| GObjError::StructuralFsm {
                        gclass: gclass_name.to_string(),
                        reason: format!("unknown initial state {state}"),
                    })?
            }
            None => 0,
        };

        let attrs = gobj_core::AttrStore::instantiate(gclass.schema().clone(), &overrides)?;
        let obj = GObj {
            private_data: gclass.private_data_template().clone(),
            gclass: gclass.clone(),
            name: name.to_string(),
            attrs,
            current_state,
            status: LifecycleStatus::Created,
            parent,
            children: Vec::new(),
            publishers: FxHashSet::default(),
            subscriptions: SmallVec::new(),
        };
        let id = self.objs.insert(obj);
        match parent {
            Some(p) => self.objs[p].children.push(id),
            None => self.roots.push(id),
        }
        debug!(gclass = %gclass_name, name, "gobj created");

        if let Some(hook) = gclass.hooks().create.clone() {
            hook(self, id);
        }
        if !gclass.flags().manual_start() && self.is_alive(id) {
            self.start(id)?;
        }
        Ok(id)
    }

    /// Destroy an instance: children first (depth-first, in child order),
    /// then every subscription edge in both directions, then the instance
    /// itself. Idempotent; a stale handle is a no-op.
    pub fn destroy(&mut self, id: GObjId) -> Result<()> {
        let Some(obj) = self.objs.get(id) else {
            return Ok(());
        };
        if obj.status == LifecycleStatus::Destroyed {
            // teardown already underway
            return Ok(());
        }

        if obj.status.is_running() {
            self.stop(id)?;
            if !self.objs.contains_key(id) {
                return Ok(());
            }
        }

        let children = self.objs[id].children.clone();
        for child in children {
            self.destroy(child)?;
        }
        if !self.objs.contains_key(id) {
            return Ok(());
        }

        // detach edges where this instance is the subscriber
        let publishers: Vec<GObjId> = self.objs[id].publishers.iter().copied().collect();
        for publisher in publishers {
            if let Some(pobj) = self.objs.get_mut(publisher) {
                pobj.subscriptions.retain(|s| s.subscriber != id);
            }
        }
        // and where it is the publisher
        let subscribers: Vec<GObjId> =
            self.objs[id].subscriptions.iter().map(|s| s.subscriber).collect();
        for subscriber in subscribers {
            if let Some(sobj) = self.objs.get_mut(subscriber) {
                sobj.publishers.remove(&id);
            }
        }
        self.objs[id].publishers.clear();
        self.objs[id].subscriptions.clear();
        self.timers.drop_for_target(id);

        // dispatch refuses the instance from here on
        self.objs[id].status = LifecycleStatus::Destroyed;
        let (gclass_name, name, hook) = {
            let obj = &self.objs[id];
            (
                obj.gclass.name().to_string(),
                obj.name.clone(),
                obj.gclass.hooks().destroy.clone(),
            )
        };
        if let Some(hook) = hook {
            hook(self, id);
        }

        match self.objs[id].parent {
            Some(p) => {
                if let Some(pobj) = self.objs.get_mut(p) {
                    pobj.children.retain(|c| *c != id);
                }
            }
            None => self.roots.retain(|c| *c != id),
        }
        self.objs.remove(id);
        debug!(gclass = %gclass_name, name = %name, "gobj destroyed");
        Ok(())
    }

    /// Whether the handle refers to a live (non-destroyed) instance
    pub fn is_alive(&self, id: GObjId) -> bool {
        self.objs
            .get(id)
            .is_some_and(|o| o.status != LifecycleStatus::Destroyed)
    }

    /// Read-only view of a live instance
    pub fn gobj(&self, id: GObjId) -> Result<&GObj> {
        self.objs.get(id).ok_or(GObjError::DeadObject)
    }

    /// Top-level instances in creation order
    pub fn roots(&self) -> &[GObjId] {
        &self.roots
    }

    /// Child of `parent` (or top-level instance) with the given name
    pub fn find_child(&self, parent: Option<GObjId>, name: &str) -> Option<GObjId> {
        let siblings = match parent {
            Some(p) => self.objs.get(p).map(|o| o.children.as_slice())?,
            None => &self.roots,
        };
        siblings
            .iter()
            .copied()
            .find(|id| self.objs.get(*id).is_some_and(|o| o.name == name))
    }

    /// Slash-separated path from the root to this instance
    pub fn full_name(&self, id: GObjId) -> Result<String> {
        let mut parts = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let obj = self.objs.get(current).ok_or(GObjError::DeadObject)?;
            parts.push(obj.name.clone());
            cursor = obj.parent;
        }
        parts.reverse();
        Ok(parts.join("/"))
    }

    /// Mutable access to an instance's private data
    pub fn private_data_mut(&mut self, id: GObjId) -> Result<&mut GValue> {
        let obj = self.objs.get_mut(id).ok_or(GObjError::DeadObject)?;
        Ok(&mut obj.private_data)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────

    /// Start an instance; a no-op on one already running
    pub fn start(&mut self, id: GObjId) -> Result<()> {
        let (status, hook) = {
            let obj = self.live(id)?;
            (obj.status, obj.gclass.hooks().start.clone())
        };
        match status {
            LifecycleStatus::Started | LifecycleStatus::Playing | LifecycleStatus::Paused => Ok(()),
            LifecycleStatus::Created | LifecycleStatus::Stopped => {
                self.objs[id].status = LifecycleStatus::Started;
                trace!(gobj = %self.objs[id].name, "started");
                if let Some(hook) = hook {
                    hook(self, id);
                }
                Ok(())
            }
            LifecycleStatus::Destroyed => Err(GObjError::DeadObject),
        }
    }

    /// Stop an instance; a no-op on one not running.
    ///
    /// A playing instance is paused first.
    pub fn stop(&mut self, id: GObjId) -> Result<()> {
        let status = self.live(id)?.status;
        match status {
            LifecycleStatus::Created | LifecycleStatus::Stopped => Ok(()),
            LifecycleStatus::Playing | LifecycleStatus::Paused | LifecycleStatus::Started => {
                if status == LifecycleStatus::Playing {
                    self.pause(id)?;
                    if !self.is_alive(id) {
                        return Ok(());
                    }
                }
                let hook = self.objs[id].gclass.hooks().stop.clone();
                self.objs[id].status = LifecycleStatus::Stopped;
                trace!(gobj = %self.objs[id].name, "stopped");
                if let Some(hook) = hook {
                    hook(self, id);
                }
                Ok(())
            }
            LifecycleStatus::Destroyed => Err(GObjError::DeadObject),
        }
    }

    /// Move a started or paused instance to playing
    pub fn play(&mut self, id: GObjId) -> Result<()> {
        let (status, hook) = {
            let obj = self.live(id)?;
            (obj.status, obj.gclass.hooks().play.clone())
        };
        match status {
            LifecycleStatus::Playing => Ok(()),
            LifecycleStatus::Started | LifecycleStatus::Paused => {
                self.objs[id].status = LifecycleStatus::Playing;
                if let Some(hook) = hook {
                    hook(self, id);
                }
                Ok(())
            }
            other => Err(GObjError::InvalidLifecycle {
                op: "play",
                status: other.as_str(),
            }),
        }
    }

    /// Move a playing instance to paused
    pub fn pause(&mut self, id: GObjId) -> Result<()> {
        let (status, hook) = {
            let obj = self.live(id)?;
            (obj.status, obj.gclass.hooks().pause.clone())
        };
        match status {
            LifecycleStatus::Paused => Ok(()),
            LifecycleStatus::Playing => {
                self.objs[id].status = LifecycleStatus::Paused;
                if let Some(hook) = hook {
                    hook(self, id);
                }
                Ok(())
            }
            other => Err(GObjError::InvalidLifecycle {
                op: "pause",
                status: other.as_str(),
            }),
        }
    }

    fn live(&self, id: GObjId) -> Result<&GObj> {
        let obj = self.objs.get(id).ok_or(GObjError::DeadObject)?;
        if obj.status == LifecycleStatus::Destroyed {
            return Err(GObjError::DeadObject);
        }
        Ok(obj)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Dispatch
    // ─────────────────────────────────────────────────────────────────────

    /// Send an event to one instance through its FSM.
    ///
    /// Synchronous and reentrant: the matching action runs to completion on
    /// this call stack, and may itself send events before returning. An event
    /// with no transition in the current state is reported as `Unhandled`,
    /// never an error. The transition's next state is applied after the
    /// action returns, whatever its result code.
    pub fn send_event(
        &mut self,
        target: GObjId,
        event: &str,
        kw: &GValue,
        source: Option<GObjId>,
    ) -> Result<DispatchOutcome> {
        if self.dispatch_depth >= self.settings.max_dispatch_depth {
            return Err(GObjError::RecursionLimitExceeded(
                self.settings.max_dispatch_depth,
            ));
        }

        let (gclass, state_idx) = {
            let obj = self.live(target)?;
            (obj.gclass.clone(), obj.current_state)
        };
        let trace_on = gclass.trace_level().max(self.settings.default_trace_level) > 0;

        let Some(transition) = gclass.states().find(state_idx, event) else {
            if trace_on {
                debug!(
                    gclass = %gclass.name(),
                    state = %gclass.states().state_name(state_idx),
                    event,
                    "event ignored"
                );
            }
            return Ok(DispatchOutcome::Unhandled);
        };
        let action = transition.action.clone();
        let next_state = transition.next_state;

        self.dispatch_depth += 1;
        let code = match action {
            Some(action) => action(self, target, event, kw, source),
            None => 0,
        };
        self.dispatch_depth -= 1;

        // the action may have destroyed its own target
        if let Some(next) = next_state {
            if let Some(obj) = self.objs.get_mut(target) {
                if obj.status != LifecycleStatus::Destroyed {
                    obj.current_state = next;
                }
            }
        }
        if trace_on {
            trace!(
                gclass = %gclass.name(),
                from = %gclass.states().state_name(state_idx),
                event,
                code,
                "event handled"
            );
        }
        Ok(DispatchOutcome::Handled(code))
    }

    /// Name of the state the instance is currently in
    pub fn current_state(&self, id: GObjId) -> Result<&str> {
        Ok(self.gobj(id)?.current_state())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Subscriptions
    // ─────────────────────────────────────────────────────────────────────

    /// Register a publish/subscribe edge.
    ///
    /// `event = None` subscribes to every event the publisher emits. A named
    /// event must be declared (and publishable) by the publisher's class.
    /// Duplicate subscriptions are permitted and independent.
    pub fn subscribe_event(
        &mut self,
        publisher: GObjId,
        event: Option<&str>,
        kw_filter: Option<GValue>,
        subscriber: GObjId,
    ) -> Result<()> {
        let gclass = self.live(publisher)?.gclass.clone();
        self.live(subscriber)?;

        if let Some(name) = event {
            let desc = gclass
                .event_desc(name)
                .ok_or_else(|| GObjError::UnknownEventType {
                    gclass: gclass.name().to_string(),
                    event: name.to_string(),
                })?;
            if !desc.flags.output() {
                return Err(GObjError::UnknownEventType {
                    gclass: gclass.name().to_string(),
                    event: name.to_string(),
                });
            }
        }

        let kw_filter = match kw_filter {
            Some(GValue::Null) => None,
            other => other,
        };
        self.objs[publisher].subscriptions.push(Subscription {
            event: event.map(str::to_string),
            kw_filter,
            subscriber,
        });
        self.objs[subscriber].publishers.insert(publisher);
        Ok(())
    }

    /// Remove the first subscription edge matching `(event, subscriber)`
    pub fn unsubscribe_event(
        &mut self,
        publisher: GObjId,
        event: Option<&str>,
        subscriber: GObjId,
    ) -> Result<()> {
        self.live(publisher)?;
        let position = self.objs[publisher]
            .subscriptions
            .iter()
            .position(|s| s.subscriber == subscriber && s.event.as_deref() == event)
            .ok_or(GObjError::SubscriptionNotFound)?;
        self.objs[publisher].subscriptions.remove(position);

        let still_subscribed = self.objs[publisher]
            .subscriptions
            .iter()
            .any(|s| s.subscriber == subscriber);
        if !still_subscribed {
            if let Some(sobj) = self.objs.get_mut(subscriber) {
                sobj.publishers.remove(&publisher);
            }
        }
        Ok(())
    }

    /// Publish an event to every matching subscriber, in registration order.
    ///
    /// Fan-out never halts: a subscriber's negative result code, dispatch
    /// failure, or death mid-fan-out does not stop delivery to the rest.
    /// Returns the number of subscribers actually dispatched to.
    pub fn publish(&mut self, publisher: GObjId, event: &str, kw: &GValue) -> Result<usize> {
        let (gclass, subscriptions) = {
            let obj = self.live(publisher)?;
            (obj.gclass.clone(), obj.subscriptions.clone())
        };
        let desc = gclass
            .event_desc(event)
            .ok_or_else(|| GObjError::UnknownEventType {
                gclass: gclass.name().to_string(),
                event: event.to_string(),
            })?;
        if !desc.flags.output() {
            warn!(gclass = %gclass.name(), event, "publishing an event not flagged output");
        }

        let mut delivered = 0;
        for subscription in subscriptions.iter().filter(|s| s.matches(event, kw)) {
            match self.send_event(subscription.subscriber, event, kw, Some(publisher)) {
                Ok(_) => delivered += 1,
                Err(GObjError::DeadObject) => {
                    debug!(event, "subscriber destroyed mid fan-out, skipped");
                }
                Err(err) => {
                    warn!(event, error = %err, "subscriber dispatch failed");
                }
            }
        }
        Ok(delivered)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Attributes
    // ─────────────────────────────────────────────────────────────────────

    /// Read an attribute of a live instance
    pub fn read_attr(&self, id: GObjId, name: &str) -> Result<GValue> {
        self.live(id)?.attrs.get(name).cloned()
    }

    /// Write an attribute of a live instance; fires the class `writing`
    /// hook after a successful write
    pub fn write_attr(&mut self, id: GObjId, name: &str, value: GValue) -> Result<()> {
        let hook = {
            let obj = self.objs.get_mut(id).ok_or(GObjError::DeadObject)?;
            if obj.status == LifecycleStatus::Destroyed {
                return Err(GObjError::DeadObject);
            }
            obj.attrs.set(name, value)?;
            obj.gclass.hooks().writing.clone()
        };
        if let Some(hook) = hook {
            hook(self, id, name);
        }
        Ok(())
    }

    /// Load persistent attributes from the host store into the instance.
    ///
    /// `attrs = None` loads every attribute flagged persistent.
    pub fn load_persistent_attrs(&mut self, id: GObjId, attrs: Option<&[String]>) -> Result<()> {
        let GRuntime { objs, persist, .. } = self;
        let obj = objs.get_mut(id).ok_or(GObjError::DeadObject)?;
        let store = persist.as_deref().ok_or(GObjError::PersistUnavailable)?;
        let names = match attrs {
            Some(names) => names.to_vec(),
            None => obj.attrs.persistent_names(),
        };
        let loaded = store.load(obj.gclass.name(), &obj.name, &names)?;
        for (name, value) in loaded {
            obj.attrs.restore(&name, value)?;
        }
        Ok(())
    }

    /// Save the instance's persistent attributes to the host store
    pub fn save_persistent_attrs(&mut self, id: GObjId) -> Result<()> {
        let GRuntime { objs, persist, .. } = self;
        let obj = objs.get(id).ok_or(GObjError::DeadObject)?;
        let store = persist.as_deref_mut().ok_or(GObjError::PersistUnavailable)?;
        store.save(obj.gclass.name(), &obj.name, &obj.attrs.persistent_snapshot())
    }

    /// Remove persistent attributes from the host store.
    ///
    /// `attrs = None` removes every attribute flagged persistent.
    pub fn remove_persistent_attrs(&mut self, id: GObjId, attrs: Option<&[String]>) -> Result<()> {
        let GRuntime { objs, persist, .. } = self;
        let obj = objs.get(id).ok_or(GObjError::DeadObject)?;
        let store = persist.as_deref_mut().ok_or(GObjError::PersistUnavailable)?;
        let names = match attrs {
            Some(names) => names.to_vec(),
            None => obj.attrs.persistent_names(),
        };
        store.remove(obj.gclass.name(), &obj.name, &names)
    }

    /// List this instance's attributes present in the host store
    pub fn list_persistent_attrs(&self, id: GObjId, filter: Option<&str>) -> Result<Vec<String>> {
        let obj = self.objs.get(id).ok_or(GObjError::DeadObject)?;
        let store = self.persist.as_deref().ok_or(GObjError::PersistUnavailable)?;
        store.list(obj.gclass.name(), &obj.name, filter)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Commands & stats
    // ─────────────────────────────────────────────────────────────────────

    /// Invoke a command from the class command table, falling back to the
    /// process-wide command parser when the class has no such entry
    pub fn command(
        &mut self,
        id: GObjId,
        command: &str,
        kw: &GValue,
        source: Option<GObjId>,
    ) -> Result<GValue> {
        let gclass = self.live(id)?.gclass.clone();
        if let Some(desc) = gclass.command(command) {
            let handler = desc.handler.clone();
            return handler(self, id, kw, source);
        }
        if let Some(parser) = self.command_parser.clone() {
            return parser(self, id, command, kw, source);
        }
        Err(GObjError::UnknownCommand {
            gclass: gclass.name().to_string(),
            command: command.to_string(),
        })
    }

    /// Snapshot of the instance's stat-flagged attributes, routed through
    /// the process-wide stats parser when one is installed
    pub fn stats(&mut self, id: GObjId, filter: Option<&str>) -> Result<GValue> {
        if let Some(parser) = self.stats_parser.clone() {
            return parser(self, id, filter);
        }
        Ok(self.live(id)?.attrs.stat_snapshot(filter))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Timers
    // ─────────────────────────────────────────────────────────────────────

    /// Arm a one-shot timer delivering `event` to `target` after `delay`
    pub fn set_timeout(
        &mut self,
        target: GObjId,
        event: &str,
        kw: GValue,
        delay: Duration,
    ) -> Result<TimerId> {
        self.live(target)?;
        Ok(self
            .timers
            .set_timeout(Instant::now(), delay, target, event, kw))
    }

    /// Arm a periodic timer delivering `event` to `target` every `period`
    pub fn set_interval(
        &mut self,
        target: GObjId,
        event: &str,
        kw: GValue,
        period: Duration,
    ) -> Result<TimerId> {
        self.live(target)?;
        Ok(self
            .timers
            .set_interval(Instant::now(), period, target, event, kw))
    }

    /// Cancel a pending timer; false when it already fired or was cleared
    pub fn clear_timeout(&mut self, id: TimerId) -> bool {
        self.timers.clear(id)
    }

    /// Fire every due timer through `send_event`; returns how many fired
    pub fn process_timers(&mut self) -> usize {
        let due = self.timers.take_due(Instant::now());
        let mut fired = 0;
        for (timer_id, target, event, kw) in due {
            match self.send_event(target, &event, &kw, None) {
                Ok(_) => fired += 1,
                Err(GObjError::DeadObject) => {
                    self.timers.clear(timer_id);
                }
                Err(err) => {
                    warn!(event = %event, error = %err, "timer dispatch failed");
                }
            }
        }
        fired
    }

    /// Number of pending timers
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsm::EventTransition;
    use crate::gclass::GClass;
    use crate::registry::register_gclass;

    fn runtime() -> GRuntime {
        GRuntime::new(GlobalSettings::default())
    }

    #[test]
    fn test_create_starts_automatically() {
        let mut rt = runtime();
        register_gclass(
            GClass::builder("RtAuto")
                .event("EV_X")
                .state("ST_IDLE", vec![]),
        )
        .unwrap();

        let id = rt.create("RtAuto", "auto", &GValue::Null, None).unwrap();
        assert_eq!(rt.gobj(id).unwrap().status(), LifecycleStatus::Started);
        assert_eq!(rt.current_state(id).unwrap(), "ST_IDLE");
    }

    #[test]
    fn test_manual_start_class_stays_created() {
        let mut rt = runtime();
        register_gclass(
            GClass::builder("RtManual")
                .event("EV_X")
                .state("ST_IDLE", vec![])
                .manual_start(),
        )
        .unwrap();

        let id = rt.create("RtManual", "manual", &GValue::Null, None).unwrap();
        assert_eq!(rt.gobj(id).unwrap().status(), LifecycleStatus::Created);
        rt.start(id).unwrap();
        assert_eq!(rt.gobj(id).unwrap().status(), LifecycleStatus::Started);
    }

    #[test]
    fn test_duplicate_sibling_name_rejected() {
        let mut rt = runtime();
        register_gclass(
            GClass::builder("RtSibling")
                .event("EV_X")
                .state("ST_IDLE", vec![]),
        )
        .unwrap();

        let parent = rt.create("RtSibling", "parent", &GValue::Null, None).unwrap();
        rt.create("RtSibling", "kid", &GValue::Null, Some(parent))
            .unwrap();
        let err = rt
            .create("RtSibling", "kid", &GValue::Null, Some(parent))
            .unwrap_err();
        assert!(matches!(err, GObjError::DuplicateSiblingName(name) if name == "kid"));

        // same name under another parent is fine
        rt.create("RtSibling", "kid", &GValue::Null, None).unwrap();
    }

    #[test]
    fn test_create_in_state() {
        let mut rt = runtime();
        register_gclass(
            GClass::builder("RtInitState")
                .event("EV_X")
                .state("ST_A", vec![])
                .state("ST_B", vec![]),
        )
        .unwrap();

        let id = rt
            .create_in_state("RtInitState", "b-first", &GValue::Null, None, "ST_B")
            .unwrap();
        assert_eq!(rt.current_state(id).unwrap(), "ST_B");

        let err = rt
            .create_in_state("RtInitState", "nowhere", &GValue::Null, None, "ST_NONE")
            .unwrap_err();
        assert!(matches!(err, GObjError::StructuralFsm { .. }));
    }

    #[test]
    fn test_full_name_walks_ancestry() {
        let mut rt = runtime();
        register_gclass(
            GClass::builder("RtPath")
                .event("EV_X")
                .state("ST_IDLE", vec![]),
        )
        .unwrap();
        let root = rt.create("RtPath", "root", &GValue::Null, None).unwrap();
        let mid = rt.create("RtPath", "mid", &GValue::Null, Some(root)).unwrap();
        let leaf = rt.create("RtPath", "leaf", &GValue::Null, Some(mid)).unwrap();
        assert_eq!(rt.full_name(leaf).unwrap(), "root/mid/leaf");
    }

    #[test]
    fn test_play_requires_running() {
        let mut rt = runtime();
        register_gclass(
            GClass::builder("RtPlay")
                .event("EV_X")
                .state("ST_IDLE", vec![])
                .manual_start(),
        )
        .unwrap();
        let id = rt.create("RtPlay", "p", &GValue::Null, None).unwrap();

        let err = rt.play(id).unwrap_err();
        assert!(matches!(err, GObjError::InvalidLifecycle { op: "play", .. }));

        rt.start(id).unwrap();
        rt.play(id).unwrap();
        assert_eq!(rt.gobj(id).unwrap().status(), LifecycleStatus::Playing);
        rt.pause(id).unwrap();
        assert_eq!(rt.gobj(id).unwrap().status(), LifecycleStatus::Paused);
        rt.play(id).unwrap();
        rt.stop(id).unwrap();
        assert_eq!(rt.gobj(id).unwrap().status(), LifecycleStatus::Stopped);
    }

    #[test]
    fn test_unhandled_event_keeps_state() {
        let mut rt = runtime();
        register_gclass(
            GClass::builder("RtUnhandled")
                .event("EV_KNOWN")
                .event("EV_OTHER")
                .state(
                    "ST_IDLE",
                    vec![EventTransition::new("EV_KNOWN").to("ST_DONE")],
                )
                .state("ST_DONE", vec![]),
        )
        .unwrap();
        let id = rt.create("RtUnhandled", "u", &GValue::Null, None).unwrap();

        let outcome = rt.send_event(id, "EV_OTHER", &GValue::Null, None).unwrap();
        assert_eq!(outcome, DispatchOutcome::Unhandled);
        assert_eq!(rt.current_state(id).unwrap(), "ST_IDLE");
    }
}
