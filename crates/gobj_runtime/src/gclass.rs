//! GClass definitions
//!
//! A gclass couples a declarative attribute schema, a state table, lifecycle
//! hooks and a command table under one unique name. Classes are built through
//! `GClass::builder`, validated once in `build()`, and immutable afterwards.

use crate::fsm::{EventTransition, StateTable};
use crate::runtime::GRuntime;
use gobj_core::{AttrDescriptor, GObjError, GObjId, GValue, Result, Schema};
use indexmap::IndexMap;
use std::sync::Arc;

/// Event direction flags
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EventFlags {
    bits: u8,
}

impl EventFlags {
    pub const INPUT: u8 = 0b01;
    pub const OUTPUT: u8 = 0b10;

    pub const fn from_bits(bits: u8) -> Self {
        Self { bits }
    }

    /// The class receives this event
    pub const fn input(&self) -> bool {
        self.bits & Self::INPUT != 0
    }

    /// The class publishes this event to subscribers
    pub const fn output(&self) -> bool {
        self.bits & Self::OUTPUT != 0
    }
}

impl Default for EventFlags {
    /// Events are both receivable and publishable unless narrowed
    fn default() -> Self {
        Self {
            bits: Self::INPUT | Self::OUTPUT,
        }
    }
}

/// A declared event type
#[derive(Clone, Debug)]
pub struct EventDesc {
    pub name: String,
    pub flags: EventFlags,
}

impl EventDesc {
    /// Event receivable and publishable
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            flags: EventFlags::default(),
        }
    }

    /// Event the class only receives
    pub fn input(name: &str) -> Self {
        Self {
            name: name.to_string(),
            flags: EventFlags::from_bits(EventFlags::INPUT),
        }
    }

    /// Event the class only publishes
    pub fn output(name: &str) -> Self {
        Self {
            name: name.to_string(),
            flags: EventFlags::from_bits(EventFlags::OUTPUT),
        }
    }
}

impl From<&str> for EventDesc {
    fn from(name: &str) -> Self {
        EventDesc::new(name)
    }
}

/// Class behaviour flags
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GClassFlags {
    bits: u8,
}

impl GClassFlags {
    /// Suppress the automatic start after create
    pub const MANUAL_START: u8 = 0b01;

    pub const fn from_bits(bits: u8) -> Self {
        Self { bits }
    }

    pub const fn manual_start(&self) -> bool {
        self.bits & Self::MANUAL_START != 0
    }
}

/// A lifecycle hook; runs synchronously and may reenter the runtime
pub type HookFn = Arc<dyn Fn(&mut GRuntime, GObjId) + Send + Sync>;

/// The `writing` hook; receives the name of the attribute just written
pub type WritingFn = Arc<dyn Fn(&mut GRuntime, GObjId, &str) + Send + Sync>;

/// A command handler from the class command table
pub type CommandFn =
    Arc<dyn Fn(&mut GRuntime, GObjId, &GValue, Option<GObjId>) -> Result<GValue> + Send + Sync>;

/// Optional per-class lifecycle hooks
#[derive(Clone, Default)]
pub struct LifecycleHooks {
    pub create: Option<HookFn>,
    pub start: Option<HookFn>,
    pub stop: Option<HookFn>,
    pub play: Option<HookFn>,
    pub pause: Option<HookFn>,
    pub destroy: Option<HookFn>,
    pub writing: Option<WritingFn>,
}

/// One entry of the class command table
#[derive(Clone)]
pub struct CommandDesc {
    pub name: String,
    pub description: String,
    pub(crate) handler: CommandFn,
}

/// One entry of the class authorization table.
///
/// Stored and listable; enforcement belongs to the host.
#[derive(Clone, Debug)]
pub struct AuthzDesc {
    pub name: String,
    pub description: String,
}

/// Immutable class definition: schema + FSM + hooks + command table
pub struct GClass {
    name: String,
    event_types: Vec<EventDesc>,
    states: StateTable,
    hooks: LifecycleHooks,
    schema: Arc<Schema>,
    private_data_template: GValue,
    commands: Vec<CommandDesc>,
    authz: Vec<AuthzDesc>,
    trace_level: u32,
    flags: GClassFlags,
}

impl std::fmt::Debug for GClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GClass")
            .field("name", &self.name)
            .field("event_types", &self.event_types)
            .field("states", &self.states)
            .field("commands", &self.commands.len())
            .field("authz", &self.authz)
            .field("trace_level", &self.trace_level)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

impl GClass {
    pub fn builder(name: &str) -> GClassBuilder {
        GClassBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn event_types(&self) -> &[EventDesc] {
        &self.event_types
    }

    pub fn event_desc(&self, event: &str) -> Option<&EventDesc> {
        self.event_types.iter().find(|e| e.name == event)
    }

    pub fn has_event(&self, event: &str) -> bool {
        self.event_desc(event).is_some()
    }

    pub fn states(&self) -> &StateTable {
        &self.states
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub(crate) fn hooks(&self) -> &LifecycleHooks {
        &self.hooks
    }

    pub(crate) fn private_data_template(&self) -> &GValue {
        &self.private_data_template
    }

    pub fn commands(&self) -> &[CommandDesc] {
        &self.commands
    }

    pub fn command(&self, name: &str) -> Option<&CommandDesc> {
        self.commands.iter().find(|c| c.name == name)
    }

    pub fn authz(&self) -> &[AuthzDesc] {
        &self.authz
    }

    pub fn trace_level(&self) -> u32 {
        self.trace_level
    }

    pub fn flags(&self) -> GClassFlags {
        self.flags
    }
}

/// Builder for a gclass; `build()` performs all registration-time validation
pub struct GClassBuilder {
    name: String,
    event_types: Vec<EventDesc>,
    states: IndexMap<String, Vec<EventTransition>>,
    duplicate_state: Option<String>,
    hooks: LifecycleHooks,
    attrs: Vec<AttrDescriptor>,
    private_data_template: GValue,
    commands: Vec<CommandDesc>,
    authz: Vec<AuthzDesc>,
    trace_level: u32,
    flags: GClassFlags,
}

impl GClassBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            event_types: Vec::new(),
            states: IndexMap::new(),
            duplicate_state: None,
            hooks: LifecycleHooks::default(),
            attrs: Vec::new(),
            private_data_template: GValue::Null,
            commands: Vec::new(),
            authz: Vec::new(),
            trace_level: 0,
            flags: GClassFlags::default(),
        }
    }

    /// Declare an event type
    pub fn event(mut self, event: impl Into<EventDesc>) -> Self {
        self.event_types.push(event.into());
        self
    }

    /// Declare a state with its ordered transition list.
    ///
    /// The first declared state is the initial state.
    pub fn state(mut self, name: &str, transitions: Vec<EventTransition>) -> Self {
        if self.states.insert(name.to_string(), transitions).is_some() {
            self.duplicate_state = Some(name.to_string());
        }
        self
    }

    /// Declare an attribute
    pub fn attr(mut self, descriptor: AttrDescriptor) -> Self {
        self.attrs.push(descriptor);
        self
    }

    /// Default private-data blob, deep-copied into every instance
    pub fn private_data(mut self, template: GValue) -> Self {
        self.private_data_template = template;
        self
    }

    pub fn on_create<F: Fn(&mut GRuntime, GObjId) + Send + Sync + 'static>(mut self, f: F) -> Self {
        self.hooks.create = Some(Arc::new(f));
        self
    }

    pub fn on_start<F: Fn(&mut GRuntime, GObjId) + Send + Sync + 'static>(mut self, f: F) -> Self {
        self.hooks.start = Some(Arc::new(f));
        self
    }

    pub fn on_stop<F: Fn(&mut GRuntime, GObjId) + Send + Sync + 'static>(mut self, f: F) -> Self {
        self.hooks.stop = Some(Arc::new(f));
        self
    }

    pub fn on_play<F: Fn(&mut GRuntime, GObjId) + Send + Sync + 'static>(mut self, f: F) -> Self {
        self.hooks.play = Some(Arc::new(f));
        self
    }

    pub fn on_pause<F: Fn(&mut GRuntime, GObjId) + Send + Sync + 'static>(mut self, f: F) -> Self {
        self.hooks.pause = Some(Arc::new(f));
        self
    }

    pub fn on_destroy<F: Fn(&mut GRuntime, GObjId) + Send + Sync + 'static>(
        mut self,
        f: F,
    ) -> Self {
        self.hooks.destroy = Some(Arc::new(f));
        self
    }

    /// Hook invoked after every successful runtime-level attribute write
    pub fn on_writing<F: Fn(&mut GRuntime, GObjId, &str) + Send + Sync + 'static>(
        mut self,
        f: F,
    ) -> Self {
        self.hooks.writing = Some(Arc::new(f));
        self
    }

    /// Add a command to the class command table
    pub fn command<F>(mut self, name: &str, description: &str, handler: F) -> Self
    where
        F: Fn(&mut GRuntime, GObjId, &GValue, Option<GObjId>) -> Result<GValue>
            + Send
            + Sync
            + 'static,
    {
        self.commands.push(CommandDesc {
            name: name.to_string(),
            description: description.to_string(),
            handler: Arc::new(handler),
        });
        self
    }

    /// Record an authorization descriptor
    pub fn authz(mut self, name: &str, description: &str) -> Self {
        self.authz.push(AuthzDesc {
            name: name.to_string(),
            description: description.to_string(),
        });
        self
    }

    /// Trace level gating per-class dispatch records
    pub fn trace_level(mut self, level: u32) -> Self {
        self.trace_level = level;
        self
    }

    /// Suppress the automatic start after create
    pub fn manual_start(mut self) -> Self {
        self.flags = GClassFlags::from_bits(self.flags.bits | GClassFlags::MANUAL_START);
        self
    }

    /// Validate and build the class
    pub fn build(self) -> Result<GClass> {
        if let Some(state) = self.duplicate_state {
            return Err(GObjError::StructuralFsm {
                gclass: self.name,
                reason: format!("state {state} declared twice"),
            });
        }
        for (i, ev) in self.event_types.iter().enumerate() {
            if self.event_types[..i].iter().any(|e| e.name == ev.name) {
                return Err(GObjError::StructuralFsm {
                    gclass: self.name.clone(),
                    reason: format!("duplicate event type {}", ev.name),
                });
            }
        }
        for (i, cmd) in self.commands.iter().enumerate() {
            if self.commands[..i].iter().any(|c| c.name == cmd.name) {
                return Err(GObjError::DuplicateCommand(cmd.name.clone()));
            }
        }

        let schema = Arc::new(Schema::declare(self.attrs)?);
        let states = StateTable::compile(&self.name, &self.states, |event| {
            self.event_types.iter().any(|e| e.name == event)
        })?;

        Ok(GClass {
            name: self.name,
            event_types: self.event_types,
            states,
            hooks: self.hooks,
            schema,
            private_data_template: self.private_data_template,
            commands: self.commands,
            authz: self.authz,
            trace_level: self.trace_level,
            flags: self.flags,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsm::EventTransition;

    #[test]
    fn test_build_minimal_class() {
        let gclass = GClass::builder("BuilderMinimal")
            .event("EV_PING")
            .state("ST_IDLE", vec![EventTransition::new("EV_PING")])
            .build()
            .unwrap();

        assert_eq!(gclass.name(), "BuilderMinimal");
        assert_eq!(gclass.states().state_name(0), "ST_IDLE");
        assert!(gclass.has_event("EV_PING"));
        assert!(!gclass.flags().manual_start());
    }

    #[test]
    fn test_build_rejects_stateless_class() {
        let err = GClass::builder("BuilderStateless").build().unwrap_err();
        assert!(matches!(err, GObjError::StructuralFsm { .. }));
    }

    #[test]
    fn test_build_rejects_duplicate_event_type() {
        let err = GClass::builder("BuilderDupEvent")
            .event("EV_PING")
            .event("EV_PING")
            .state("ST_IDLE", vec![])
            .build()
            .unwrap_err();
        assert!(matches!(err, GObjError::StructuralFsm { .. }));
    }

    #[test]
    fn test_build_rejects_duplicate_command() {
        let err = GClass::builder("BuilderDupCmd")
            .event("EV_PING")
            .state("ST_IDLE", vec![])
            .command("help", "", |_, _, _, _| Ok(GValue::Null))
            .command("help", "", |_, _, _, _| Ok(GValue::Null))
            .build()
            .unwrap_err();
        assert!(matches!(err, GObjError::DuplicateCommand(name) if name == "help"));
    }

    #[test]
    fn test_event_flags() {
        let gclass = GClass::builder("BuilderFlags")
            .event(EventDesc::output("EV_STATUS"))
            .event(EventDesc::input("EV_POLL"))
            .state("ST_IDLE", vec![])
            .build()
            .unwrap();

        assert!(gclass.event_desc("EV_STATUS").unwrap().flags.output());
        assert!(!gclass.event_desc("EV_STATUS").unwrap().flags.input());
        assert!(gclass.event_desc("EV_POLL").unwrap().flags.input());
        assert!(!gclass.event_desc("EV_POLL").unwrap().flags.output());
    }
}
