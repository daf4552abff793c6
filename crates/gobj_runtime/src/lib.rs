//! GObj Runtime
//!
//! An embedded actor/object runtime: classes ("gclass") couple a declarative
//! attribute schema, a finite-state machine of named states and event
//! transitions, and lifecycle hooks; instances ("gobj") live in a hierarchical
//! ownership tree and talk through synchronous, reentrant publish/subscribe
//! event routing.
//!
//! - **Class registry**: process-wide, validated once at registration
//! - **FSM dispatch**: per-instance state tracking, deterministic fan-out
//! - **Object tree**: parent-owned children, dangling-free teardown
//! - **Lifecycle**: create/start/play/pause/stop/destroy with idempotent
//!   guards
//! - **Timers**: a host-driven clock that fires through `send_event`
//!
//! # Example
//!
//! ```rust
//! use gobj_runtime::{
//!     register_gclass, EventTransition, GClass, GlobalSettings, GRuntime, GValue,
//! };
//!
//! let mut rt = GRuntime::new(GlobalSettings::default());
//!
//! register_gclass(
//!     GClass::builder("Doorbell")
//!         .event("EV_PRESS")
//!         .state(
//!             "ST_IDLE",
//!             vec![EventTransition::new("EV_PRESS")
//!                 .with_action(|_rt, _id, _ev, _kw, _src| 0)
//!                 .to("ST_RINGING")],
//!         )
//!         .state("ST_RINGING", vec![]),
//! )
//! .unwrap();
//!
//! let bell = rt.create("Doorbell", "front", &GValue::Null, None).unwrap();
//! rt.send_event(bell, "EV_PRESS", &GValue::Null, None).unwrap();
//! assert_eq!(rt.current_state(bell).unwrap(), "ST_RINGING");
//! ```

pub mod fsm;
pub mod gclass;
pub mod gobj;
pub mod persist;
pub mod registry;
pub mod runtime;
pub mod startup;
pub mod timer;

pub use fsm::{ActionFn, DispatchOutcome, EventTransition, StateTable};
pub use gclass::{
    AuthzDesc, CommandDesc, CommandFn, EventDesc, EventFlags, GClass, GClassBuilder, GClassFlags,
    HookFn, LifecycleHooks, WritingFn,
};
pub use gobj::{GObj, LifecycleStatus, Subscription};
pub use persist::{MemoryPersistStore, PersistStore};
pub use registry::{register_gclass, GClassRegistry};
pub use runtime::{CommandParser, GRuntime, StatsParser};
pub use startup::{start_up, GlobalSettings};
pub use timer::{TimerId, TimerScheduler};

// Core primitives, re-exported so hosts depend on one crate
pub use gobj_core::{
    AttrDescriptor, AttrFlags, AttrStore, GObjError, GObjId, GType, GValue, Result, Schema,
};
