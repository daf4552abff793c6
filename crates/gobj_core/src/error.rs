//! Shared error taxonomy for the GObj runtime

use crate::value::GType;
use thiserror::Error;

/// Errors produced by the GObj runtime
#[derive(Error, Debug)]
pub enum GObjError {
    /// A gclass with this name is already registered
    #[error("gclass already registered: {0}")]
    DuplicateClass(String),

    /// No gclass registered under this name
    #[error("gclass not found: {0}")]
    ClassNotFound(String),

    /// The state table is structurally invalid (unknown transition target, empty table)
    #[error("gclass {gclass}: invalid state table: {reason}")]
    StructuralFsm { gclass: String, reason: String },

    /// An event name absent from the class's declared event types
    #[error("gclass {gclass}: unknown event type: {event}")]
    UnknownEventType { gclass: String, event: String },

    /// Two attribute descriptors share a name
    #[error("duplicate attribute: {0}")]
    DuplicateAttribute(String),

    /// No attribute with this name in the schema
    #[error("unknown attribute: {0}")]
    UnknownAttribute(String),

    /// The attribute descriptor is not writable
    #[error("attribute is read-only: {0}")]
    ReadOnlyAttribute(String),

    /// A value's runtime type disagrees with the descriptor's declared type
    #[error("attribute {attr}: expected {expected}, got {got}")]
    TypeMismatch {
        attr: String,
        expected: GType,
        got: &'static str,
    },

    /// Instance name already in use under the same parent
    #[error("sibling name already in use: {0}")]
    DuplicateSiblingName(String),

    /// Dispatch or lookup against a destroyed (or never-created) instance
    #[error("gobj is destroyed or unknown")]
    DeadObject,

    /// Nested synchronous dispatch exceeded the configured depth
    #[error("event dispatch exceeded {0} nested levels")]
    RecursionLimitExceeded(usize),

    /// Lifecycle operation not allowed in the instance's current status
    #[error("cannot {op} a gobj that is {status}")]
    InvalidLifecycle {
        op: &'static str,
        status: &'static str,
    },

    /// Two command descriptors share a name
    #[error("duplicate command: {0}")]
    DuplicateCommand(String),

    /// No such command in the class table and no fallback parser installed
    #[error("gclass {gclass}: unknown command: {command}")]
    UnknownCommand { gclass: String, command: String },

    /// No matching subscription edge to remove
    #[error("subscription not found")]
    SubscriptionNotFound,

    /// A persistent-attribute operation was issued with no store configured
    #[error("no persistence store configured")]
    PersistUnavailable,

    /// Opaque failure reported by the host persistence store
    #[error("persistence failure: {0}")]
    Persist(String),

    /// `start_up` was called a second time in the same process
    #[error("start_up called twice in the same process")]
    AlreadyStartedUp,

    /// A registration was attempted before any runtime existed
    #[error("runtime not started up")]
    NotStartedUp,
}

/// Result type for GObj runtime operations
pub type Result<T> = std::result::Result<T, GObjError>;
