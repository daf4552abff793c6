//! GObj Core Primitives
//!
//! Foundational types for the GObj actor/object runtime:
//!
//! - **Tagged values**: `GValue`, the single value currency used for
//!   attribute values, event payloads ("kw"), filters and private data
//! - **Attribute schemas**: declarative per-class descriptors and the
//!   per-instance stores built from them
//! - **Error taxonomy**: the shared `GObjError` enum
//!
//! # Example
//!
//! ```rust
//! use gobj_core::{AttrDescriptor, AttrFlags, AttrStore, GType, GValue, Schema};
//! use indexmap::IndexMap;
//! use std::sync::Arc;
//!
//! let schema = Arc::new(
//!     Schema::declare(vec![AttrDescriptor::new(
//!         GType::Int,
//!         "retries",
//!         3_i64,
//!         AttrFlags::RW,
//!         "reconnect attempts",
//!     )])
//!     .unwrap(),
//! );
//!
//! let mut store = AttrStore::instantiate(schema, &IndexMap::new()).unwrap();
//! store.set("retries", GValue::Int(5)).unwrap();
//! assert_eq!(store.get("retries").unwrap().as_int(), Some(5));
//! ```

pub mod error;
pub mod schema;
pub mod value;

pub use error::{GObjError, Result};
pub use schema::{AttrDescriptor, AttrFlags, AttrStore, Schema};
pub use value::{GObjId, GType, GValue};
