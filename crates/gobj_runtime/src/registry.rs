//! Process-wide gclass registry
//!
//! One registry per process, initialized by `start_up` (or the first runtime
//! constructed in tests) and append-only afterwards: a name, once registered,
//! can never be replaced. Lookups are read-mostly, so the table sits behind a
//! `RwLock`.

use crate::gclass::{GClass, GClassBuilder};
use gobj_core::{GObjError, Result};
use rustc_hash::FxHashMap;
use std::sync::{Arc, OnceLock, RwLock};
use tracing::debug;

/// Global registry singleton
static REGISTRY: OnceLock<GClassRegistry> = OnceLock::new();

/// Global table of registered gclass definitions
pub struct GClassRegistry {
    classes: RwLock<FxHashMap<String, Arc<GClass>>>,
}

impl GClassRegistry {
    /// Initialize the global registry.
    ///
    /// Safe to call multiple times; the first call wins.
    pub fn init() {
        let _ = REGISTRY.set(GClassRegistry {
            classes: RwLock::new(FxHashMap::default()),
        });
    }

    /// The global registry; fails before `start_up`
    pub fn get() -> Result<&'static GClassRegistry> {
        REGISTRY.get().ok_or(GObjError::NotStartedUp)
    }

    pub fn try_get() -> Option<&'static GClassRegistry> {
        REGISTRY.get()
    }

    /// Register a built class under its unique name.
    ///
    /// A duplicate name is rejected and the previous definition is untouched.
    pub fn register(&self, gclass: GClass) -> Result<Arc<GClass>> {
        let mut classes = self.classes.write().unwrap();
        if classes.contains_key(gclass.name()) {
            return Err(GObjError::DuplicateClass(gclass.name().to_string()));
        }
        let gclass = Arc::new(gclass);
        debug!(gclass = %gclass.name(), states = gclass.states().len(), "registered gclass");
        classes.insert(gclass.name().to_string(), gclass.clone());
        Ok(gclass)
    }

    /// Look up a registered class by name
    pub fn lookup(&self, name: &str) -> Result<Arc<GClass>> {
        self.classes
            .read()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| GObjError::ClassNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.read().unwrap().contains_key(name)
    }

    /// Names of every registered class, unordered
    pub fn class_names(&self) -> Vec<String> {
        self.classes.read().unwrap().keys().cloned().collect()
    }
}

/// Validate and register a class built by `GClassBuilder`
pub fn register_gclass(builder: GClassBuilder) -> Result<Arc<GClass>> {
    GClassRegistry::get()?.register(builder.build()?)
}
