//! Host persistence seam
//!
//! The runtime never stores attribute values durably itself: attributes
//! flagged persistent are round-tripped through a host-supplied store, keyed
//! by `(gclass name, instance name, attribute name)`. Store failures are
//! opaque to the runtime and propagate unchanged to whoever triggered the
//! operation; nothing is retried.

use gobj_core::{GValue, Result};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;

/// Host-supplied durable storage for persistent attributes
pub trait PersistStore: Send {
    /// Load the named attributes; missing entries are simply absent from
    /// the result
    fn load(
        &self,
        gclass: &str,
        instance: &str,
        attrs: &[String],
    ) -> Result<IndexMap<String, GValue>>;

    /// Durably store the given attribute values
    fn save(
        &mut self,
        gclass: &str,
        instance: &str,
        values: &IndexMap<String, GValue>,
    ) -> Result<()>;

    /// Delete the named attributes
    fn remove(&mut self, gclass: &str, instance: &str, attrs: &[String]) -> Result<()>;

    /// Names of stored attributes, optionally filtered by name prefix
    fn list(&self, gclass: &str, instance: &str, filter: Option<&str>) -> Result<Vec<String>>;
}

/// In-memory store, for tests and single-run hosts
#[derive(Default)]
pub struct MemoryPersistStore {
    entries: FxHashMap<(String, String), IndexMap<String, GValue>>,
}

impl MemoryPersistStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersistStore for MemoryPersistStore {
    fn load(
        &self,
        gclass: &str,
        instance: &str,
        attrs: &[String],
    ) -> Result<IndexMap<String, GValue>> {
        let key = (gclass.to_string(), instance.to_string());
        let Some(stored) = self.entries.get(&key) else {
            return Ok(IndexMap::new());
        };
        Ok(attrs
            .iter()
            .filter_map(|name| stored.get(name).map(|v| (name.clone(), v.clone())))
            .collect())
    }

    fn save(
        &mut self,
        gclass: &str,
        instance: &str,
        values: &IndexMap<String, GValue>,
    ) -> Result<()> {
        let key = (gclass.to_string(), instance.to_string());
        let stored = self.entries.entry(key).or_default();
        for (name, value) in values {
            stored.insert(name.clone(), value.clone());
        }
        Ok(())
    }

    fn remove(&mut self, gclass: &str, instance: &str, attrs: &[String]) -> Result<()> {
        let key = (gclass.to_string(), instance.to_string());
        if let Some(stored) = self.entries.get_mut(&key) {
            for name in attrs {
                stored.shift_remove(name);
            }
        }
        Ok(())
    }

    fn list(&self, gclass: &str, instance: &str, filter: Option<&str>) -> Result<Vec<String>> {
        let key = (gclass.to_string(), instance.to_string());
        Ok(self
            .entries
            .get(&key)
            .map(|stored| {
                stored
                    .keys()
                    .filter(|name| filter.map_or(true, |f| name.starts_with(f)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_round_trip() {
        let mut store = MemoryPersistStore::new();
        let mut values = IndexMap::new();
        values.insert("timeout".to_string(), GValue::Int(30));
        values.insert("url".to_string(), GValue::Str("wss://remote".into()));
        store.save("Connex", "main", &values).unwrap();

        let loaded = store
            .load("Connex", "main", &["timeout".to_string()])
            .unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.get("timeout").and_then(|v| v.as_int()), Some(30));

        // unknown instance loads empty
        assert!(store
            .load("Connex", "other", &["timeout".to_string()])
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_memory_store_remove_and_list() {
        let mut store = MemoryPersistStore::new();
        let mut values = IndexMap::new();
        values.insert("tx_count".to_string(), GValue::Int(1));
        values.insert("rx_count".to_string(), GValue::Int(2));
        store.save("Connex", "main", &values).unwrap();

        let mut listed = store.list("Connex", "main", None).unwrap();
        listed.sort();
        assert_eq!(listed, vec!["rx_count".to_string(), "tx_count".to_string()]);

        let filtered = store.list("Connex", "main", Some("tx")).unwrap();
        assert_eq!(filtered, vec!["tx_count".to_string()]);

        store
            .remove("Connex", "main", &["tx_count".to_string()])
            .unwrap();
        assert_eq!(store.list("Connex", "main", None).unwrap().len(), 1);
    }
}
