//! Attribute schema and per-instance store
//!
//! A gclass declares its attributes once as an ordered list of descriptors;
//! every instance then carries a store built from the schema defaults overlaid
//! with construction-time values. The store enforces the descriptor's declared
//! type and writability on every write; persistence is a flag here, never
//! logic (the runtime delegates flagged attributes to the host store).

use crate::error::{GObjError, Result};
use crate::value::{GType, GValue};
use indexmap::IndexMap;
use std::sync::Arc;

/// Attribute capability flags
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AttrFlags {
    bits: u8,
}

impl AttrFlags {
    pub const READABLE: u8 = 0b0000_0001;
    pub const WRITABLE: u8 = 0b0000_0010;
    pub const PERSISTENT: u8 = 0b0000_0100;
    pub const PUBLIC: u8 = 0b0000_1000;
    pub const STAT: u8 = 0b0001_0000;

    /// Readable and writable
    pub const RW: AttrFlags = AttrFlags {
        bits: Self::READABLE | Self::WRITABLE,
    };
    /// Readable only
    pub const RO: AttrFlags = AttrFlags {
        bits: Self::READABLE,
    };

    /// Create from raw bits
    pub const fn from_bits(bits: u8) -> Self {
        Self { bits }
    }

    /// Union with more flag bits, chainable
    pub const fn with(self, bits: u8) -> Self {
        Self {
            bits: self.bits | bits,
        }
    }

    pub const fn readable(&self) -> bool {
        self.bits & Self::READABLE != 0
    }

    pub const fn writable(&self) -> bool {
        self.bits & Self::WRITABLE != 0
    }

    pub const fn persistent(&self) -> bool {
        self.bits & Self::PERSISTENT != 0
    }

    pub const fn public(&self) -> bool {
        self.bits & Self::PUBLIC != 0
    }

    pub const fn stat(&self) -> bool {
        self.bits & Self::STAT != 0
    }
}

/// Declarative description of one attribute: `(type, name, default, flags, description)`
#[derive(Clone, Debug)]
pub struct AttrDescriptor {
    pub ty: GType,
    pub name: String,
    pub default_value: GValue,
    pub flags: AttrFlags,
    pub description: String,
}

impl AttrDescriptor {
    pub fn new(
        ty: GType,
        name: &str,
        default_value: impl Into<GValue>,
        flags: AttrFlags,
        description: &str,
    ) -> Self {
        Self {
            ty,
            name: name.to_string(),
            default_value: default_value.into(),
            flags,
            description: description.to_string(),
        }
    }

    /// Descriptor whose default is the type's empty value
    pub fn plain(ty: GType, name: &str, flags: AttrFlags, description: &str) -> Self {
        Self::new(ty, name, ty.empty_value(), flags, description)
    }
}

/// Ordered, validated attribute schema shared by every instance of a gclass
#[derive(Clone, Debug, Default)]
pub struct Schema {
    attrs: IndexMap<String, AttrDescriptor>,
}

impl Schema {
    /// Validate and build a schema from an ordered descriptor list.
    ///
    /// Fails with `DuplicateAttribute` on a name collision and with
    /// `TypeMismatch` when a descriptor's default disagrees with its type.
    pub fn declare(descriptors: Vec<AttrDescriptor>) -> Result<Self> {
        let mut attrs = IndexMap::with_capacity(descriptors.len());
        for desc in descriptors {
            if !desc.default_value.is_compatible(desc.ty) {
                return Err(GObjError::TypeMismatch {
                    attr: desc.name.clone(),
                    expected: desc.ty,
                    got: desc.default_value.type_name(),
                });
            }
            let name = desc.name.clone();
            if attrs.insert(name.clone(), desc).is_some() {
                return Err(GObjError::DuplicateAttribute(name));
            }
        }
        Ok(Self { attrs })
    }

    /// Schema with no attributes
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&AttrDescriptor> {
        self.attrs.get(name)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.attrs.get_index_of(name)
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    /// Descriptors in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &AttrDescriptor> {
        self.attrs.values()
    }
}

/// Per-instance attribute value store
#[derive(Clone, Debug)]
pub struct AttrStore {
    schema: Arc<Schema>,
    values: Vec<GValue>,
}

impl AttrStore {
    /// Build a store from schema defaults overlaid with `overrides`.
    ///
    /// Every override must name a declared attribute and carry a
    /// type-compatible value; read-only attributes may be overridden here
    /// (construction-time values are not runtime writes).
    pub fn instantiate(schema: Arc<Schema>, overrides: &IndexMap<String, GValue>) -> Result<Self> {
        for (name, value) in overrides {
            let desc = schema
                .get(name)
                .ok_or_else(|| GObjError::UnknownAttribute(name.clone()))?;
            if !value.is_compatible(desc.ty) {
                return Err(GObjError::TypeMismatch {
                    attr: name.clone(),
                    expected: desc.ty,
                    got: value.type_name(),
                });
            }
        }

        let values = schema
            .iter()
            .map(|desc| {
                overrides
                    .get(&desc.name)
                    .cloned()
                    .unwrap_or_else(|| desc.default_value.clone())
            })
            .collect();

        Ok(Self { schema, values })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Read an attribute value
    pub fn get(&self, name: &str) -> Result<&GValue> {
        let idx = self
            .schema
            .index_of(name)
            .ok_or_else(|| GObjError::UnknownAttribute(name.to_string()))?;
        Ok(&self.values[idx])
    }

    /// Write an attribute value, enforcing writability and type.
    ///
    /// The stored value is untouched when the write is rejected.
    pub fn set(&mut self, name: &str, value: GValue) -> Result<()> {
        let (idx, ty, writable) = match self.schema.attrs.get_full(name) {
            Some((idx, _, desc)) => (idx, desc.ty, desc.flags.writable()),
            None => return Err(GObjError::UnknownAttribute(name.to_string())),
        };
        if !writable {
            return Err(GObjError::ReadOnlyAttribute(name.to_string()));
        }
        if !value.is_compatible(ty) {
            return Err(GObjError::TypeMismatch {
                attr: name.to_string(),
                expected: ty,
                got: value.type_name(),
            });
        }
        self.values[idx] = value;
        Ok(())
    }

    /// Write an attribute bypassing the writability check.
    ///
    /// Used when restoring persisted values; the type check still applies.
    pub fn restore(&mut self, name: &str, value: GValue) -> Result<()> {
        let (idx, ty) = match self.schema.attrs.get_full(name) {
            Some((idx, _, desc)) => (idx, desc.ty),
            None => return Err(GObjError::UnknownAttribute(name.to_string())),
        };
        if !value.is_compatible(ty) {
            return Err(GObjError::TypeMismatch {
                attr: name.to_string(),
                expected: ty,
                got: value.type_name(),
            });
        }
        self.values[idx] = value;
        Ok(())
    }

    /// Names of attributes flagged persistent, in declaration order
    pub fn persistent_names(&self) -> Vec<String> {
        self.schema
            .iter()
            .filter(|d| d.flags.persistent())
            .map(|d| d.name.clone())
            .collect()
    }

    /// Current values of persistent attributes
    pub fn persistent_snapshot(&self) -> IndexMap<String, GValue> {
        self.schema
            .iter()
            .enumerate()
            .filter(|(_, d)| d.flags.persistent())
            .map(|(i, d)| (d.name.clone(), self.values[i].clone()))
            .collect()
    }

    /// Dict of attributes flagged public (and readable)
    pub fn public_snapshot(&self) -> GValue {
        let map: IndexMap<String, GValue> = self
            .schema
            .iter()
            .enumerate()
            .filter(|(_, d)| d.flags.public() && d.flags.readable())
            .map(|(i, d)| (d.name.clone(), self.values[i].clone()))
            .collect();
        GValue::Dict(map)
    }

    /// Dict of attributes flagged stat, optionally filtered by name prefix
    pub fn stat_snapshot(&self, filter: Option<&str>) -> GValue {
        let map: IndexMap<String, GValue> = self
            .schema
            .iter()
            .enumerate()
            .filter(|(_, d)| d.flags.stat())
            .filter(|(_, d)| filter.map_or(true, |f| d.name.starts_with(f)))
            .map(|(i, d)| (d.name.clone(), self.values[i].clone()))
            .collect();
        GValue::Dict(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_schema() -> Arc<Schema> {
        Arc::new(
            Schema::declare(vec![
                AttrDescriptor::new(GType::Str, "url", "ws://localhost", AttrFlags::RW, "endpoint"),
                AttrDescriptor::new(
                    GType::Int,
                    "timeout",
                    5_i64,
                    AttrFlags::RW.with(AttrFlags::PERSISTENT),
                    "seconds",
                ),
                AttrDescriptor::new(GType::Bool, "secure", true, AttrFlags::RO, "tls on"),
            ])
            .unwrap(),
        )
    }

    #[test]
    fn test_declare_rejects_duplicate_names() {
        let err = Schema::declare(vec![
            AttrDescriptor::plain(GType::Int, "n", AttrFlags::RW, ""),
            AttrDescriptor::plain(GType::Int, "n", AttrFlags::RW, ""),
        ])
        .unwrap_err();
        assert!(matches!(err, GObjError::DuplicateAttribute(name) if name == "n"));
    }

    #[test]
    fn test_declare_rejects_bad_default() {
        let err = Schema::declare(vec![AttrDescriptor::new(
            GType::Int,
            "n",
            "not an int",
            AttrFlags::RW,
            "",
        )])
        .unwrap_err();
        assert!(matches!(err, GObjError::TypeMismatch { attr, .. } if attr == "n"));
    }

    #[test]
    fn test_instantiate_defaults_and_overrides() {
        let schema = sample_schema();
        let mut overrides = IndexMap::new();
        overrides.insert("timeout".to_string(), GValue::Int(30));
        let store = AttrStore::instantiate(schema, &overrides).unwrap();

        assert_eq!(store.get("url").unwrap().as_str(), Some("ws://localhost"));
        assert_eq!(store.get("timeout").unwrap().as_int(), Some(30));
        assert_eq!(store.get("secure").unwrap().as_bool(), Some(true));
    }

    #[test]
    fn test_instantiate_rejects_mistyped_override() {
        let schema = sample_schema();
        let mut overrides = IndexMap::new();
        overrides.insert("timeout".to_string(), GValue::Str("soon".into()));
        let err = AttrStore::instantiate(schema, &overrides).unwrap_err();
        assert!(matches!(err, GObjError::TypeMismatch { attr, .. } if attr == "timeout"));
    }

    #[test]
    fn test_instantiate_rejects_unknown_override() {
        let schema = sample_schema();
        let mut overrides = IndexMap::new();
        overrides.insert("nope".to_string(), GValue::Int(1));
        let err = AttrStore::instantiate(schema, &overrides).unwrap_err();
        assert!(matches!(err, GObjError::UnknownAttribute(name) if name == "nope"));
    }

    #[test]
    fn test_set_and_get_round_trip() {
        let schema = sample_schema();
        let mut store = AttrStore::instantiate(schema, &IndexMap::new()).unwrap();
        store.set("url", GValue::Str("wss://remote".into())).unwrap();
        assert_eq!(store.get("url").unwrap().as_str(), Some("wss://remote"));
    }

    #[test]
    fn test_set_read_only_leaves_value_unchanged() {
        let schema = sample_schema();
        let mut store = AttrStore::instantiate(schema, &IndexMap::new()).unwrap();
        let err = store.set("secure", GValue::Bool(false)).unwrap_err();
        assert!(matches!(err, GObjError::ReadOnlyAttribute(name) if name == "secure"));
        assert_eq!(store.get("secure").unwrap().as_bool(), Some(true));
    }

    #[test]
    fn test_set_type_mismatch_leaves_value_unchanged() {
        let schema = sample_schema();
        let mut store = AttrStore::instantiate(schema, &IndexMap::new()).unwrap();
        let err = store.set("timeout", GValue::Bool(true)).unwrap_err();
        assert!(matches!(err, GObjError::TypeMismatch { .. }));
        assert_eq!(store.get("timeout").unwrap().as_int(), Some(5));
    }

    #[test]
    fn test_get_unknown_attribute() {
        let schema = sample_schema();
        let store = AttrStore::instantiate(schema, &IndexMap::new()).unwrap();
        assert!(matches!(
            store.get("nope"),
            Err(GObjError::UnknownAttribute(_))
        ));
    }

    #[test]
    fn test_restore_bypasses_writability() {
        let schema = sample_schema();
        let mut store = AttrStore::instantiate(schema, &IndexMap::new()).unwrap();
        store.restore("secure", GValue::Bool(false)).unwrap();
        assert_eq!(store.get("secure").unwrap().as_bool(), Some(false));

        let err = store.restore("secure", GValue::Int(1)).unwrap_err();
        assert!(matches!(err, GObjError::TypeMismatch { .. }));
    }

    #[test]
    fn test_persistent_views() {
        let schema = sample_schema();
        let store = AttrStore::instantiate(schema, &IndexMap::new()).unwrap();
        assert_eq!(store.persistent_names(), vec!["timeout".to_string()]);
        let snap = store.persistent_snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.get("timeout").and_then(|v| v.as_int()), Some(5));
    }
}
