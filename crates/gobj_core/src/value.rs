//! Tagged value model
//!
//! `GValue` is the single value currency of the runtime: attribute values,
//! event payloads ("kw"), subscription filters and per-instance private data
//! are all `GValue` trees. Dict entries keep insertion order.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use std::fmt;

new_key_type! {
    /// Unique identifier for a live gobj instance
    pub struct GObjId;
}

/// Declared type of an attribute descriptor
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GType {
    /// Non-owning reference to a live instance
    Obj,
    Str,
    Int,
    Real,
    Bool,
    Dict,
    List,
}

impl GType {
    /// The value an attribute of this type holds when no default is given
    pub fn empty_value(self) -> GValue {
        match self {
            GType::Obj => GValue::Null,
            GType::Str => GValue::Str(String::new()),
            GType::Int => GValue::Int(0),
            GType::Real => GValue::Real(0.0),
            GType::Bool => GValue::Bool(false),
            GType::Dict => GValue::Dict(IndexMap::new()),
            GType::List => GValue::List(Vec::new()),
        }
    }
}

impl fmt::Display for GType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GType::Obj => "obj",
            GType::Str => "str",
            GType::Int => "int",
            GType::Real => "real",
            GType::Bool => "bool",
            GType::Dict => "dict",
            GType::List => "list",
        };
        f.write_str(name)
    }
}

/// A dynamically typed runtime value
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GValue {
    Null,
    Bool(bool),
    Int(i64),
    Real(f64),
    Str(String),
    List(Vec<GValue>),
    Dict(IndexMap<String, GValue>),
    /// Non-owning reference to a live instance
    Obj(GObjId),
}

impl GValue {
    /// Create an empty dict value
    pub fn dict() -> GValue {
        GValue::Dict(IndexMap::new())
    }

    /// Chainable dict-entry insertion; no-op on non-dict values
    pub fn entry(mut self, key: &str, value: impl Into<GValue>) -> Self {
        if let GValue::Dict(map) = &mut self {
            map.insert(key.to_string(), value.into());
        }
        self
    }

    /// Look up a dict entry
    pub fn get(&self, key: &str) -> Option<&GValue> {
        match self {
            GValue::Dict(map) => map.get(key),
            _ => None,
        }
    }

    /// Short name of the runtime variant, for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            GValue::Null => "null",
            GValue::Bool(_) => "bool",
            GValue::Int(_) => "int",
            GValue::Real(_) => "real",
            GValue::Str(_) => "str",
            GValue::List(_) => "list",
            GValue::Dict(_) => "dict",
            GValue::Obj(_) => "obj",
        }
    }

    /// Whether this value may be stored under a descriptor of type `ty`.
    ///
    /// `Null` is accepted for nullable types (obj, str, dict, list) but never
    /// for int, real or bool.
    pub fn is_compatible(&self, ty: GType) -> bool {
        match (self, ty) {
            (GValue::Null, GType::Obj | GType::Str | GType::Dict | GType::List) => true,
            (GValue::Bool(_), GType::Bool) => true,
            (GValue::Int(_), GType::Int) => true,
            (GValue::Real(_), GType::Real) => true,
            (GValue::Str(_), GType::Str) => true,
            (GValue::List(_), GType::List) => true,
            (GValue::Dict(_), GType::Dict) => true,
            (GValue::Obj(_), GType::Obj) => true,
            _ => false,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, GValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            GValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            GValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            GValue::Real(r) => Some(*r),
            GValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            GValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[GValue]> {
        match self {
            GValue::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&IndexMap<String, GValue>> {
        match self {
            GValue::Dict(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_obj(&self) -> Option<GObjId> {
        match self {
            GValue::Obj(id) => Some(*id),
            _ => None,
        }
    }
}

impl Default for GValue {
    fn default() -> Self {
        GValue::Null
    }
}

impl From<bool> for GValue {
    fn from(b: bool) -> Self {
        GValue::Bool(b)
    }
}

impl From<i64> for GValue {
    fn from(i: i64) -> Self {
        GValue::Int(i)
    }
}

impl From<i32> for GValue {
    fn from(i: i32) -> Self {
        GValue::Int(i as i64)
    }
}

impl From<f64> for GValue {
    fn from(r: f64) -> Self {
        GValue::Real(r)
    }
}

impl From<&str> for GValue {
    fn from(s: &str) -> Self {
        GValue::Str(s.to_string())
    }
}

impl From<String> for GValue {
    fn from(s: String) -> Self {
        GValue::Str(s)
    }
}

impl From<Vec<GValue>> for GValue {
    fn from(l: Vec<GValue>) -> Self {
        GValue::List(l)
    }
}

impl From<IndexMap<String, GValue>> for GValue {
    fn from(d: IndexMap<String, GValue>) -> Self {
        GValue::Dict(d)
    }
}

impl From<GObjId> for GValue {
    fn from(id: GObjId) -> Self {
        GValue::Obj(id)
    }
}
