//! Observed Value Model
//!
//! Plain data enters the engine as a [`Value`]: scalars plus keyed records
//! ([`PlainObject`]). Objects are identity-keyed, never content-keyed: two
//! records with the same fields are distinct observables, and equality on
//! the `Object` variant compares handles, not contents.
//!
//! Each record carries a stable [`ObjectId`] minted at construction. The
//! dependency index and the wrapper cache key on that id rather than on the
//! allocation address, so neither structure can confuse a freed object with
//! a new one, and neither keeps the record alive.

use std::fmt::{self, Debug};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use indexmap::IndexMap;
use serde::{Serialize, Serializer};

use crate::error::Error;

/// Unique identifier for an observed object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(u64);

impl ObjectId {
    /// Generate a new unique object ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared handle to a plain keyed record.
pub type ObjectData = Arc<PlainObject>;

/// A plain keyed record eligible for observation.
///
/// Field storage preserves insertion order. Reading a key that was never
/// written yields [`Value::Null`].
pub struct PlainObject {
    id: ObjectId,
    fields: RwLock<IndexMap<String, Value>>,
}

impl PlainObject {
    /// Create a new record from an iterator of fields.
    pub fn new<I>(fields: I) -> ObjectData
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        Arc::new(Self {
            id: ObjectId::new(),
            fields: RwLock::new(fields.into_iter().collect()),
        })
    }

    /// Get the record's unique ID.
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Number of fields currently stored.
    pub fn len(&self) -> usize {
        self.fields.read().expect("fields lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read one field; absent keys read as `Null`.
    pub(crate) fn field(&self, key: &str) -> Value {
        self.fields
            .read()
            .expect("fields lock poisoned")
            .get(key)
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Write one field, inserting or replacing.
    pub(crate) fn put(&self, key: &str, value: Value) {
        self.fields
            .write()
            .expect("fields lock poisoned")
            .insert(key.to_owned(), value);
    }

    /// Copy of the current field table.
    fn snapshot(&self) -> IndexMap<String, Value> {
        self.fields.read().expect("fields lock poisoned").clone()
    }
}

impl Debug for PlainObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlainObject")
            .field("id", &self.id)
            .field("len", &self.len())
            .finish()
    }
}

/// A dynamic value observed by the engine.
///
/// Scalars compare structurally; objects compare by identity.
#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Object(ObjectData),
}

impl Value {
    /// Build an object value from key/value pairs.
    pub fn object<K, I>(fields: I) -> Value
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Object(PlainObject::new(
            fields.into_iter().map(|(key, value)| (key.into(), value)),
        ))
    }

    /// Human-readable kind name, used in error reporting.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Object(_) => "object",
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectData> {
        match self {
            Value::Object(data) => Some(data),
            _ => None,
        }
    }

    /// Untracked deep snapshot as JSON.
    ///
    /// Non-finite floats serialize as `null`. Cyclic object graphs are not
    /// supported.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(value) => (*value).into(),
            Value::Int(value) => (*value).into(),
            Value::Float(value) => serde_json::Number::from_f64(*value)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Str(value) => value.clone().into(),
            Value::Object(data) => serde_json::Value::Object(
                data.snapshot()
                    .into_iter()
                    .map(|(key, value)| (key, value.to_json()))
                    .collect(),
            ),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            // Identity, not contents.
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<ObjectData> for Value {
    fn from(data: ObjectData) -> Self {
        Value::Object(data)
    }
}

impl TryFrom<serde_json::Value> for Value {
    type Error = Error;

    /// Ingest plain JSON data. Arrays are rejected: the engine tracks
    /// object properties, not collection elements.
    fn try_from(value: serde_json::Value) -> Result<Self, Error> {
        Ok(match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(value) => Value::Bool(value),
            serde_json::Value::Number(number) => {
                if let Some(value) = number.as_i64() {
                    Value::Int(value)
                } else if let Some(value) = number.as_f64() {
                    Value::Float(value)
                } else {
                    return Err(Error::UnsupportedJson("number out of range"));
                }
            }
            serde_json::Value::String(value) => Value::Str(value),
            serde_json::Value::Array(_) => return Err(Error::UnsupportedJson("array")),
            serde_json::Value::Object(map) => {
                let mut fields = Vec::with_capacity(map.len());
                for (key, value) in map {
                    fields.push((key, Value::try_from(value)?));
                }
                Value::Object(PlainObject::new(fields))
            }
        })
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}
