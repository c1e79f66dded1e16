//! Observable Wrapper
//!
//! [`Reactive`] is the observable view over a [`PlainObject`]. Reads
//! attribute themselves to the active effect through the dependency index;
//! writes look up and dispatch the dependents. Tracking is keyed on the
//! underlying object's identity, never on the wrapper, so every view of an
//! object converges on one coherent set of index entries.
//!
//! # Memoization
//!
//! Wrapping is memoized by object identity: repeated wrap calls for the
//! same object return the same wrapper instance. The cache holds weak
//! references, so it never extends an object's lifetime; a dead entry is
//! replaced the next time the object is wrapped.
//!
//! # Deep reactivity
//!
//! Nested objects become observable lazily, when they are read, not when
//! their parent is wrapped. Reading a field whose value is an object
//! materializes (or revives) that object's wrapper before the value is
//! returned.

use std::fmt::{self, Debug};
use std::sync::{Arc, OnceLock, Weak};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::Error;

use super::dep::{track, trigger};
use super::value::{ObjectData, ObjectId, Value};

struct ReactiveInner {
    target: ObjectData,
}

static WRAP_CACHE: OnceLock<DashMap<ObjectId, Weak<ReactiveInner>>> = OnceLock::new();

fn wrap_cache() -> &'static DashMap<ObjectId, Weak<ReactiveInner>> {
    WRAP_CACHE.get_or_init(DashMap::new)
}

/// Observable view over a plain object.
///
/// Cloning a `Reactive` yields another handle to the same wrapper; equality
/// compares wrapper identity.
pub struct Reactive {
    inner: Arc<ReactiveInner>,
}

impl Reactive {
    /// Wrap an object value. Any other value kind is rejected.
    pub fn new(value: &Value) -> Result<Self, Error> {
        match value {
            Value::Object(data) => Ok(Self::wrap(data.clone())),
            other => Err(Error::NotObservable { kind: other.kind() }),
        }
    }

    /// Wrap raw object data, memoized by object identity.
    pub(crate) fn wrap(target: ObjectData) -> Self {
        match wrap_cache().entry(target.id()) {
            Entry::Occupied(mut entry) => {
                if let Some(inner) = entry.get().upgrade() {
                    return Self { inner };
                }
                // The previous wrapper was dropped; replace the dead entry.
                let inner = Arc::new(ReactiveInner { target });
                entry.insert(Arc::downgrade(&inner));
                Self { inner }
            }
            Entry::Vacant(entry) => {
                let inner = Arc::new(ReactiveInner { target });
                entry.insert(Arc::downgrade(&inner));
                Self { inner }
            }
        }
    }

    /// Identity of the underlying object.
    pub fn id(&self) -> ObjectId {
        self.inner.target.id()
    }

    /// Shared handle to the underlying object data.
    pub fn target(&self) -> &ObjectData {
        &self.inner.target
    }

    /// Read a property.
    ///
    /// If the value is itself an object it is made observable on the spot,
    /// then the read is recorded against the underlying object's identity.
    /// Absent keys read (and track) as [`Value::Null`].
    pub fn get(&self, key: &str) -> Value {
        let value = self.inner.target.field(key);
        if let Value::Object(data) = &value {
            let _ = Self::wrap(data.clone());
        }
        track(self.id(), key);
        value
    }

    /// Read a property without registering a dependency.
    pub fn get_untracked(&self, key: &str) -> Value {
        self.inner.target.field(key)
    }

    /// Write a property, then dispatch its dependents.
    ///
    /// Writing a value equal to the current one still triggers; there is no
    /// equality short-circuit.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        self.inner.target.put(key, value.into());
        trigger(self.id(), key);
    }
}

impl Clone for Reactive {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl PartialEq for Reactive {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Reactive {}

impl Debug for Reactive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reactive")
            .field("id", &self.id())
            .field("len", &self.inner.target.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::effect::Effect;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[test]
    fn wrapping_is_idempotent_by_identity() {
        let value = Value::object([("count", Value::Int(0))]);
        let first = Reactive::new(&value).expect("objects are observable");
        let second = Reactive::new(&value).expect("objects are observable");

        assert_eq!(first, second);
        assert_eq!(first.id(), second.id());
    }

    #[test]
    fn distinct_objects_get_distinct_wrappers() {
        let a = Reactive::new(&Value::object([("x", Value::Int(1))])).unwrap();
        let b = Reactive::new(&Value::object([("x", Value::Int(1))])).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn non_objects_are_rejected() {
        let result = Reactive::new(&Value::Int(3));
        assert!(matches!(
            result,
            Err(Error::NotObservable { kind: "int" })
        ));
    }

    #[test]
    fn reads_and_writes_go_through_the_underlying_object() {
        let state = Reactive::new(&Value::object([("title", Value::from("draft"))])).unwrap();

        assert_eq!(state.get_untracked("title"), Value::from("draft"));
        assert_eq!(state.get_untracked("missing"), Value::Null);

        state.set("title", "final");
        assert_eq!(state.get_untracked("title"), Value::from("final"));
    }

    #[test]
    fn effect_reruns_on_write_to_read_key() {
        let state = Reactive::new(&Value::object([("count", Value::Int(0))])).unwrap();
        let runs = Arc::new(AtomicI32::new(0));

        let state_in_body = state.clone();
        let runs_in_body = runs.clone();
        let _effect = Effect::new(move || {
            runs_in_body.fetch_add(1, Ordering::SeqCst);
            let _ = state_in_body.get("count");
        });
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        state.set("count", 1i64);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn writes_to_unread_keys_do_not_rerun() {
        let state = Reactive::new(&Value::object([("count", Value::Int(0))])).unwrap();
        let runs = Arc::new(AtomicI32::new(0));

        let state_in_body = state.clone();
        let runs_in_body = runs.clone();
        let _effect = Effect::new(move || {
            runs_in_body.fetch_add(1, Ordering::SeqCst);
            let _ = state_in_body.get("count");
        });

        state.set("label", "other");
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn equal_value_writes_still_trigger() {
        let state = Reactive::new(&Value::object([("count", Value::Int(7))])).unwrap();
        let runs = Arc::new(AtomicI32::new(0));

        let state_in_body = state.clone();
        let runs_in_body = runs.clone();
        let _effect = Effect::new(move || {
            runs_in_body.fetch_add(1, Ordering::SeqCst);
            let _ = state_in_body.get("count");
        });

        state.set("count", 7i64);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn untracked_reads_do_not_subscribe() {
        let state = Reactive::new(&Value::object([("count", Value::Int(0))])).unwrap();
        let runs = Arc::new(AtomicI32::new(0));

        let state_in_body = state.clone();
        let runs_in_body = runs.clone();
        let _effect = Effect::new(move || {
            runs_in_body.fetch_add(1, Ordering::SeqCst);
            let _ = state_in_body.get_untracked("count");
        });

        state.set("count", 1i64);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn nested_objects_share_one_wrapper() {
        let root = Reactive::new(&Value::object([(
            "inner",
            Value::object([("depth", Value::Int(1))]),
        )]))
        .unwrap();

        let via_read = Reactive::new(&root.get_untracked("inner")).unwrap();
        let via_second_read = Reactive::new(&root.get_untracked("inner")).unwrap();
        assert_eq!(via_read, via_second_read);
    }
}
