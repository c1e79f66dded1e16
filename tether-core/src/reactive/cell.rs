//! Reference Cell
//!
//! [`Ref`] is a single-value observable box, used for scalars and for
//! objects that do not need per-key tracking. Unlike the observable
//! wrapper, a cell keeps its dependents in a private set instead of the
//! global dependency index; the dispatch policy is shared.
//!
//! Deep cells hand object payloads to the observable wrapper on
//! construction and on every write; shallow cells store payloads untouched.

use std::collections::HashSet;
use std::fmt::{self, Debug};
use std::sync::{Arc, RwLock};

use smallvec::SmallVec;

use super::context::TrackingContext;
use super::dep::dispatch;
use super::effect::Effect;
use super::observe::Reactive;
use super::value::Value;

struct CellInner {
    value: RwLock<Value>,
    shallow: bool,
    dependents: RwLock<HashSet<Effect>>,
}

/// A single-value observable box.
///
/// Clones share the same cell; equality compares cell identity.
pub struct Ref {
    inner: Arc<CellInner>,
}

/// Conversion into a reference cell.
///
/// Passing an existing [`Ref`] returns it unchanged, so construction is
/// idempotent under accidental re-wrapping.
pub trait IntoRef {
    fn into_ref(self, shallow: bool) -> Ref;
}

impl IntoRef for Ref {
    fn into_ref(self, _shallow: bool) -> Ref {
        self
    }
}

impl IntoRef for Value {
    fn into_ref(self, shallow: bool) -> Ref {
        Ref::from_value(self, shallow)
    }
}

impl IntoRef for bool {
    fn into_ref(self, shallow: bool) -> Ref {
        Ref::from_value(Value::from(self), shallow)
    }
}

impl IntoRef for i64 {
    fn into_ref(self, shallow: bool) -> Ref {
        Ref::from_value(Value::from(self), shallow)
    }
}

impl IntoRef for f64 {
    fn into_ref(self, shallow: bool) -> Ref {
        Ref::from_value(Value::from(self), shallow)
    }
}

impl IntoRef for &str {
    fn into_ref(self, shallow: bool) -> Ref {
        Ref::from_value(Value::from(self), shallow)
    }
}

impl IntoRef for String {
    fn into_ref(self, shallow: bool) -> Ref {
        Ref::from_value(Value::from(self), shallow)
    }
}

/// Deep cells make object payloads observable so reads through them keep
/// tracking.
fn observe_payload(value: Value) -> Value {
    if let Value::Object(data) = &value {
        let _ = Reactive::wrap(data.clone());
    }
    value
}

impl Ref {
    /// Wrap a value in a deep cell: object payloads become observable.
    pub fn new(value: impl IntoRef) -> Ref {
        value.into_ref(false)
    }

    /// Wrap a value in a shallow cell: object payloads are stored untouched.
    pub fn shallow(value: impl IntoRef) -> Ref {
        value.into_ref(true)
    }

    fn from_value(value: Value, shallow: bool) -> Ref {
        let value = if shallow { value } else { observe_payload(value) };
        Ref {
            inner: Arc::new(CellInner {
                value: RwLock::new(value),
                shallow,
                dependents: RwLock::new(HashSet::new()),
            }),
        }
    }

    /// Read the current value, recording the active effect (if any) as a
    /// dependent.
    pub fn get(&self) -> Value {
        if let Some(active) = TrackingContext::active() {
            self.inner
                .dependents
                .write()
                .expect("dependents lock poisoned")
                .insert(active);
        }
        self.inner.value.read().expect("value lock poisoned").clone()
    }

    /// Read the current value without registering a dependency.
    pub fn get_untracked(&self) -> Value {
        self.inner.value.read().expect("value lock poisoned").clone()
    }

    /// Store a new value, then dispatch every dependent.
    ///
    /// Storing a value equal to the current one still dispatches.
    pub fn set(&self, value: impl Into<Value>) {
        let next = if self.inner.shallow {
            value.into()
        } else {
            observe_payload(value.into())
        };
        *self.inner.value.write().expect("value lock poisoned") = next;

        let dependents: SmallVec<[Effect; 4]> = self
            .inner
            .dependents
            .read()
            .expect("dependents lock poisoned")
            .iter()
            .cloned()
            .collect();
        dispatch(dependents);
    }

    pub fn is_shallow(&self) -> bool {
        self.inner.shallow
    }

    /// Number of effects currently subscribed to this cell.
    pub fn dependent_count(&self) -> usize {
        self.inner
            .dependents
            .read()
            .expect("dependents lock poisoned")
            .len()
    }
}

impl Clone for Ref {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl PartialEq for Ref {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Ref {}

impl Debug for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ref")
            .field("value", &self.get_untracked())
            .field("shallow", &self.inner.shallow)
            .field("dependent_count", &self.dependent_count())
            .finish()
    }
}
