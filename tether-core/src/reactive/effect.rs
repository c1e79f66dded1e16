//! Effect Implementation
//!
//! An Effect is a runnable unit of work whose reads declare its
//! dependencies. Running an effect installs it as the tracking context, so
//! every observable read during the run registers the effect as a
//! dependent; a later write to any of that data dispatches the effect
//! again.
//!
//! # Dispatch
//!
//! An effect carries one of two dispatch strategies:
//!
//! - Plain effects re-run their body when a dependency changes.
//! - Derived-value effects back a [`Computed`]; instead of re-running the
//!   derivation eagerly, dispatch invalidates the cached value. The
//!   indirection is what keeps a derived value and an effect that reads it
//!   from re-triggering each other without bound.
//!
//! [`Computed`]: super::computed::Computed

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use super::context::TrackingContext;

/// Unique identifier for an effect.
///
/// Dependent sets are keyed by this ID, which gives them set semantics:
/// re-reading the same data from the same effect is idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EffectId(u64);

impl EffectId {
    /// Generate a new unique effect ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for EffectId {
    fn default() -> Self {
        Self::new()
    }
}

/// A derived value reachable from dispatch.
///
/// Implementors flip their staleness flag (and wake their own dependents)
/// instead of having the effect body re-run.
pub(crate) trait InvalidationTarget: Send + Sync {
    fn invalidate(&self);
}

/// Dispatch strategy for an effect.
pub(crate) enum EffectKind {
    /// Re-run the body when a dependency changes.
    Plain,
    /// Invalidate the backing derived value instead of re-running the body.
    /// Held weakly: the derived value owns its effect, not the other way
    /// around.
    Derived(Weak<dyn InvalidationTarget>),
}

struct EffectInner {
    id: EffectId,
    body: Box<dyn Fn() + Send + Sync>,
    kind: EffectKind,
    disposed: AtomicBool,
}

/// A registered computation that re-runs when data it previously read
/// changes.
///
/// `Effect` is a cheap cloneable handle; clones share identity and state.
#[derive(Clone)]
pub struct Effect {
    inner: Arc<EffectInner>,
}

impl Effect {
    /// Create a plain effect and immediately run it once, so that its
    /// initial reads register dependencies.
    pub fn new<F>(body: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let effect = Self::new_lazy(body);
        effect.run();
        effect
    }

    /// Create a plain effect without running it. Until the first `run`, the
    /// effect has no dependencies and no write can reach it.
    pub fn new_lazy<F>(body: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::with_kind(Box::new(body), EffectKind::Plain)
    }

    pub(crate) fn with_kind(body: Box<dyn Fn() + Send + Sync>, kind: EffectKind) -> Self {
        Self {
            inner: Arc::new(EffectInner {
                id: EffectId::new(),
                body,
                kind,
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// Get the effect's unique ID.
    pub fn id(&self) -> EffectId {
        self.inner.id
    }

    /// Whether this effect backs a derived value.
    pub fn is_derived(&self) -> bool {
        matches!(self.inner.kind, EffectKind::Derived(_))
    }

    /// Install this effect as the tracking context and execute the body.
    ///
    /// The context slot is left pointing at this effect afterwards; see the
    /// module docs of [`super::context`] for the nesting limitation.
    pub fn run(&self) {
        if self.is_disposed() {
            return;
        }
        TrackingContext::set_active(self.clone());
        (self.inner.body)();
    }

    /// Dispatch according to kind: plain effects re-run their body, derived
    /// effects invalidate the value they back.
    pub(crate) fn dispatch(&self) {
        if self.is_disposed() {
            return;
        }
        match &self.inner.kind {
            EffectKind::Plain => self.run(),
            EffectKind::Derived(target) => {
                if let Some(target) = target.upgrade() {
                    target.invalidate();
                }
            }
        }
    }

    /// Permanently stop this effect. Dependency-index entries referencing it
    /// are not removed (pruning is out of scope); dispatch skips it instead.
    pub fn dispose(&self) {
        self.inner.disposed.store(true, Ordering::SeqCst);
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }
}

impl PartialEq for Effect {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Effect {}

impl Hash for Effect {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.inner.id)
            .field("derived", &self.is_derived())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
