//! Derived Values
//!
//! A [`Computed`] caches the result of a pure derivation and recomputes it
//! lazily. The cache is valid exactly while the staleness flag is clear;
//! reading while stale recomputes synchronously before returning.
//!
//! # Invalidation
//!
//! The derivation runs inside an internally owned effect, but that effect
//! is never re-run directly when a dependency changes. Its dispatch arm
//! instead marks the derived value stale and wakes the value's own
//! dependents. Two details carry the correctness argument:
//!
//! - The fresh-to-stale transition fires dependents exactly once. Firing
//!   again while already stale would be the mechanism for unbounded
//!   re-triggering between a derived value and an effect that reads it, so
//!   the guard is a correctness requirement, not an optimization.
//!
//! - The dependent set may transiently contain the derivation's own
//!   internal effect. The derived-before-plain dispatch ordering (see
//!   [`super::dep`]) guarantees that by the time a plain effect re-runs and
//!   re-reads this value, the staleness flag is already set and the read is
//!   consistent.
//!
//! Invalidation propagates on every fresh-to-stale transition, whether or
//! not a recomputation would produce an equal value; there is no diffing.

use std::collections::HashSet;
use std::fmt::{self, Debug};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, Weak};

use smallvec::SmallVec;
use tracing::trace;

use super::context::TrackingContext;
use super::dep::dispatch;
use super::effect::{Effect, EffectKind, InvalidationTarget};

/// Cache state of a derived value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staleness {
    /// The cache must be recomputed before the next read.
    Stale,
    /// The cache is valid.
    Fresh,
}

struct ComputedCore<T> {
    derive: Box<dyn Fn() -> T + Send + Sync>,
    value: RwLock<Option<T>>,
    stale: AtomicBool,
    dependents: RwLock<HashSet<Effect>>,
}

impl<T> InvalidationTarget for ComputedCore<T>
where
    T: Send + Sync,
{
    /// The derivation's scheduler: mark stale and wake dependents.
    fn invalidate(&self) {
        if self.stale.swap(true, Ordering::SeqCst) {
            // Already stale; dependents were woken when the transition
            // happened. Firing them again here is the re-trigger hazard.
            return;
        }
        trace!("derived value invalidated");
        let dependents: SmallVec<[Effect; 4]> = self
            .dependents
            .read()
            .expect("dependents lock poisoned")
            .iter()
            .cloned()
            .collect();
        dispatch(dependents);
    }
}

/// A lazily recomputed, cached derivation.
///
/// Clones share the same cache and dependent set.
pub struct Computed<T> {
    core: Arc<ComputedCore<T>>,
    effect: Effect,
}

impl<T> Computed<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a derived value. The derivation does not run until the first
    /// read.
    pub fn new<F>(derive: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let core = Arc::new(ComputedCore {
            derive: Box::new(derive),
            value: RwLock::new(None),
            stale: AtomicBool::new(true),
            dependents: RwLock::new(HashSet::new()),
        });

        // The internal effect recomputes the cache when run; dispatch goes
        // through the Derived arm and invalidates instead.
        let runner = Arc::downgrade(&core);
        let body = move || {
            if let Some(core) = runner.upgrade() {
                let next = (core.derive)();
                *core.value.write().expect("value lock poisoned") = Some(next);
            }
        };
        let core_dyn: Arc<dyn InvalidationTarget> = core.clone();
        let target: Weak<dyn InvalidationTarget> = Arc::downgrade(&core_dyn);
        let effect = Effect::with_kind(Box::new(body), EffectKind::Derived(target));

        Self { core, effect }
    }

    /// Read the derived value, recomputing if stale.
    ///
    /// The active effect (if any) is recorded as a dependent of this value
    /// first, so the read is tracked even when the cache is fresh.
    pub fn get(&self) -> T {
        if let Some(active) = TrackingContext::active() {
            self.core
                .dependents
                .write()
                .expect("dependents lock poisoned")
                .insert(active);
        }
        if self.core.stale.swap(false, Ordering::SeqCst) {
            // Clear the flag before the run, then recompute under tracking.
            trace!("derived value recomputing");
            self.effect.run();
        }
        self.core
            .value
            .read()
            .expect("value lock poisoned")
            .clone()
            .expect("fresh derived value must have a cached result")
    }
}

impl<T> Computed<T> {
    /// Current cache state.
    pub fn state(&self) -> Staleness {
        if self.is_stale() {
            Staleness::Stale
        } else {
            Staleness::Fresh
        }
    }

    /// Whether the next read will recompute.
    pub fn is_stale(&self) -> bool {
        self.core.stale.load(Ordering::SeqCst)
    }

    /// Number of effects currently subscribed to this value.
    pub fn dependent_count(&self) -> usize {
        self.core
            .dependents
            .read()
            .expect("dependents lock poisoned")
            .len()
    }
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
            effect: self.effect.clone(),
        }
    }
}

impl<T> Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("state", &self.state())
            .field("dependent_count", &self.dependent_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::cell::Ref;
    use std::sync::atomic::AtomicI32;

    #[test]
    fn derivation_runs_lazily_and_caches() {
        let calls = Arc::new(AtomicI32::new(0));
        let calls_in_body = calls.clone();

        let derived = Computed::new(move || {
            calls_in_body.fetch_add(1, Ordering::SeqCst);
            42
        });

        assert!(derived.is_stale());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert_eq!(derived.get(), 42);
        assert_eq!(derived.get(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(derived.state(), Staleness::Fresh);
    }

    #[test]
    fn writes_to_inputs_invalidate_and_rereads_recompute() {
        let input = Ref::new(10i64);
        let calls = Arc::new(AtomicI32::new(0));

        let input_in_body = input.clone();
        let calls_in_body = calls.clone();
        let derived = Computed::new(move || {
            calls_in_body.fetch_add(1, Ordering::SeqCst);
            input_in_body.get().as_int().unwrap_or(0) * 2
        });

        assert_eq!(derived.get(), 20);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        input.set(15i64);
        assert!(derived.is_stale());

        assert_eq!(derived.get(), 30);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn repeated_invalidation_fires_dependents_once() {
        let input = Ref::new(1i64);

        let input_in_body = input.clone();
        let derived = Computed::new(move || input_in_body.get().as_int().unwrap_or(0) + 1);

        let runs = Arc::new(AtomicI32::new(0));
        let first_run = Arc::new(AtomicBool::new(true));
        let derived_in_body = derived.clone();
        let runs_in_body = runs.clone();
        let first_run_in_body = first_run.clone();
        let _effect = Effect::new(move || {
            runs_in_body.fetch_add(1, Ordering::SeqCst);
            if first_run_in_body.swap(false, Ordering::SeqCst) {
                let _ = derived_in_body.get();
            }
        });
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        // Fresh -> stale: dependents fire once. The effect skips the read
        // this time, so the cache stays stale.
        input.set(2i64);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert!(derived.is_stale());

        // Already stale: the scheduler must not fire dependents again.
        input.set(3i64);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn reading_inside_an_effect_subscribes_it() {
        let derived = Computed::new(|| 7);
        assert_eq!(derived.dependent_count(), 0);

        let derived_in_body = derived.clone();
        let _effect = Effect::new(move || {
            let _ = derived_in_body.get();
        });

        assert_eq!(derived.dependent_count(), 1);
    }
}
