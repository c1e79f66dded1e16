//! Dependency Index
//!
//! The index is the central coordinator between observed objects and the
//! effects that read them: a two-level map from object identity to property
//! key to the set of dependent effects.
//!
//! # How It Works
//!
//! 1. When an observed property is read while an effect is active,
//!    [`track`] inserts the effect into the entry for that (object, key)
//!    pair, creating the entry lazily on first read.
//!
//! 2. When an observed property is written, [`trigger`] looks up the entry
//!    and dispatches every effect in it.
//!
//! 3. Dispatch is two-phased: derived-value effects are invalidated first,
//!    then plain effects re-run. A plain effect that re-reads a derived
//!    value must observe the post-invalidation state, never a cached value
//!    that is already logically stale.
//!
//! # Re-entrancy
//!
//! Dispatched effects call `track` and `trigger` again, synchronously.
//! Every lookup therefore snapshots the dependent set and releases all map
//! guards before dispatching; no guard may be held across a dispatch.
//!
//! Entries hold effects strongly and are never removed automatically:
//! stale-entry pruning is out of scope, and a disposed effect is skipped at
//! dispatch time rather than evicted. Objects, by contrast, are referenced
//! only by id, so the index never keeps an observed object alive.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use dashmap::DashMap;
use smallvec::SmallVec;
use tracing::trace;

use super::context::TrackingContext;
use super::effect::Effect;
use super::value::ObjectId;

/// Dependent sets for one observed object, keyed by property name.
type KeyDeps = HashMap<String, HashSet<Effect>>;

static DEP_INDEX: OnceLock<DashMap<ObjectId, KeyDeps>> = OnceLock::new();

fn dep_index() -> &'static DashMap<ObjectId, KeyDeps> {
    DEP_INDEX.get_or_init(DashMap::new)
}

/// Record that the active effect depends on `(object, key)`.
///
/// Reads outside any effect context are not tracked; insertion is
/// idempotent.
pub fn track(object: ObjectId, key: &str) {
    let Some(active) = TrackingContext::active() else {
        return;
    };
    trace!(object = object.raw(), key, effect = active.id().raw(), "track");
    dep_index()
        .entry(object)
        .or_default()
        .entry(key.to_owned())
        .or_default()
        .insert(active);
}

/// Dispatch every effect depending on `(object, key)`.
///
/// An absent entry is a no-op.
pub fn trigger(object: ObjectId, key: &str) {
    let dependents: SmallVec<[Effect; 4]> = match dep_index().get(&object) {
        Some(keys) => keys
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default(),
        None => return,
    };
    if dependents.is_empty() {
        return;
    }
    trace!(
        object = object.raw(),
        key,
        dependents = dependents.len(),
        "trigger"
    );
    dispatch(dependents);
}

/// Dispatch a set of awakened dependents under the engine's ordering
/// policy: all derived-value effects first, then all plain effects.
pub(crate) fn dispatch<I>(dependents: I)
where
    I: IntoIterator<Item = Effect>,
{
    let (derived, plain): (SmallVec<[Effect; 4]>, SmallVec<[Effect; 4]>) =
        dependents.into_iter().partition(Effect::is_derived);
    for effect in derived {
        effect.dispatch();
    }
    for effect in plain {
        effect.dispatch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::effect::{EffectKind, InvalidationTarget};
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::{Arc, Mutex, Weak};

    #[test]
    fn reads_outside_an_effect_are_not_tracked() {
        let object = ObjectId::new();

        // No effect has run on this thread; nothing to attribute the read to.
        track(object, "width");

        let runs = Arc::new(AtomicI32::new(0));
        let runs_in_body = runs.clone();
        let _bystander = Effect::new_lazy(move || {
            runs_in_body.fetch_add(1, Ordering::SeqCst);
        });

        trigger(object, "width");
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn tracked_effect_reruns_once_per_trigger() {
        let object = ObjectId::new();
        let runs = Arc::new(AtomicI32::new(0));
        let runs_in_body = runs.clone();

        let _effect = Effect::new(move || {
            runs_in_body.fetch_add(1, Ordering::SeqCst);
            track(object, "size");
        });
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        trigger(object, "size");
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        trigger(object, "size");
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn unrelated_keys_and_objects_do_not_dispatch() {
        let object = ObjectId::new();
        let other = ObjectId::new();
        let runs = Arc::new(AtomicI32::new(0));
        let runs_in_body = runs.clone();

        let _effect = Effect::new(move || {
            runs_in_body.fetch_add(1, Ordering::SeqCst);
            track(object, "size");
        });

        trigger(object, "color");
        trigger(other, "size");
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn repeated_tracking_is_idempotent() {
        let object = ObjectId::new();
        let runs = Arc::new(AtomicI32::new(0));
        let runs_in_body = runs.clone();

        let _effect = Effect::new(move || {
            runs_in_body.fetch_add(1, Ordering::SeqCst);
            // The same read site, three times over.
            track(object, "size");
            track(object, "size");
            track(object, "size");
        });

        trigger(object, "size");
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    struct RecordingTarget {
        order: Arc<Mutex<Vec<&'static str>>>,
    }

    impl InvalidationTarget for RecordingTarget {
        fn invalidate(&self) {
            self.order.lock().unwrap().push("derived");
        }
    }

    #[test]
    fn derived_effects_dispatch_before_plain_effects() {
        let order = Arc::new(Mutex::new(Vec::new()));

        let target = Arc::new(RecordingTarget {
            order: order.clone(),
        });
        let target_dyn: Arc<dyn InvalidationTarget> = target.clone();
        let weak: Weak<dyn InvalidationTarget> = Arc::downgrade(&target_dyn);
        let derived = Effect::with_kind(Box::new(|| {}), EffectKind::Derived(weak));

        let order_in_body = order.clone();
        let plain = Effect::new_lazy(move || {
            order_in_body.lock().unwrap().push("plain");
        });

        // Plain listed first: ordering comes from the partition, not from
        // the input order.
        dispatch([plain, derived]);

        assert_eq!(*order.lock().unwrap(), ["derived", "plain"]);
    }
}
