//! Reactive Primitives
//!
//! This module implements the core reactive system: observable objects,
//! reference cells, effects, and derived values. Together they form a
//! dependency-tracking kernel: reads performed inside an effect implicitly
//! declare its dependencies, and writes to observed data implicitly
//! re-dispatch the dependents. No caller ever names a subscription.
//!
//! # Concepts
//!
//! ## Observable objects
//!
//! [`Reactive`] wraps a plain keyed record ([`Value::Object`]) so that
//! property reads attribute themselves to the running effect and property
//! writes wake everything that depends on that property. Wrapping is
//! memoized by object identity, and nested objects become observable
//! lazily, when they are first read.
//!
//! ## Reference cells
//!
//! [`Ref`] is a single-value observable box with its own private dependent
//! set, for scalars and whole-value replacement.
//!
//! ## Effects
//!
//! An [`Effect`] is a unit of work that re-runs when any data it previously
//! read changes. [`Effect::new`] runs the body once on construction so the
//! initial reads establish dependencies.
//!
//! ## Derived values
//!
//! A [`Computed`] caches a pure derivation. When an input changes, the
//! cache is invalidated through a scheduler indirection rather than
//! recomputed eagerly; the next read recomputes. Invalidation wakes the
//! derived value's own dependents exactly once per fresh-to-stale
//! transition.
//!
//! # Implementation Notes
//!
//! The tracking context is a single thread-local slot holding the currently
//! running effect: one active effect at a time, no stack, no restoration
//! after a nested run. Dependents are dispatched derived-values-first so a
//! re-running plain effect never reads a logically stale cache. Both points
//! are load-bearing; see [`context`](self::TrackingContext) and
//! [`dep`](self::trigger) for the details.

mod cell;
mod computed;
mod context;
mod dep;
mod effect;
mod observe;
mod value;

pub use cell::{IntoRef, Ref};
pub use computed::{Computed, Staleness};
pub use context::TrackingContext;
pub use dep::{track, trigger};
pub use effect::{Effect, EffectId};
pub use observe::Reactive;
pub use value::{ObjectData, ObjectId, PlainObject, Value};
