//! Tracking Context
//!
//! The tracking context records which effect is currently running. This
//! enables automatic dependency capture: when observed data is read, the
//! reader registers the current effect as a dependent without the caller
//! ever naming a subscription.
//!
//! # Implementation
//!
//! The context is a single slot, not a stack. [`Effect::run`] overwrites the
//! slot with the effect about to execute and leaves it there afterwards;
//! there is no pop-back to a previous effect. Entering a nested run (for
//! example, a stale derived value recomputing in the middle of a plain
//! effect's body) silently redirects which effect subsequent reads attribute
//! to. This is a known limitation of the engine, preserved deliberately:
//! nesting effects inside effects is unsupported, not silently handled.
//!
//! The slot is thread-local. The engine is single-threaded and cooperative,
//! so a thread-local cell keeps the common case free of synchronization
//! while still behaving as "process-wide" state for the one logical thread
//! of control.
//!
//! [`Effect::run`]: super::effect::Effect::run

use std::cell::RefCell;

use super::effect::Effect;

thread_local! {
    static ACTIVE_EFFECT: RefCell<Option<Effect>> = const { RefCell::new(None) };
}

/// The single-slot "currently running effect" state.
pub struct TrackingContext;

impl TrackingContext {
    /// Install an effect as the active one. Any previously active effect is
    /// overwritten and never restored.
    pub(crate) fn set_active(effect: Effect) {
        ACTIVE_EFFECT.with(|slot| *slot.borrow_mut() = Some(effect));
    }

    /// Get the currently active effect, if any.
    pub fn active() -> Option<Effect> {
        ACTIVE_EFFECT.with(|slot| slot.borrow().clone())
    }

    /// Check whether reads are currently being attributed to an effect.
    pub fn is_tracking() -> bool {
        ACTIVE_EFFECT.with(|slot| slot.borrow().is_some())
    }
}
