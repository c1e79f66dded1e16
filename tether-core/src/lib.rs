//! Tether Core
//!
//! This crate provides the dependency-tracking kernel for the Tether
//! reactive state engine. It implements:
//!
//! - An observable wrapper over plain keyed records, with identity-memoized
//!   wrapping and lazy deep reactivity
//! - Reference cells for single observable values
//! - Effects with automatic dependency capture
//! - Cached derived values invalidated through a scheduler indirection
//!
//! Execution is single-threaded, cooperative, and synchronous: tracking,
//! triggering, and derived-value reads all run to completion before
//! returning, including any re-entrant cascade caused by a write.
//!
//! # Architecture
//!
//! The crate is organized into two modules:
//!
//! - `reactive`: the reactive primitives and the dependency index
//! - `error`: the (deliberately narrow) error surface
//!
//! # Example
//!
//! ```rust,ignore
//! use tether_core::reactive::{Computed, Effect, Ref};
//!
//! // A source value.
//! let count = Ref::new(1i64);
//!
//! // A cached derivation over it.
//! let count_for_derive = count.clone();
//! let doubled = Computed::new(move || {
//!     count_for_derive.get().as_int().unwrap_or(0) * 2
//! });
//!
//! // An effect that reads the derivation; it runs once immediately.
//! let doubled_for_effect = doubled.clone();
//! Effect::new(move || {
//!     println!("doubled is {}", doubled_for_effect.get());
//! });
//!
//! // Writing the source invalidates the derivation and re-runs the effect.
//! count.set(5i64);
//! ```

pub mod error;
pub mod reactive;

pub use error::Error;
