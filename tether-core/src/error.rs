//! Error types for the reactive kernel.
//!
//! The error surface is deliberately narrow: invalid input is rejected at
//! the wrapper boundary, and everything past that boundary either succeeds
//! or propagates a failure synchronously to the caller. There are no
//! retries.

use thiserror::Error;

/// Errors produced by the reactive kernel.
#[derive(Debug, Error)]
pub enum Error {
    /// A wrapper was requested for a value kind that cannot be observed.
    /// Only object values carry per-key dependency tracking.
    #[error("cannot observe a {kind} value; only objects are observable")]
    NotObservable {
        /// The kind of the rejected value, as reported by `Value::kind`.
        kind: &'static str,
    },

    /// JSON input used a shape the value model does not carry
    /// (arrays, or numbers outside the i64/f64 range).
    #[error("unsupported JSON input: {0}")]
    UnsupportedJson(&'static str),
}
