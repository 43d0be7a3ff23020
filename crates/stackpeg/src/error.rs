//! Error types for the engine.
//!
//! Three disjoint outcome kinds exist: ordinary match failure (not an error
//! type at all; combinators return `false` and the state rewinds),
//! ill-formed grammars ([`GrammarError`], reported before any parsing),
//! and fatal conditions raised by user actions ([`ActionError`], which
//! terminate the parse).

use crate::state::Val;
use std::sync::Arc;
use thiserror::Error;

/// An unrecoverable condition raised by a semantic action.
///
/// Stored in the parse state's `thrown` slot; every combinator wrapper
/// short-circuits once it is set. The optional payload carries the user's
/// original error object through to the parse report.
#[derive(Debug, Clone, Error)]
#[error("fatal abort at position {pos}: {message}")]
pub struct ActionError {
    /// Human-readable description, also the identity used when comparing
    /// fatals across determinism re-runs.
    pub message: Arc<str>,
    /// Input position of the action's match when the abort was raised.
    pub pos: usize,
    /// The user's original error object, when one was attached.
    pub payload: Option<Val>,
}

impl ActionError {
    /// Create a fatal condition.
    pub fn new(message: impl Into<Arc<str>>, pos: usize) -> Self {
        Self { message: message.into(), pos, payload: None }
    }

    /// Attach the user's original error object.
    pub fn with_payload(mut self, payload: Val) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// A well-formedness diagnostic produced by the pre-parse analysis.
///
/// Any diagnostic prevents the parse from starting.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GrammarError {
    /// A cycle in which a parser is its own leftmost requirement, with no
    /// expression combinator protecting the recursion.
    #[error("unprotected left recursion through {}", cycle.join(" -> "))]
    LeftRecursion {
        /// Display names of the rules on the cycle, in traversal order.
        cycle: Vec<String>,
    },
    /// An unbounded repetition whose operand can succeed without consuming
    /// input, which would loop forever.
    #[error("repetition '{rule}' iterates a nullable parser")]
    NullableRepetition {
        /// Display name of the repetition.
        rule: String,
    },
    /// A forward-declared parser slot that was never resolved.
    #[error("unresolved lazy parser '{rule}'")]
    UnresolvedLazy {
        /// Display name of the slot.
        rule: String,
    },
}

/// Divergence between the two runs of a determinism re-parse.
///
/// Any variant indicates a state-handling bug in a user action: the second
/// run observed state the first run leaked.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeterminismError {
    /// One run succeeded and the other failed.
    #[error("success diverged between runs: {first} vs {second}")]
    Success {
        /// Outcome of the first run.
        first: bool,
        /// Outcome of the second run.
        second: bool,
    },
    /// The runs consumed different amounts of input.
    #[error("match size diverged between runs: {first} vs {second}")]
    MatchSize {
        /// Consumed length in the first run.
        first: usize,
        /// Consumed length in the second run.
        second: usize,
    },
    /// The runs tracked different furthest-error positions.
    #[error("furthest error position diverged between runs: {first} vs {second}")]
    ErrorPos {
        /// Furthest error position in the first run.
        first: usize,
        /// Furthest error position in the second run.
        second: usize,
    },
    /// The runs raised different fatal conditions (compared by message).
    #[error("fatal condition diverged between runs: {first:?} vs {second:?}")]
    Thrown {
        /// Fatal message of the first run, if any.
        first: Option<String>,
        /// Fatal message of the second run, if any.
        second: Option<String>,
    },
}
