//! Core engine of a stack-based PEG combinator library.
//!
//! Grammars are immutable graphs of combinator nodes executed against an
//! explicit [`ParseState`]: an input position, a value stack of semantic
//! values, and an append-only log of reversible user-state mutations.
//! Every combinator honors one transactional contract: success leaves its
//! consumption, stack pushes, and log appends in place; failure rewinds
//! all three to the values observed at entry, so no partial effect is ever
//! visible to a later branch. Left recursion is handled by explicit
//! precedence-climbing expression combinators rather than packrat seeds,
//! and a pre-parse analysis rejects grammars the engine cannot run.

#![deny(unsafe_code)]
#![deny(unreachable_pub)]
#![warn(rust_2018_idioms)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(
    clippy::too_many_lines,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::return_self_not_must_use,
    clippy::uninlined_format_args
)]

pub mod analysis;
mod driver;
mod error;
mod metrics;
mod options;
mod parser;
mod state;

pub use stackpeg_input::{Input, Tok};

pub use driver::{ParseReport, parse, parse_twice, parse_with_options};
pub use error::{ActionError, DeterminismError, GrammarError};
pub use metrics::{MetricsSink, ParserMetrics};
pub use options::ParseOptions;
pub use parser::{ActionScope, ExprBuilder, Parser, ParserVisitor, TrailingSep};
pub use state::{CallFrame, Checkpoint, ParseState, SideEffect, SideEffectLog, Val, ValueStack};
