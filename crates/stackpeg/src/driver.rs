//! Top-level drive of a parser against an input.
//!
//! The driver owns the lifecycle: build a fresh [`ParseState`], optionally
//! run the well-formedness analysis, invoke the root parser, and assemble
//! a [`ParseReport`] from whatever the state holds afterwards. The parser
//! graph itself is never mutated. A determinism re-run variant drives the
//! same parse twice on fresh states and compares the observable outcome,
//! which flushes out user actions that leak state between runs.

use crate::analysis;
use crate::error::{ActionError, DeterminismError, GrammarError};
use crate::options::ParseOptions;
use crate::parser::Parser;
use crate::state::{CallFrame, ParseState, Val};
use stackpeg_input::Input;
use tracing::{debug, warn};

/// The outcome of one driver invocation.
#[derive(Debug)]
pub struct ParseReport {
    /// Whether the root parser matched.
    pub success: bool,
    /// Whether the match consumed the whole input. A prefix match keeps
    /// `success` true with `full_match` false.
    pub full_match: bool,
    /// Bytes (text input) or tokens (token input) consumed.
    pub match_size: usize,
    /// The value stack at the end of the run, bottom-to-top. On a full
    /// match this holds the final AST, usually as a single value.
    pub value_stack: Vec<Val>,
    /// Furthest position at which any parser failed during the run.
    pub error_pos: usize,
    /// Call-stack snapshot at the furthest failure; populated only with
    /// `record_call_stack` on.
    pub error_call_stack: Option<Vec<CallFrame>>,
    /// The fatal condition that terminated the run, if any.
    pub thrown: Option<ActionError>,
    /// Well-formedness diagnostics. Non-empty only when the analysis
    /// refused the grammar, in which case no parsing happened.
    pub grammar_errors: Vec<GrammarError>,
}

impl ParseReport {
    /// Whether the grammar was rejected before parsing.
    pub fn is_ill_formed(&self) -> bool {
        !self.grammar_errors.is_empty()
    }

    fn ill_formed(errors: Vec<GrammarError>) -> Self {
        Self {
            success: false,
            full_match: false,
            match_size: 0,
            value_stack: Vec::new(),
            error_pos: 0,
            error_call_stack: None,
            thrown: None,
            grammar_errors: errors,
        }
    }

    /// The fatal message, when one was thrown. Used for determinism
    /// comparison, where fatals are compared by message rather than by
    /// payload.
    fn thrown_message(&self) -> Option<String> {
        self.thrown.as_ref().map(|t| t.message.to_string())
    }
}

/// Run `root` against `input` with default options.
pub fn parse(root: &Parser, input: impl Into<Input>) -> ParseReport {
    parse_with_options(root, input, ParseOptions::default())
}

/// Run `root` against `input`.
pub fn parse_with_options(
    root: &Parser,
    input: impl Into<Input>,
    options: ParseOptions,
) -> ParseReport {
    let input = input.into();
    if options.well_formedness_check {
        let errors = analysis::check_grammar(root);
        if !errors.is_empty() {
            debug!("refusing ill-formed grammar with {} diagnostic(s)", errors.len());
            return ParseReport::ill_formed(errors);
        }
    }
    let input_len = input.len();
    let mut state = ParseState::new(input, options);
    let success = root.parse(&mut state);
    state.flush_metrics();
    let match_size = state.pos();
    debug!(
        "parse finished: success={success} consumed={match_size}/{input_len} error_pos={:?}",
        state.error_pos()
    );
    ParseReport {
        success,
        full_match: success && match_size == input_len,
        match_size,
        value_stack: state.stack().snapshot(),
        error_pos: state.error_pos().unwrap_or(0),
        error_call_stack: state.error_call_stack().map(<[CallFrame]>::to_vec),
        thrown: state.take_thrown(),
        grammar_errors: Vec::new(),
    }
}

/// Run the parse twice on fresh states and verify the runs agree.
///
/// Success, consumed length, furthest error position, and thrown kind must
/// be equal across runs; divergence indicates a state-handling bug in a
/// user action. A fatal in either run is captured per run and compared,
/// not propagated early. On agreement the second run's report is returned.
pub fn parse_twice(
    root: &Parser,
    input: impl Into<Input>,
    options: ParseOptions,
) -> Result<ParseReport, DeterminismError> {
    let input = input.into();
    let first = parse_with_options(root, input.clone(), options.clone());
    let second = parse_with_options(root, input, options);
    if first.success != second.success {
        warn!("determinism re-run diverged on success");
        return Err(DeterminismError::Success { first: first.success, second: second.success });
    }
    if first.match_size != second.match_size {
        warn!("determinism re-run diverged on match size");
        return Err(DeterminismError::MatchSize {
            first: first.match_size,
            second: second.match_size,
        });
    }
    if first.error_pos != second.error_pos {
        warn!("determinism re-run diverged on furthest error position");
        return Err(DeterminismError::ErrorPos {
            first: first.error_pos,
            second: second.error_pos,
        });
    }
    if first.thrown_message() != second.thrown_message() {
        warn!("determinism re-run diverged on thrown kind");
        return Err(DeterminismError::Thrown {
            first: first.thrown_message(),
            second: second.thrown_message(),
        });
    }
    Ok(second)
}
