//! The authoritative context for one parse run.
//!
//! A [`ParseState`] aggregates the input position, the value stack, the
//! side-effect log, furthest-error tracking, the optional live call stack,
//! and the run options. Combinators read and write it under a strict
//! transactional contract: success leaves effects in place, failure rewinds
//! position, stack size, and log length to the values observed at entry.

mod call_stack;
mod log;
mod stack;

pub use call_stack::CallFrame;
pub use log::{SideEffect, SideEffectLog};
pub use stack::{Val, ValueStack};

use crate::error::ActionError;
use crate::metrics::MetricsTable;
use crate::options::ParseOptions;
use crate::parser::Parser;
use stackpeg_input::Input;
use std::sync::Arc;

/// A snapshot of the rewindable parts of the state.
///
/// Taken by the invocation wrapper on entry; restoring it rewinds the
/// position, truncates the value stack, and truncates (undoing) the
/// side-effect log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    pos: usize,
    stack_len: usize,
    log_len: usize,
    ws_span: Option<(usize, usize)>,
}

impl Checkpoint {
    /// Input position at the checkpoint.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Value-stack size at the checkpoint.
    pub fn stack_len(&self) -> usize {
        self.stack_len
    }

    /// Side-effect log length at the checkpoint.
    pub fn log_len(&self) -> usize {
        self.log_len
    }
}

/// The state of one parse run. Created per driver invocation, owned
/// exclusively by it, and discarded once the result is built.
pub struct ParseState {
    input: Input,
    pos: usize,
    stack: ValueStack,
    log: SideEffectLog,
    error_pos: Option<usize>,
    error_call_stack: Option<Vec<CallFrame>>,
    call_stack: Vec<CallFrame>,
    thrown: Option<ActionError>,
    options: ParseOptions,
    whitespace: Parser,
    ws_span: Option<(usize, usize)>,
    metrics: Option<MetricsTable>,
}

impl ParseState {
    /// Create a fresh state over `input` with `options`.
    pub fn new(input: Input, options: ParseOptions) -> Self {
        let whitespace =
            options.whitespace.clone().unwrap_or_else(Parser::default_whitespace);
        let metrics = options.trace.then(MetricsTable::default);
        Self {
            input,
            pos: 0,
            stack: ValueStack::new(),
            log: SideEffectLog::new(),
            error_pos: None,
            error_call_stack: None,
            call_stack: Vec::new(),
            thrown: None,
            options,
            whitespace,
            ws_span: None,
            metrics,
        }
    }

    /// The input being parsed.
    pub fn input(&self) -> &Input {
        &self.input
    }

    /// Current input position.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// The value stack.
    pub fn stack(&self) -> &ValueStack {
        &self.stack
    }

    /// The side-effect log.
    pub fn log(&self) -> &SideEffectLog {
        &self.log
    }

    /// Furthest position at which any parser has failed so far, if any.
    pub fn error_pos(&self) -> Option<usize> {
        self.error_pos
    }

    /// Call-stack snapshot taken when the furthest error position last
    /// advanced. Populated only with `record_call_stack` on.
    pub fn error_call_stack(&self) -> Option<&[CallFrame]> {
        self.error_call_stack.as_deref()
    }

    /// The live call stack. Maintained only with `record_call_stack` on.
    pub fn call_stack(&self) -> &[CallFrame] {
        &self.call_stack
    }

    /// The fatal condition raised by a user action, if any.
    pub fn thrown(&self) -> Option<&ActionError> {
        self.thrown.as_ref()
    }

    /// The options this run was started with.
    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Snapshot the rewindable parts of the state.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            pos: self.pos,
            stack_len: self.stack.len(),
            log_len: self.log.len(),
            ws_span: self.ws_span,
        }
    }

    pub(crate) fn restore(&mut self, cp: &Checkpoint) {
        self.pos = cp.pos;
        self.stack.truncate(cp.stack_len);
        self.log.truncate(cp.log_len);
        self.ws_span = cp.ws_span;
    }

    pub(crate) fn advance(&mut self, n: usize) {
        self.pos += n;
    }

    pub(crate) fn stack_mut(&mut self) -> &mut ValueStack {
        &mut self.stack
    }

    pub(crate) fn log_mut(&mut self) -> &mut SideEffectLog {
        &mut self.log
    }

    pub(crate) fn set_thrown(&mut self, error: ActionError) {
        if self.thrown.is_none() {
            self.thrown = Some(error);
        }
    }

    pub(crate) fn take_thrown(&mut self) -> Option<ActionError> {
        self.thrown.take()
    }

    /// Record that a parser failed at the current position, advancing the
    /// furthest-error bookkeeping when this failure is the deepest yet.
    pub(crate) fn note_failure(&mut self) {
        let advanced = match self.error_pos {
            None => true,
            Some(furthest) => self.pos > furthest,
        };
        if advanced {
            self.error_pos = Some(self.pos);
            if self.options.record_call_stack {
                self.error_call_stack = Some(self.call_stack.clone());
            }
        }
    }

    pub(crate) fn recording_call_stack(&self) -> bool {
        self.options.record_call_stack
    }

    pub(crate) fn tracing_metrics(&self) -> bool {
        self.metrics.is_some()
    }

    pub(crate) fn push_frame(&mut self, name: Arc<str>, pos: usize) {
        self.call_stack.push(CallFrame { name, pos });
    }

    pub(crate) fn pop_frame(&mut self) {
        self.call_stack.pop();
    }

    pub(crate) fn metrics_enter(&mut self, name: Arc<str>) {
        if let Some(table) = self.metrics.as_mut() {
            table.enter(name);
        }
    }

    pub(crate) fn metrics_exit(&mut self, success: bool) {
        if let Some(table) = self.metrics.as_mut() {
            table.exit(success);
        }
    }

    pub(crate) fn flush_metrics(&self) {
        if let (Some(table), Some(sink)) = (&self.metrics, &self.options.metrics) {
            table.flush(sink.as_ref());
        }
    }

    /// Run the configured whitespace parser at the current position,
    /// recording the consumed span when `track_whitespace` is on.
    pub(crate) fn consume_whitespace(&mut self) {
        let ws = self.whitespace.clone();
        let start = self.pos;
        let _ = ws.parse(self);
        if self.options.track_whitespace && self.pos > start {
            self.ws_span = Some((start, self.pos));
        }
    }

    /// The end of the region `[start, end)` with any recorded trailing
    /// whitespace run removed. Identity unless `track_whitespace` is on.
    pub(crate) fn trimmed_end(&self, start: usize, end: usize) -> usize {
        if !self.options.track_whitespace {
            return end;
        }
        match self.ws_span {
            Some((ws_start, ws_end)) if ws_end == end && ws_start >= start => ws_start,
            _ => end,
        }
    }
}

impl std::fmt::Debug for ParseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParseState")
            .field("pos", &self.pos)
            .field("stack_len", &self.stack.len())
            .field("log_len", &self.log.len())
            .field("error_pos", &self.error_pos)
            .field("thrown", &self.thrown)
            .finish_non_exhaustive()
    }
}
