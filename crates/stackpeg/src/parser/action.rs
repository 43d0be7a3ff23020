//! Stack actions: user code run after a child parser succeeds.
//!
//! An action consumes the frame its child pushed (a contiguous tail of the
//! value stack, optionally extended downward by a lookback) and may push
//! values and append side effects through its [`ActionScope`]. The scope
//! exposes no parsing operations, so action bodies cannot invoke further
//! parsing; a failing action becomes a fatal condition that terminates the
//! whole parse.

use super::Parser;
use crate::error::ActionError;
use crate::state::{ParseState, SideEffect, Val};

pub(crate) type ActionFn = Box<dyn Fn(&mut ActionScope<'_>) -> Result<(), ActionError>>;

pub(crate) struct ActionNode {
    pub(crate) child: Parser,
    pub(crate) lookback: usize,
    pub(crate) op_name: &'static str,
    pub(crate) run: ActionFn,
}

pub(crate) fn make(
    child: Parser,
    lookback: usize,
    op_name: &'static str,
    run: impl Fn(&mut ActionScope<'_>) -> Result<(), ActionError> + 'static,
) -> Parser {
    Parser::from_kind(super::ParserKind::Action(ActionNode {
        child,
        lookback,
        op_name,
        run: Box::new(run),
    }))
}

/// What a stack action sees and may do.
pub struct ActionScope<'a> {
    state: &'a mut ParseState,
    frame: Vec<Val>,
    start_pos: usize,
    end_pos: usize,
    start_stack_len: usize,
}

impl<'a> ActionScope<'a> {
    pub(crate) fn new(
        state: &'a mut ParseState,
        frame: Vec<Val>,
        start_pos: usize,
        end_pos: usize,
        start_stack_len: usize,
    ) -> Self {
        Self { state, frame, start_pos, end_pos, start_stack_len }
    }

    /// The frame: values the child pushed (plus any lookback entries),
    /// bottom-to-top.
    pub fn frame(&self) -> &[Val] {
        &self.frame
    }

    /// Take ownership of the frame, leaving it empty.
    pub fn take_frame(&mut self) -> Vec<Val> {
        std::mem::take(&mut self.frame)
    }

    /// Input position before the child ran.
    pub fn start_pos(&self) -> usize {
        self.start_pos
    }

    /// Input position after the child's match.
    pub fn end_pos(&self) -> usize {
        self.end_pos
    }

    /// Value-stack size before the child ran.
    pub fn start_stack_len(&self) -> usize {
        self.start_stack_len
    }

    /// How much input the child consumed.
    pub fn consumed(&self) -> usize {
        self.end_pos - self.start_pos
    }

    /// The matched input substring, when the input can reconstruct text.
    /// Excludes a trailing whitespace run when `track_whitespace` is on.
    pub fn matched(&self) -> Option<&str> {
        let end = self.state.trimmed_end(self.start_pos, self.end_pos);
        self.state.input().text_span(self.start_pos, end)
    }

    /// Push a semantic value.
    pub fn push(&mut self, v: Val) {
        self.state.stack_mut().push(v);
    }

    /// Apply a reversible mutation and append it to the side-effect log.
    pub fn effect(&mut self, effect: SideEffect) {
        self.state.log_mut().apply(effect);
    }

    /// Look up an opaque user value from the run options.
    pub fn custom(&self, key: &str) -> Option<&Val> {
        self.state.options().custom(key)
    }

    /// Build a fatal condition anchored at this action's match.
    pub fn fatal(&self, message: impl Into<std::sync::Arc<str>>) -> ActionError {
        ActionError::new(message, self.start_pos)
    }
}

pub(crate) fn run(state: &mut ParseState, node: &ActionNode) -> bool {
    let start_pos = state.pos();
    let start_stack_len = state.stack().len();
    if !node.child.parse(state) {
        return false;
    }
    let Some(frame_base) = start_stack_len.checked_sub(node.lookback) else {
        state.set_thrown(ActionError::new(
            format!("lookback {} exceeds stack depth {start_stack_len}", node.lookback),
            start_pos,
        ));
        return false;
    };
    let frame = state.stack_mut().pop_from(frame_base);
    let end_pos = state.pos();
    let mut scope = ActionScope::new(state, frame, start_pos, end_pos, start_stack_len);
    let outcome = (node.run)(&mut scope);
    match outcome {
        Ok(()) => true,
        Err(error) => {
            state.set_thrown(error);
            false
        }
    }
}
