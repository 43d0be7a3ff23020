//! Left- and right-associative expression combinators.
//!
//! These replace general left-recursion handling: the grammar author names
//! the operand and operator parsers, and the combinator owns the climb.
//! After each operator match the registered fold runs as a stack action
//! over everything pushed since the expression began, and its single
//! result becomes the operand for the next step. The combinator's own
//! recursive edge is exempt from left-recursion diagnostics because the
//! recursion is protected by the operand parse that precedes it.

use super::action::ActionScope;
use super::{Parser, ParserKind, ParserNode};
use crate::error::ActionError;
use crate::state::{ParseState, Val};
use std::cell::OnceCell;
use std::rc::{Rc, Weak};

pub(crate) type FoldFn = Box<dyn Fn(&mut ActionScope<'_>) -> Result<Val, ActionError>>;

pub(crate) enum StepKind {
    /// A binary operator followed by a right-hand operand.
    Infix { op: Parser },
    /// A postfix operator with no operand after it.
    Suffix { parser: Parser },
}

pub(crate) struct ExprStep {
    pub(crate) kind: StepKind,
    pub(crate) fold: FoldFn,
}

pub(crate) struct ExprData {
    pub(crate) left: Parser,
    pub(crate) right: Parser,
    pub(crate) steps: Vec<ExprStep>,
}

/// The edge a right-associative combinator follows after an operator.
enum RecurseEdge {
    /// The node recurses into itself; weak to avoid an ownership cycle.
    Slf(Weak<ParserNode>),
    /// An operator-required wrapper recurses into its bare inner node.
    Inner(Parser),
}

pub(crate) struct ExprNode {
    pub(crate) data: Rc<ExprData>,
    pub(crate) operator_required: bool,
    recurse: OnceCell<RecurseEdge>,
}

impl ExprNode {
    pub(crate) fn children(&self) -> Vec<Parser> {
        let mut children = vec![self.data.left.clone(), self.data.right.clone()];
        for step in &self.data.steps {
            children.push(match &step.kind {
                StepKind::Infix { op } => op.clone(),
                StepKind::Suffix { parser } => parser.clone(),
            });
        }
        children
    }

    fn recurse_target(&self) -> Option<Parser> {
        match self.recurse.get()? {
            RecurseEdge::Slf(weak) => weak.upgrade().map(|node| Parser { node }),
            RecurseEdge::Inner(parser) => Some(parser.clone()),
        }
    }
}

/// Builder for [`Parser`] expression combinators.
///
/// Steps are tried in registration order on every climb iteration; the
/// first matching one wins.
pub struct ExprBuilder {
    left: Parser,
    right: Option<Parser>,
    steps: Vec<ExprStep>,
    operator_required: bool,
}

impl ExprBuilder {
    /// Start from the leftmost operand parser.
    pub fn new(left: Parser) -> Self {
        Self { left, right: None, steps: Vec::new(), operator_required: false }
    }

    /// Use a distinct right-operand parser (defaults to the left one).
    pub fn right(mut self, right: Parser) -> Self {
        self.right = Some(right);
        self
    }

    /// Register an infix operator and the fold that combines the frame
    /// into the new operand value.
    pub fn infix(
        mut self,
        op: Parser,
        fold: impl Fn(&mut ActionScope<'_>) -> Result<Val, ActionError> + 'static,
    ) -> Self {
        self.steps.push(ExprStep { kind: StepKind::Infix { op }, fold: Box::new(fold) });
        self
    }

    /// Register a suffix operator and its fold.
    pub fn suffix(
        mut self,
        parser: Parser,
        fold: impl Fn(&mut ActionScope<'_>) -> Result<Val, ActionError> + 'static,
    ) -> Self {
        self.steps.push(ExprStep { kind: StepKind::Suffix { parser }, fold: Box::new(fold) });
        self
    }

    /// Require at least one operator; a bare operand no longer matches.
    pub fn operator_required(mut self, on: bool) -> Self {
        self.operator_required = on;
        self
    }

    fn data(self) -> (Rc<ExprData>, bool) {
        let operator_required = self.operator_required;
        let right = self.right.unwrap_or_else(|| self.left.clone());
        (Rc::new(ExprData { left: self.left, right, steps: self.steps }), operator_required)
    }

    /// Build a left-associative expression parser.
    pub fn build_left(self) -> Parser {
        let (data, operator_required) = self.data();
        Parser::from_kind(ParserKind::LeftExpr(ExprNode {
            data,
            operator_required,
            recurse: OnceCell::new(),
        }))
    }

    /// Build a right-associative expression parser.
    pub fn build_right(self) -> Parser {
        let (data, operator_required) = self.data();
        let inner = Parser::from_kind(ParserKind::RightExpr(ExprNode {
            data: Rc::clone(&data),
            operator_required: false,
            recurse: OnceCell::new(),
        }));
        set_recurse(&inner, RecurseEdge::Slf(Rc::downgrade(&inner.node)));
        if !operator_required {
            return inner;
        }
        let outer = Parser::from_kind(ParserKind::RightExpr(ExprNode {
            data,
            operator_required: true,
            recurse: OnceCell::new(),
        }));
        set_recurse(&outer, RecurseEdge::Inner(inner));
        outer
    }
}

fn set_recurse(parser: &Parser, edge: RecurseEdge) {
    if let ParserKind::RightExpr(node) = &parser.node.kind {
        let _ = node.recurse.set(edge);
    }
}

pub(crate) fn parse_left(state: &mut ParseState, node: &ExprNode) -> bool {
    let pos0 = state.pos();
    let size0 = state.stack().len();
    if !node.data.left.parse(state) {
        return false;
    }
    let mut iterations = 0usize;
    'grow: loop {
        for step in &node.data.steps {
            let cp = state.checkpoint();
            let matched = match &step.kind {
                StepKind::Infix { op } => op.parse(state) && node.data.right.parse(state),
                StepKind::Suffix { parser } => parser.parse(state),
            };
            if state.thrown().is_some() {
                return false;
            }
            if matched {
                if !fold(state, &step.fold, pos0, size0) {
                    return false;
                }
                iterations += 1;
                continue 'grow;
            }
            state.restore(&cp);
        }
        break;
    }
    !(node.operator_required && iterations == 0)
}

pub(crate) fn parse_right(state: &mut ParseState, node: &ExprNode) -> bool {
    let pos0 = state.pos();
    let size0 = state.stack().len();
    if !node.data.left.parse(state) {
        return false;
    }
    let mut iterations = 0usize;
    'grow: loop {
        for step in &node.data.steps {
            let cp = state.checkpoint();
            let matched = match &step.kind {
                StepKind::Infix { op } => {
                    // Recurse into a full right-hand expression at the same
                    // precedence; the fold then runs innermost-first as the
                    // recursion unwinds, which yields right associativity.
                    op.parse(state)
                        && match node.recurse_target() {
                            Some(inner) => inner.parse(state),
                            None => false,
                        }
                }
                StepKind::Suffix { parser } => parser.parse(state),
            };
            if state.thrown().is_some() {
                return false;
            }
            if matched {
                if !fold(state, &step.fold, pos0, size0) {
                    return false;
                }
                iterations += 1;
                continue 'grow;
            }
            state.restore(&cp);
        }
        break;
    }
    !(node.operator_required && iterations == 0)
}

fn fold(state: &mut ParseState, fold: &FoldFn, pos0: usize, size0: usize) -> bool {
    let frame = state.stack_mut().pop_from(size0);
    let end_pos = state.pos();
    let mut scope = ActionScope::new(state, frame, pos0, end_pos, size0);
    let outcome = fold(&mut scope);
    match outcome {
        Ok(value) => {
            scope.push(value);
            true
        }
        Err(error) => {
            state.set_thrown(error);
            false
        }
    }
}
