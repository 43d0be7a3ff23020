//! Combinator graph nodes and the invocation protocol.
//!
//! A [`Parser`] is a cheap handle onto an immutable graph node. Nodes are
//! constructed once during grammar definition and reused across parses;
//! cycles go through explicit [`Parser::lazy`] indirection. One tagged
//! variant exists per combinator, and a single invocation wrapper
//! ([`Parser::parse`]) enforces the transactional contract for all of
//! them: snapshot on entry, full rewind of position, value stack, and
//! side-effect log on failure, furthest-error bookkeeping on the way out.

mod action;
mod expression;
mod primitive;
mod structural;

pub use action::ActionScope;
pub use expression::ExprBuilder;
pub use structural::TrailingSep;

pub(crate) use action::ActionNode;
pub(crate) use expression::{ExprNode, StepKind};
pub(crate) use structural::TokenChoiceNode;

use crate::error::ActionError;
use crate::state::{ParseState, Val};
use rustc_hash::FxHashSet;
use stackpeg_input::Tok;
use std::cell::OnceCell;
use std::rc::Rc;
use std::sync::Arc;

/// A handle onto one immutable combinator node.
///
/// Cloning is cheap and shares the node. The graph a `Parser` roots may
/// contain cycles through [`Parser::lazy`] slots.
#[derive(Clone)]
pub struct Parser {
    node: Rc<ParserNode>,
}

pub(crate) struct ParserNode {
    label: OnceCell<Arc<str>>,
    display: OnceCell<Arc<str>>,
    pub(crate) kind: ParserKind,
}

pub(crate) enum ParserKind {
    Empty,
    Fail,
    Literal { text: Arc<str> },
    TokKind { kind: u32 },
    Any,
    CharPred { pred: Rc<dyn Fn(char) -> bool> },
    TokPred { pred: Rc<dyn Fn(&Tok) -> bool> },
    CharRange { lo: char, hi: char },
    CharSet { set: Arc<str> },
    Not { child: Parser },
    Ahead { child: Parser },
    Seq { children: Vec<Parser> },
    Choice { children: Vec<Parser> },
    Opt { child: Parser },
    Repeat { child: Parser, min: usize, max: Option<usize> },
    Lazy { slot: OnceCell<Parser> },
    SepBy { item: Parser, sep: Parser, min: usize, trailing: TrailingSep },
    Word { child: Parser },
    Token { child: Parser },
    TokenChoice(TokenChoiceNode),
    Action(ActionNode),
    LeftExpr(ExprNode),
    RightExpr(ExprNode),
}

impl Parser {
    pub(crate) fn from_kind(kind: ParserKind) -> Self {
        Self { node: Rc::new(ParserNode { label: OnceCell::new(), display: OnceCell::new(), kind }) }
    }

    // ----- primitive constructors -----

    /// Always succeeds, consumes nothing.
    pub fn empty() -> Self {
        Self::from_kind(ParserKind::Empty)
    }

    /// Always fails.
    pub fn fail() -> Self {
        Self::from_kind(ParserKind::Fail)
    }

    /// Match a fixed string (text input) or a single token with exactly
    /// that text (token input).
    pub fn literal(text: impl Into<Arc<str>>) -> Self {
        Self::from_kind(ParserKind::Literal { text: text.into() })
    }

    /// Match one token of the given kind (token input only).
    pub fn token_kind(kind: u32) -> Self {
        Self::from_kind(ParserKind::TokKind { kind })
    }

    /// Match exactly one element; fails at end of input.
    pub fn any() -> Self {
        Self::from_kind(ParserKind::Any)
    }

    /// Match one character satisfying `pred` (text input only).
    pub fn char_pred(pred: impl Fn(char) -> bool + 'static) -> Self {
        Self::from_kind(ParserKind::CharPred { pred: Rc::new(pred) })
    }

    /// Match one token satisfying `pred` (token input only).
    pub fn tok_pred(pred: impl Fn(&Tok) -> bool + 'static) -> Self {
        Self::from_kind(ParserKind::TokPred { pred: Rc::new(pred) })
    }

    /// Match one character in the inclusive range `lo..=hi`.
    pub fn char_range(lo: char, hi: char) -> Self {
        Self::from_kind(ParserKind::CharRange { lo, hi })
    }

    /// Match one character contained in `set`.
    pub fn char_set(set: impl Into<Arc<str>>) -> Self {
        Self::from_kind(ParserKind::CharSet { set: set.into() })
    }

    /// Succeed iff `child` fails; never advances nor touches stack/log.
    pub fn not(child: Parser) -> Self {
        Self::from_kind(ParserKind::Not { child })
    }

    /// Positive lookahead: succeed iff `child` succeeds, restoring
    /// position, stack, and log either way.
    pub fn ahead(child: Parser) -> Self {
        Self::from_kind(ParserKind::Ahead { child })
    }

    /// Run children in order; fail if any fails.
    pub fn seq(children: impl IntoIterator<Item = Parser>) -> Self {
        Self::from_kind(ParserKind::Seq { children: children.into_iter().collect() })
    }

    /// Ordered choice: try children in order, first success wins.
    pub fn choice(children: impl IntoIterator<Item = Parser>) -> Self {
        Self::from_kind(ParserKind::Choice { children: children.into_iter().collect() })
    }

    /// Run `child`; succeed regardless, rewinding on its failure.
    pub fn opt(child: Parser) -> Self {
        Self::from_kind(ParserKind::Opt { child })
    }

    /// Greedy repetition: run `child` until it fails or `max` iterations,
    /// succeeding iff at least `min` iterations succeeded.
    pub fn repeat(child: Parser, min: usize, max: Option<usize>) -> Self {
        Self::from_kind(ParserKind::Repeat { child, min, max })
    }

    /// An unresolved forward slot, to be filled with [`Parser::resolve`].
    /// This is the indirection that lets grammars contain cycles.
    pub fn lazy() -> Self {
        Self::from_kind(ParserKind::Lazy { slot: OnceCell::new() })
    }

    /// Resolve a [`Parser::lazy`] slot to its target.
    ///
    /// Returns `false` when the receiver is not a lazy slot or was already
    /// resolved; the first resolution wins.
    pub fn resolve(&self, target: Parser) -> bool {
        match &self.node.kind {
            ParserKind::Lazy { slot } => slot.set(target).is_ok(),
            _ => false,
        }
    }

    // ----- structural constructors -----

    /// `item (sep item)*` with at least `min` items; `trailing` controls
    /// whether one terminal `sep` may follow the last item.
    pub fn sep_by(item: Parser, sep: Parser, min: usize, trailing: TrailingSep) -> Self {
        Self::from_kind(ParserKind::SepBy { item, sep, min, trailing })
    }

    /// Run `child`, then consume trailing whitespace with the configured
    /// whitespace parser.
    pub fn word(child: Parser) -> Self {
        Self::from_kind(ParserKind::Word { child })
    }

    /// Like [`Parser::word`], and additionally marks a token boundary
    /// consulted by the token-choice fast path and the analysis.
    pub fn token(child: Parser) -> Self {
        Self::from_kind(ParserKind::Token { child })
    }

    /// Ordered choice over whole tokens with a first-character dispatch
    /// fast path on text inputs.
    pub fn token_choice(alternatives: impl IntoIterator<Item = Parser>) -> Self {
        Self::from_kind(ParserKind::TokenChoice(TokenChoiceNode::build(
            alternatives.into_iter().collect(),
        )))
    }

    // ----- stack-action constructors -----

    /// After `child` succeeds, run `f` on its frame and push the value it
    /// produces.
    pub fn push(
        child: Parser,
        f: impl Fn(&mut ActionScope<'_>) -> Result<Val, ActionError> + 'static,
    ) -> Self {
        action::make(child, 0, "push", move |scope| {
            let v = f(scope)?;
            scope.push(v);
            Ok(())
        })
    }

    /// After `child` succeeds, run `f` on its frame; `f` may push any
    /// number of values and append side effects.
    pub fn collect(
        child: Parser,
        f: impl Fn(&mut ActionScope<'_>) -> Result<(), ActionError> + 'static,
    ) -> Self {
        action::make(child, 0, "collect", f)
    }

    /// Like [`Parser::collect`], with the frame extended downward by `k`
    /// entries already on the stack below the child's pushes.
    pub fn lookback(
        k: usize,
        child: Parser,
        f: impl Fn(&mut ActionScope<'_>) -> Result<(), ActionError> + 'static,
    ) -> Self {
        action::make(child, k, "lookback", f)
    }

    /// After `child` succeeds, discard its frame and push the constant `v`.
    pub fn as_val(child: Parser, v: Val) -> Self {
        action::make(child, 0, "as_val", move |scope| {
            scope.push(v.clone());
            Ok(())
        })
    }

    /// After `child` succeeds, collect its frame into a `Vec<Val>` and push
    /// the list as a single value.
    pub fn as_list(child: Parser) -> Self {
        action::make(child, 0, "as_list", |scope| {
            let frame = scope.take_frame();
            scope.push(Val::new(frame));
            Ok(())
        })
    }

    /// After `child` succeeds, push `true` iff it consumed input.
    pub fn as_bool(child: Parser) -> Self {
        action::make(child, 0, "as_bool", |scope| {
            let consumed = scope.consumed() > 0;
            scope.push(Val::new(consumed));
            Ok(())
        })
    }

    /// After `child` succeeds, push the matched substring as an
    /// `Arc<str>` value. Pushes the empty string when the input cannot
    /// reconstruct text (token input without an attached source).
    pub fn as_matched(child: Parser) -> Self {
        action::make(child, 0, "as_matched", |scope| {
            let text: Arc<str> = Arc::from(scope.matched().unwrap_or(""));
            scope.push(Val::new(text));
            Ok(())
        })
    }

    /// The built-in whitespace parser: `[ \t\r\n]*`.
    pub(crate) fn default_whitespace() -> Self {
        Self::repeat(Self::char_set(" \t\r\n"), 0, None)
    }

    // ----- labels and traversal -----

    /// Assign a grammar-rule label. The first assignment wins; later calls
    /// are ignored, keeping the node immutable once observed.
    pub fn named(self, label: impl Into<Arc<str>>) -> Self {
        let _ = self.node.label.set(label.into());
        self
    }

    /// The rule label, if one was assigned.
    pub fn rule_name(&self) -> Option<&str> {
        self.node.label.get().map(|l| l.as_ref())
    }

    /// The rule label, or the combinator's variant name.
    pub fn display_name(&self) -> String {
        self.node.display_arc().to_string()
    }

    pub(crate) fn display_arc(&self) -> &Arc<str> {
        self.node.display_arc()
    }

    /// Stable identity of the underlying node.
    pub(crate) fn id(&self) -> usize {
        Rc::as_ptr(&self.node) as usize
    }

    pub(crate) fn kind(&self) -> &ParserKind {
        &self.node.kind
    }

    /// This node's direct children, in consultation order.
    ///
    /// Lazy slots contribute their resolved target (nothing while
    /// unresolved); expression combinators contribute their operand and
    /// operator parsers but not their own recursive edge.
    pub fn children(&self) -> Vec<Parser> {
        match &self.node.kind {
            ParserKind::Empty
            | ParserKind::Fail
            | ParserKind::Literal { .. }
            | ParserKind::TokKind { .. }
            | ParserKind::Any
            | ParserKind::CharPred { .. }
            | ParserKind::TokPred { .. }
            | ParserKind::CharRange { .. }
            | ParserKind::CharSet { .. } => Vec::new(),
            ParserKind::Not { child }
            | ParserKind::Ahead { child }
            | ParserKind::Opt { child }
            | ParserKind::Repeat { child, .. }
            | ParserKind::Word { child }
            | ParserKind::Token { child } => vec![child.clone()],
            ParserKind::Seq { children } | ParserKind::Choice { children } => children.clone(),
            ParserKind::Lazy { slot } => slot.get().cloned().into_iter().collect(),
            ParserKind::SepBy { item, sep, .. } => vec![item.clone(), sep.clone()],
            ParserKind::TokenChoice(node) => node.alternatives.clone(),
            ParserKind::Action(node) => vec![node.child.clone()],
            ParserKind::LeftExpr(node) | ParserKind::RightExpr(node) => node.children(),
        }
    }

    /// Visit every node reachable from this one exactly once, parents
    /// before children.
    pub fn accept(&self, visitor: &mut dyn ParserVisitor) {
        let mut seen: FxHashSet<usize> = FxHashSet::default();
        let mut pending = vec![self.clone()];
        while let Some(parser) = pending.pop() {
            if !seen.insert(parser.id()) {
                continue;
            }
            visitor.visit(&parser);
            let mut children = parser.children();
            children.reverse();
            pending.extend(children);
        }
    }

    // ----- invocation -----

    /// Invoke this parser against `state`.
    ///
    /// On success the position sits at the end of the consumed region and
    /// any stack pushes and log appends stay in place. On failure the
    /// position, stack size, and log length are restored to the values
    /// observed at entry, and the furthest-error bookkeeping is updated.
    /// Once a fatal condition is thrown, every invocation returns `false`
    /// without further work.
    pub fn parse(&self, state: &mut ParseState) -> bool {
        if state.thrown().is_some() {
            return false;
        }
        let recording = state.recording_call_stack();
        let tracing_on = state.tracing_metrics();
        if recording || tracing_on {
            let name = self.node.display_arc().clone();
            if recording {
                state.push_frame(name.clone(), state.pos());
            }
            if tracing_on {
                state.metrics_enter(name);
            }
        }
        let cp = state.checkpoint();
        let mut ok = self.doparse(state);
        if state.thrown().is_some() {
            ok = false;
        }
        if !ok {
            if state.thrown().is_none() {
                state.note_failure();
            }
            state.restore(&cp);
        }
        if tracing_on {
            state.metrics_exit(ok);
        }
        if recording {
            state.pop_frame();
        }
        ok
    }

    fn doparse(&self, state: &mut ParseState) -> bool {
        match &self.node.kind {
            ParserKind::Empty => true,
            ParserKind::Fail => false,
            ParserKind::Literal { text } => primitive::literal(state, text),
            ParserKind::TokKind { kind } => primitive::token_kind(state, *kind),
            ParserKind::Any => primitive::any(state),
            ParserKind::CharPred { pred } => primitive::char_pred(state, pred.as_ref()),
            ParserKind::TokPred { pred } => primitive::tok_pred(state, pred.as_ref()),
            ParserKind::CharRange { lo, hi } => {
                primitive::char_pred(state, &|c| (*lo..=*hi).contains(&c))
            }
            ParserKind::CharSet { set } => primitive::char_pred(state, &|c| set.contains(c)),
            ParserKind::Not { child } => primitive::not(state, child),
            ParserKind::Ahead { child } => primitive::ahead(state, child),
            ParserKind::Seq { children } => primitive::seq(state, children),
            ParserKind::Choice { children } => primitive::choice(state, children),
            ParserKind::Opt { child } => primitive::opt(state, child),
            ParserKind::Repeat { child, min, max } => primitive::repeat(state, child, *min, *max),
            ParserKind::Lazy { slot } => match slot.get() {
                Some(target) => target.parse(state),
                None => false,
            },
            ParserKind::SepBy { item, sep, min, trailing } => {
                structural::sep_by(state, item, sep, *min, *trailing)
            }
            ParserKind::Word { child } | ParserKind::Token { child } => {
                structural::word(state, child)
            }
            ParserKind::TokenChoice(node) => structural::token_choice(state, node),
            ParserKind::Action(node) => action::run(state, node),
            ParserKind::LeftExpr(node) => expression::parse_left(state, node),
            ParserKind::RightExpr(node) => expression::parse_right(state, node),
        }
    }
}

impl ParserNode {
    fn display_arc(&self) -> &Arc<str> {
        self.display.get_or_init(|| match self.label.get() {
            Some(label) => label.clone(),
            None => Arc::from(self.kind.variant_name()),
        })
    }
}

impl ParserKind {
    fn variant_name(&self) -> &'static str {
        match self {
            ParserKind::Empty => "empty",
            ParserKind::Fail => "fail",
            ParserKind::Literal { .. } => "literal",
            ParserKind::TokKind { .. } => "token_kind",
            ParserKind::Any => "any",
            ParserKind::CharPred { .. } => "char_pred",
            ParserKind::TokPred { .. } => "tok_pred",
            ParserKind::CharRange { .. } => "char_range",
            ParserKind::CharSet { .. } => "char_set",
            ParserKind::Not { .. } => "not",
            ParserKind::Ahead { .. } => "ahead",
            ParserKind::Seq { .. } => "seq",
            ParserKind::Choice { .. } => "choice",
            ParserKind::Opt { .. } => "opt",
            ParserKind::Repeat { .. } => "repeat",
            ParserKind::Lazy { .. } => "lazy",
            ParserKind::SepBy { .. } => "sep_by",
            ParserKind::Word { .. } => "word",
            ParserKind::Token { .. } => "token",
            ParserKind::TokenChoice(_) => "token_choice",
            ParserKind::Action(node) => node.op_name,
            ParserKind::LeftExpr(_) => "left_expr",
            ParserKind::RightExpr(_) => "right_expr",
        }
    }
}

impl std::fmt::Debug for Parser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parser({})", self.node.display_arc())
    }
}

/// Pre-order visitor over a combinator graph.
pub trait ParserVisitor {
    /// Called once per reachable node.
    fn visit(&mut self, parser: &Parser);
}
