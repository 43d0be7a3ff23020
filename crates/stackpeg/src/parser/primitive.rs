//! Primitive recognizers.
//!
//! Each function here implements the `doparse` body of one primitive
//! combinator. Rollback on failure is owned by the invocation wrapper;
//! the only combinators that rewind manually are the lookaheads, which
//! must discard consumption even when they succeed.

use super::Parser;
use crate::state::ParseState;
use stackpeg_input::{Input, Tok};

pub(crate) fn literal(state: &mut ParseState, text: &str) -> bool {
    let pos = state.pos();
    let width = match state.input() {
        Input::Text { .. } => state.input().starts_with(pos, text).then_some(text.len()),
        Input::Tokens { .. } => (state.input().tok_text_at(pos) == Some(text)).then_some(1),
    };
    match width {
        Some(w) => {
            state.advance(w);
            true
        }
        None => false,
    }
}

pub(crate) fn token_kind(state: &mut ParseState, kind: u32) -> bool {
    if state.input().kind_at(state.pos()) == Some(kind) {
        state.advance(1);
        true
    } else {
        false
    }
}

pub(crate) fn any(state: &mut ParseState) -> bool {
    match state.input().element_width(state.pos()) {
        Some(w) => {
            state.advance(w);
            true
        }
        None => false,
    }
}

pub(crate) fn char_pred(state: &mut ParseState, pred: &dyn Fn(char) -> bool) -> bool {
    match state.input().char_at(state.pos()) {
        Some(c) if pred(c) => {
            state.advance(c.len_utf8());
            true
        }
        _ => false,
    }
}

pub(crate) fn tok_pred(state: &mut ParseState, pred: &dyn Fn(&Tok) -> bool) -> bool {
    let matched = state.input().tok_at(state.pos()).is_some_and(pred);
    if matched {
        state.advance(1);
    }
    matched
}

pub(crate) fn not(state: &mut ParseState, child: &Parser) -> bool {
    let cp = state.checkpoint();
    if child.parse(state) {
        state.restore(&cp);
        false
    } else {
        true
    }
}

pub(crate) fn ahead(state: &mut ParseState, child: &Parser) -> bool {
    let cp = state.checkpoint();
    if child.parse(state) {
        state.restore(&cp);
        true
    } else {
        false
    }
}

pub(crate) fn seq(state: &mut ParseState, children: &[Parser]) -> bool {
    children.iter().all(|child| child.parse(state))
}

pub(crate) fn choice(state: &mut ParseState, children: &[Parser]) -> bool {
    children.iter().any(|child| child.parse(state))
}

pub(crate) fn opt(state: &mut ParseState, child: &Parser) -> bool {
    let _ = child.parse(state);
    true
}

pub(crate) fn repeat(
    state: &mut ParseState,
    child: &Parser,
    min: usize,
    max: Option<usize>,
) -> bool {
    let mut count = 0usize;
    loop {
        if max.is_some_and(|m| count >= m) {
            break;
        }
        if !child.parse(state) {
            break;
        }
        count += 1;
    }
    count >= min
}
