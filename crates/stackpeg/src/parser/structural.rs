//! Structural combinators: separated repetition, word/token wrapping, and
//! the token-choice fast path.

use super::{Parser, ParserKind};
use crate::state::ParseState;
use rustc_hash::FxHashMap;
use stackpeg_input::Input;

/// Whether a separated repetition accepts one terminal separator after the
/// last item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrailingSep {
    /// A terminal separator may optionally be consumed.
    Allowed,
    /// The position after the last item must not sit at a separator; if it
    /// does, the whole repetition fails.
    Forbidden,
}

pub(crate) fn sep_by(
    state: &mut ParseState,
    item: &Parser,
    sep: &Parser,
    min: usize,
    trailing: TrailingSep,
) -> bool {
    let mut count = 0usize;
    if item.parse(state) {
        count = 1;
        loop {
            if !sep.parse(state) {
                break;
            }
            if item.parse(state) {
                count += 1;
                continue;
            }
            // A separator matched with no item after it.
            match trailing {
                TrailingSep::Allowed => break,
                TrailingSep::Forbidden => return false,
            }
        }
    }
    count >= min
}

pub(crate) fn word(state: &mut ParseState, child: &Parser) -> bool {
    if !child.parse(state) {
        return false;
    }
    state.consume_whitespace();
    true
}

/// Ordered choice over whole tokens with O(1) first-character dispatch on
/// text inputs.
pub(crate) struct TokenChoiceNode {
    pub(crate) alternatives: Vec<Parser>,
    /// Candidate indices per first character, merged with the fallback
    /// list and kept in registration order.
    dispatch: FxHashMap<char, Vec<usize>>,
    /// Alternatives whose first characters could not be computed
    /// statically; always tried.
    fallback: Vec<usize>,
}

impl TokenChoiceNode {
    pub(crate) fn build(alternatives: Vec<Parser>) -> Self {
        let mut dispatch: FxHashMap<char, Vec<usize>> = FxHashMap::default();
        let mut fallback = Vec::new();
        for (index, alternative) in alternatives.iter().enumerate() {
            match first_chars(alternative, 0) {
                Some(chars) => {
                    for c in chars {
                        dispatch.entry(c).or_default().push(index);
                    }
                }
                None => fallback.push(index),
            }
        }
        for candidates in dispatch.values_mut() {
            candidates.extend_from_slice(&fallback);
            candidates.sort_unstable();
            candidates.dedup();
        }
        Self { alternatives, dispatch, fallback }
    }
}

/// The set of characters an alternative can start with, when it is
/// statically known. `None` sends the alternative to the fallback list.
fn first_chars(parser: &Parser, depth: usize) -> Option<Vec<char>> {
    if depth > 16 {
        return None;
    }
    match parser.kind() {
        ParserKind::Literal { text } => text.chars().next().map(|c| vec![c]),
        ParserKind::CharRange { lo, hi } => {
            let span = (*hi as u32).checked_sub(*lo as u32)?;
            if span > 64 {
                return None;
            }
            Some((*lo..=*hi).collect())
        }
        ParserKind::CharSet { set } => Some(set.chars().collect()),
        ParserKind::Choice { children } => {
            let mut all = Vec::new();
            for child in children {
                all.extend(first_chars(child, depth + 1)?);
            }
            Some(all)
        }
        ParserKind::Seq { children } => first_chars(children.first()?, depth + 1),
        ParserKind::Word { child } | ParserKind::Token { child } => first_chars(child, depth + 1),
        ParserKind::Action(node) => first_chars(&node.child, depth + 1),
        ParserKind::Lazy { slot } => first_chars(slot.get()?, depth + 1),
        _ => None,
    }
}

pub(crate) fn token_choice(state: &mut ParseState, node: &TokenChoiceNode) -> bool {
    let is_text = matches!(state.input(), Input::Text { .. });
    if !is_text {
        // Token inputs have no character to dispatch on; degrade to the
        // equivalent ordered choice.
        return node.alternatives.iter().any(|alternative| alternative.parse(state));
    }
    let first = state.input().char_at(state.pos());
    let candidates = match first {
        Some(c) => node.dispatch.get(&c).map_or(node.fallback.as_slice(), Vec::as_slice),
        None => node.fallback.as_slice(),
    };
    candidates.iter().any(|&index| node.alternatives[index].parse(state))
}
