//! Pre-parse well-formedness analysis.
//!
//! Two conservative questions are answered over the combinator graph
//! before a parse starts: can a parser succeed without consuming input
//! (nullable), and is any parser its own leftmost requirement (left
//! recursion). Both over-approximate. A repetition over a nullable
//! operand and any unprotected left-recursive cycle are reported as
//! diagnostics; the driver refuses to parse while any exist. Expression
//! combinators handle their own recursion explicitly, so their recursive
//! edge is not traversed here.

use crate::error::GrammarError;
use crate::parser::{Parser, ParserKind, StepKind};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

/// Analyze the grammar rooted at `root`, returning every diagnostic found.
pub fn check_grammar(root: &Parser) -> Vec<GrammarError> {
    let mut analysis = Analysis::collect(root);
    analysis.compute_nullable();
    analysis.check_repetitions();
    analysis.check_left_recursion();
    debug!("well-formedness: {} node(s), {} diagnostic(s)", analysis.nodes.len(), analysis.errors.len());
    analysis.errors
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    Grey,
    Black,
}

struct Analysis {
    nodes: Vec<Parser>,
    index: FxHashMap<usize, usize>,
    nullable: Vec<bool>,
    errors: Vec<GrammarError>,
    reported_cycles: FxHashSet<Vec<String>>,
}

impl Analysis {
    fn collect(root: &Parser) -> Self {
        let mut nodes: Vec<Parser> = Vec::new();
        let mut index = FxHashMap::default();
        let mut errors = Vec::new();
        let mut pending = vec![root.clone()];
        while let Some(parser) = pending.pop() {
            if index.contains_key(&parser.id()) {
                continue;
            }
            index.insert(parser.id(), nodes.len());
            if let ParserKind::Lazy { slot } = parser.kind() {
                if slot.get().is_none() {
                    errors.push(GrammarError::UnresolvedLazy { rule: parser.display_name() });
                }
            }
            pending.extend(parser.children());
            nodes.push(parser);
        }
        let nullable = vec![false; nodes.len()];
        Self { nodes, index, nullable, errors, reported_cycles: FxHashSet::default() }
    }

    fn is_nullable(&self, parser: &Parser) -> bool {
        self.index.get(&parser.id()).map(|&i| self.nullable[i]).unwrap_or(false)
    }

    fn nullable_step(&self, parser: &Parser) -> bool {
        match parser.kind() {
            ParserKind::Empty
            | ParserKind::Not { .. }
            | ParserKind::Ahead { .. }
            | ParserKind::Opt { .. } => true,
            ParserKind::Fail
            | ParserKind::TokKind { .. }
            | ParserKind::Any
            | ParserKind::CharPred { .. }
            | ParserKind::TokPred { .. }
            | ParserKind::CharRange { .. }
            | ParserKind::CharSet { .. } => false,
            ParserKind::Literal { text } => text.is_empty(),
            ParserKind::Seq { children } => children.iter().all(|c| self.is_nullable(c)),
            ParserKind::Choice { children } => children.iter().any(|c| self.is_nullable(c)),
            ParserKind::Repeat { child, min, .. } => *min == 0 || self.is_nullable(child),
            ParserKind::Lazy { slot } => slot.get().is_some_and(|t| self.is_nullable(t)),
            ParserKind::SepBy { item, min, .. } => *min == 0 || self.is_nullable(item),
            ParserKind::Word { child } | ParserKind::Token { child } => self.is_nullable(child),
            ParserKind::TokenChoice(node) => {
                node.alternatives.iter().any(|a| self.is_nullable(a))
            }
            ParserKind::Action(node) => self.is_nullable(&node.child),
            ParserKind::LeftExpr(node) | ParserKind::RightExpr(node) => {
                self.is_nullable(&node.data.left)
            }
        }
    }

    fn compute_nullable(&mut self) {
        loop {
            let mut changed = false;
            for i in 0..self.nodes.len() {
                let parser = self.nodes[i].clone();
                let value = self.nullable_step(&parser);
                if value != self.nullable[i] {
                    self.nullable[i] = value;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
    }

    /// The children a parser must consult before it has consumed input.
    fn left_edges(&self, parser: &Parser) -> Vec<Parser> {
        match parser.kind() {
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
            ParserKind::Action(node) => vec![node.child.clone()],
            ParserKind::Seq { children } => {
                let mut edges = Vec::new();
                for child in children {
                    edges.push(child.clone());
                    if !self.is_nullable(child) {
                        break;
                    }
                }
                edges
            }
            ParserKind::Choice { children } => children.clone(),
            ParserKind::TokenChoice(node) => node.alternatives.clone(),
            ParserKind::Lazy { slot } => slot.get().cloned().into_iter().collect(),
            ParserKind::SepBy { item, sep, .. } => {
                let mut edges = vec![item.clone()];
                if self.is_nullable(item) {
                    edges.push(sep.clone());
                }
                edges
            }
            ParserKind::LeftExpr(node) | ParserKind::RightExpr(node) => {
                let mut edges = vec![node.data.left.clone()];
                if self.is_nullable(&node.data.left) {
                    edges.push(node.data.right.clone());
                    for step in &node.data.steps {
                        edges.push(match &step.kind {
                            StepKind::Infix { op } => op.clone(),
                            StepKind::Suffix { parser } => parser.clone(),
                        });
                    }
                }
                edges
            }
        }
    }

    fn check_repetitions(&mut self) {
        for parser in &self.nodes {
            let looping = match parser.kind() {
                ParserKind::Repeat { child, max: None, .. } => self.is_nullable(child),
                ParserKind::SepBy { item, sep, .. } => {
                    self.is_nullable(item) && self.is_nullable(sep)
                }
                _ => false,
            };
            if looping {
                self.errors
                    .push(GrammarError::NullableRepetition { rule: parser.display_name() });
            }
        }
    }

    fn check_left_recursion(&mut self) {
        let mut color: FxHashMap<usize, Color> = FxHashMap::default();
        for i in 0..self.nodes.len() {
            let parser = self.nodes[i].clone();
            if !color.contains_key(&parser.id()) {
                let mut path = Vec::new();
                self.dfs(&parser, &mut color, &mut path);
            }
        }
    }

    fn dfs(&mut self, parser: &Parser, color: &mut FxHashMap<usize, Color>, path: &mut Vec<Parser>) {
        match color.get(&parser.id()) {
            Some(Color::Grey) => {
                self.record_cycle(path, parser);
                return;
            }
            Some(Color::Black) => return,
            None => {}
        }
        color.insert(parser.id(), Color::Grey);
        path.push(parser.clone());
        for edge in self.left_edges(parser) {
            self.dfs(&edge, color, path);
        }
        path.pop();
        color.insert(parser.id(), Color::Black);
    }

    fn record_cycle(&mut self, path: &[Parser], reentered: &Parser) {
        let start = path.iter().position(|p| p.id() == reentered.id()).unwrap_or(0);
        let cycle = &path[start..];
        let labeled: Vec<String> =
            cycle.iter().filter_map(|p| p.rule_name().map(str::to_string)).collect();
        let names = if labeled.is_empty() {
            cycle.iter().map(Parser::display_name).collect()
        } else {
            labeled
        };
        if self.reported_cycles.insert(names.clone()) {
            self.errors.push(GrammarError::LeftRecursion { cycle: names });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{ExprBuilder, TrailingSep};
    use crate::state::Val;

    /// `A = A 'x' | 'y'`
    fn left_recursive_rule() -> Parser {
        let a = Parser::lazy().named("A");
        let body = Parser::choice([
            Parser::seq([a.clone(), Parser::literal("x")]),
            Parser::literal("y"),
        ]);
        assert!(a.resolve(body));
        a
    }

    #[test]
    fn test_direct_left_recursion_names_the_rule() {
        let errors = check_grammar(&left_recursive_rule());
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            GrammarError::LeftRecursion { cycle } if cycle.contains(&"A".to_string())
        ));
    }

    #[test]
    fn test_left_recursion_behind_nullable_prefix() {
        // B = ('-')? B: the optional prefix is nullable, so B is still
        // its own leftmost requirement.
        let b = Parser::lazy().named("B");
        let body = Parser::seq([Parser::opt(Parser::literal("-")), b.clone()]);
        assert!(b.resolve(body));
        let errors = check_grammar(&b);
        assert!(matches!(errors[0], GrammarError::LeftRecursion { .. }));
    }

    #[test]
    fn test_guarded_recursion_is_well_formed() {
        // list = '[' list? ']' is fine: the recursion sits behind a literal.
        let list = Parser::lazy().named("list");
        let body = Parser::seq([
            Parser::literal("["),
            Parser::opt(list.clone()),
            Parser::literal("]"),
        ]);
        assert!(list.resolve(body));
        assert!(check_grammar(&list).is_empty());
    }

    #[test]
    fn test_nullable_repetition_is_reported() {
        let p = Parser::repeat(Parser::opt(Parser::literal("a")), 0, None).named("pad");
        let errors = check_grammar(&p);
        assert_eq!(
            errors,
            vec![GrammarError::NullableRepetition { rule: "pad".to_string() }]
        );
    }

    #[test]
    fn test_bounded_repetition_over_nullable_is_allowed() {
        let p = Parser::repeat(Parser::opt(Parser::literal("a")), 0, Some(4));
        assert!(check_grammar(&p).is_empty());
    }

    #[test]
    fn test_nullable_separated_repetition_is_reported() {
        let p = Parser::sep_by(
            Parser::opt(Parser::literal("a")),
            Parser::opt(Parser::literal(",")),
            0,
            TrailingSep::Forbidden,
        );
        let errors = check_grammar(&p);
        assert!(matches!(errors[0], GrammarError::NullableRepetition { .. }));
    }

    #[test]
    fn test_unresolved_lazy_is_reported() {
        let slot = Parser::lazy().named("pending");
        let errors = check_grammar(&slot);
        assert_eq!(errors, vec![GrammarError::UnresolvedLazy { rule: "pending".to_string() }]);
    }

    #[test]
    fn test_expression_recursion_is_exempt() {
        let operand = Parser::as_val(Parser::char_range('0', '9'), Val::new(1i64));
        let expr = ExprBuilder::new(operand)
            .infix(Parser::literal("+"), |scope| {
                let _ = scope.take_frame();
                Ok(Val::new(1i64))
            })
            .build_right();
        assert!(check_grammar(&expr).is_empty());
    }

    #[test]
    fn test_indirect_cycle_through_two_rules() {
        let a = Parser::lazy().named("expr");
        let b = Parser::lazy().named("term");
        assert!(a.resolve(Parser::choice([b.clone(), Parser::literal("n")])));
        assert!(b.resolve(Parser::seq([a.clone(), Parser::literal("*")])));
        let errors = check_grammar(&a);
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            GrammarError::LeftRecursion { cycle }
                if cycle.contains(&"expr".to_string()) && cycle.contains(&"term".to_string())
        ));
    }
}
