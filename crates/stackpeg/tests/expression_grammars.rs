//! Associativity and precedence scenarios for the expression combinators.

use pretty_assertions::assert_eq;
use stackpeg::{ActionError, ActionScope, ExprBuilder, Parser, Val, parse};
use stackpeg_tdd_support::{must_some, must_val};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
enum Ast {
    Num(i64),
    Bin(char, Box<Ast>, Box<Ast>),
    Cond(Box<Ast>, Box<Ast>, Box<Ast>),
    Fact(Box<Ast>),
}

fn num(n: i64) -> Ast {
    Ast::Num(n)
}

fn bin(op: char, l: Ast, r: Ast) -> Ast {
    Ast::Bin(op, Box::new(l), Box::new(r))
}

fn word(text: &str) -> Parser {
    Parser::word(Parser::literal(text))
}

fn number() -> Parser {
    Parser::word(Parser::push(
        Parser::as_matched(Parser::repeat(Parser::char_range('0', '9'), 1, None)),
        |scope| {
            let frame = scope.take_frame();
            let text = frame
                .first()
                .and_then(|v| v.downcast_ref::<Arc<str>>())
                .cloned()
                .ok_or_else(|| scope.fatal("number frame missing"))?;
            let n: i64 = text.parse().map_err(|_| scope.fatal("unreadable number"))?;
            Ok(Val::new(Ast::Num(n)))
        },
    ))
    .named("number")
}

fn frame_pair(scope: &mut ActionScope<'_>) -> Result<(Ast, Ast), ActionError> {
    let frame = scope.take_frame();
    match (frame.first(), frame.get(1)) {
        (Some(l), Some(r)) => {
            let left = l
                .downcast_ref::<Ast>()
                .cloned()
                .ok_or_else(|| scope.fatal("left operand is not an Ast"))?;
            let right = r
                .downcast_ref::<Ast>()
                .cloned()
                .ok_or_else(|| scope.fatal("right operand is not an Ast"))?;
            Ok((left, right))
        }
        _ => Err(scope.fatal("binary frame needs two operands")),
    }
}

fn binary_fold(op: char) -> impl Fn(&mut ActionScope<'_>) -> Result<Val, ActionError> {
    move |scope| {
        let (left, right) = frame_pair(scope)?;
        Ok(Val::new(bin(op, left, right)))
    }
}

fn result_ast(src: &str, grammar: &Parser) -> Ast {
    let report = parse(grammar, src);
    assert!(report.success, "{src} should parse");
    assert!(report.full_match, "{src} should be fully consumed");
    assert_eq!(report.value_stack.len(), 1);
    must_val::<Ast>(must_some(report.value_stack.first())).clone()
}

/// Additive expressions, left-associative.
fn sum() -> Parser {
    ExprBuilder::new(number())
        .infix(word("+"), binary_fold('+'))
        .infix(word("-"), binary_fold('-'))
        .build_left()
        .named("sum")
}

#[test]
fn test_addition_is_left_associative() {
    let ast = result_ast("1+2+3", &sum());
    assert_eq!(ast, bin('+', bin('+', num(1), num(2)), num(3)));
}

#[test]
fn test_mixed_operators_fold_in_input_order() {
    let ast = result_ast("1-2+3", &sum());
    assert_eq!(ast, bin('+', bin('-', num(1), num(2)), num(3)));
}

#[test]
fn test_two_levels_of_precedence() {
    let product = ExprBuilder::new(number())
        .infix(word("*"), binary_fold('*'))
        .build_left()
        .named("product");
    let grammar = ExprBuilder::new(product)
        .infix(word("+"), binary_fold('+'))
        .build_left()
        .named("sum");
    let ast = result_ast("1+2*3", &grammar);
    assert_eq!(ast, bin('+', num(1), bin('*', num(2), num(3))));
    let ast = result_ast("1*2+3", &grammar);
    assert_eq!(ast, bin('+', bin('*', num(1), num(2)), num(3)));
}

#[test]
fn test_assignment_is_right_associative() {
    let grammar = ExprBuilder::new(number())
        .infix(word("="), binary_fold('='))
        .build_right()
        .named("assign");
    let ast = result_ast("1=2=3", &grammar);
    assert_eq!(ast, bin('=', num(1), bin('=', num(2), num(3))));
}

#[test]
fn test_factorial_suffix_folds_repeatedly() {
    let grammar = ExprBuilder::new(number())
        .suffix(word("!"), |scope| {
            let frame = scope.take_frame();
            let operand = frame
                .first()
                .and_then(|v| v.downcast_ref::<Ast>())
                .cloned()
                .ok_or_else(|| scope.fatal("factorial needs an operand"))?;
            Ok(Val::new(Ast::Fact(Box::new(operand))))
        })
        .build_left()
        .named("postfix");
    let ast = result_ast("7 ! !", &grammar);
    assert_eq!(ast, Ast::Fact(Box::new(Ast::Fact(Box::new(num(7))))));
}

#[test]
fn test_ternary_as_composite_operator() {
    // `cond ? then : else`, right-associative: the `? then :` sequence is
    // one composite operator that parses a full expression between the
    // two marks.
    let full = Parser::lazy().named("conditional");
    let ternary_op = Parser::seq([word("?"), full.clone(), word(":")]);
    let grammar = ExprBuilder::new(sum())
        .infix(ternary_op, |scope| {
            let frame = scope.take_frame();
            let mut parts = Vec::with_capacity(3);
            for v in &frame {
                parts.push(
                    v.downcast_ref::<Ast>()
                        .cloned()
                        .ok_or_else(|| scope.fatal("conditional operand is not an Ast"))?,
                );
            }
            match (parts.first(), parts.get(1), parts.get(2)) {
                (Some(c), Some(t), Some(e)) => Ok(Val::new(Ast::Cond(
                    Box::new(c.clone()),
                    Box::new(t.clone()),
                    Box::new(e.clone()),
                ))),
                _ => Err(scope.fatal("conditional frame needs three operands")),
            }
        })
        .build_right();
    assert!(full.resolve(grammar.clone()));

    let ast = result_ast("1 ? 2 : 3", &grammar);
    assert_eq!(
        ast,
        Ast::Cond(Box::new(num(1)), Box::new(num(2)), Box::new(num(3)))
    );

    // Nested alternatives associate to the right.
    let ast = result_ast("1 ? 2 : 3 ? 4 : 5", &grammar);
    assert_eq!(
        ast,
        Ast::Cond(
            Box::new(num(1)),
            Box::new(num(2)),
            Box::new(Ast::Cond(Box::new(num(3)), Box::new(num(4)), Box::new(num(5)))),
        )
    );
}

#[test]
fn test_operator_required_rejects_bare_operand() {
    let grammar = ExprBuilder::new(number())
        .infix(word("+"), binary_fold('+'))
        .operator_required(true)
        .build_left()
        .named("sum");
    let report = parse(&grammar, "4");
    assert!(!report.success);
    assert!(report.value_stack.is_empty());

    let report = parse(&grammar, "4+5");
    assert!(report.success);
}

#[test]
fn test_distinct_right_operand_parser() {
    // Left operand is a number, right operands are single letters.
    let letter = Parser::word(Parser::push(
        Parser::as_matched(Parser::char_range('a', 'z')),
        |scope| {
            let frame = scope.take_frame();
            let text = frame
                .first()
                .and_then(|v| v.downcast_ref::<Arc<str>>())
                .cloned()
                .ok_or_else(|| scope.fatal("letter frame missing"))?;
            let c = text.chars().next().ok_or_else(|| scope.fatal("empty letter"))?;
            Ok(Val::new(Ast::Num(i64::from(u32::from(c)))))
        },
    ));
    let grammar = ExprBuilder::new(number())
        .right(letter)
        .infix(word("@"), binary_fold('@'))
        .build_left();
    let ast = result_ast("1@a@b", &grammar);
    assert_eq!(
        ast,
        bin('@', bin('@', num(1), num(i64::from(u32::from('a')))), num(i64::from(u32::from('b'))))
    );
}
