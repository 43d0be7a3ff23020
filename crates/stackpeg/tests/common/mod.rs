//! Shared grammar builders for the integration tests.
//!
//! The JSON grammar exercises most of the engine surface: lazy recursion,
//! word wrapping, separated repetition, the token-choice fast path, and
//! push actions building `serde_json::Value` trees on the value stack.

// Not every integration test uses every helper.
#![allow(dead_code)]

use serde_json::{Map, Number, Value};
use stackpeg::{ActionScope, Parser, TrailingSep, Val};
use std::sync::Arc;

fn word(text: &str) -> Parser {
    Parser::word(Parser::literal(text))
}

fn take_value(scope: &mut ActionScope<'_>, v: &Val) -> Result<Value, stackpeg::ActionError> {
    match v.downcast_ref::<Value>() {
        Some(value) => Ok(value.clone()),
        None => Err(scope.fatal(format!("expected a JSON value, got {}", v.type_name()))),
    }
}

/// Decode a raw string literal (quotes included) into its text.
fn unescape(raw: &str) -> Result<String, String> {
    let inner = raw
        .get(1..raw.len().saturating_sub(1))
        .ok_or_else(|| "string literal too short".to_string())?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('/') => out.push('/'),
            Some('b') => out.push('\u{0008}'),
            Some('f') => out.push('\u{000C}'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('u') => {
                let high = read_hex4(&mut chars)?;
                let code = if (0xD800..=0xDBFF).contains(&high) {
                    // Surrogate pair: a second \uXXXX must follow.
                    if chars.next() != Some('\\') || chars.next() != Some('u') {
                        return Err("lone high surrogate".to_string());
                    }
                    let low = read_hex4(&mut chars)?;
                    if !(0xDC00..=0xDFFF).contains(&low) {
                        return Err("invalid low surrogate".to_string());
                    }
                    0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)
                } else {
                    high
                };
                out.push(char::from_u32(code).ok_or_else(|| "invalid code point".to_string())?);
            }
            other => return Err(format!("invalid escape {other:?}")),
        }
    }
    Ok(out)
}

fn read_hex4(chars: &mut std::str::Chars<'_>) -> Result<u32, String> {
    let mut code = 0u32;
    for _ in 0..4 {
        let c = chars.next().ok_or_else(|| "truncated \\u escape".to_string())?;
        let digit = c.to_digit(16).ok_or_else(|| format!("bad hex digit {c:?}"))?;
        code = code * 16 + digit;
    }
    Ok(code)
}

/// A raw string literal, quotes included, pushed as `Arc<str>`.
fn string_literal() -> Parser {
    let escape = Parser::seq([Parser::literal("\\"), Parser::any()]);
    let plain = Parser::char_pred(|c| c != '"' && c != '\\');
    Parser::as_matched(Parser::seq([
        Parser::literal("\""),
        Parser::repeat(Parser::choice([escape, plain]), 0, None),
        Parser::literal("\""),
    ]))
}

fn decode_string(scope: &mut ActionScope<'_>) -> Result<String, stackpeg::ActionError> {
    let frame = scope.take_frame();
    let raw = frame
        .first()
        .and_then(|v| v.downcast_ref::<Arc<str>>())
        .cloned()
        .ok_or_else(|| scope.fatal("string literal frame missing"))?;
    unescape(&raw).map_err(|reason| scope.fatal(reason))
}

fn number_syntax() -> Parser {
    let digit = Parser::char_range('0', '9');
    let digits = Parser::repeat(digit.clone(), 1, None);
    let int = Parser::choice([
        Parser::literal("0"),
        Parser::seq([Parser::char_range('1', '9'), Parser::repeat(digit.clone(), 0, None)]),
    ]);
    let fraction = Parser::opt(Parser::seq([Parser::literal("."), digits.clone()]));
    let exponent = Parser::opt(Parser::seq([
        Parser::char_set("eE"),
        Parser::opt(Parser::char_set("+-")),
        digits,
    ]));
    Parser::seq([Parser::opt(Parser::literal("-")), int, fraction, exponent])
}

/// Build the JSON grammar. All numbers decode to doubles.
pub fn json_grammar() -> Parser {
    let value = Parser::lazy().named("value");

    let string_value = Parser::word(Parser::push(string_literal(), |scope| {
        decode_string(scope).map(|text| Val::new(Value::String(text)))
    }))
    .named("string");

    let number = Parser::word(Parser::push(Parser::as_matched(number_syntax()), |scope| {
        let frame = scope.take_frame();
        let text = frame
            .first()
            .and_then(|v| v.downcast_ref::<Arc<str>>())
            .cloned()
            .ok_or_else(|| scope.fatal("number frame missing"))?;
        let parsed: f64 = text.parse().map_err(|_| scope.fatal("unreadable number"))?;
        let number = Number::from_f64(parsed)
            .ok_or_else(|| scope.fatal("number out of range"))?;
        Ok(Val::new(Value::Number(number)))
    }))
    .named("number");

    let constant = Parser::token_choice([
        Parser::as_val(word("true"), Val::new(Value::Bool(true))),
        Parser::as_val(word("false"), Val::new(Value::Bool(false))),
        Parser::as_val(word("null"), Val::new(Value::Null)),
    ])
    .named("constant");

    let array = Parser::word(Parser::push(
        Parser::seq([
            word("["),
            Parser::sep_by(value.clone(), word(","), 0, TrailingSep::Forbidden),
            word("]"),
        ]),
        |scope| {
            let frame = scope.take_frame();
            let mut items = Vec::with_capacity(frame.len());
            for v in &frame {
                items.push(take_value(scope, v)?);
            }
            Ok(Val::new(Value::Array(items)))
        },
    ))
    .named("array");

    // A member pushes its decoded key and its value; the pair action folds
    // them into a single (key, value) entry.
    let key = Parser::word(Parser::push(string_literal(), |scope| {
        decode_string(scope).map(Val::new)
    }));
    let member = Parser::push(
        Parser::seq([key, word(":"), value.clone()]),
        |scope| {
            let frame = scope.take_frame();
            let entry_key = frame
                .first()
                .and_then(|v| v.downcast_ref::<String>())
                .cloned()
                .ok_or_else(|| scope.fatal("member key missing"))?;
            let entry_value = match frame.get(1) {
                Some(v) => take_value(scope, v)?,
                None => return Err(scope.fatal("member value missing")),
            };
            Ok(Val::new((entry_key, entry_value)))
        },
    )
    .named("member");

    let object = Parser::word(Parser::push(
        Parser::seq([
            word("{"),
            Parser::sep_by(member, word(","), 0, TrailingSep::Forbidden),
            word("}"),
        ]),
        |scope| {
            let frame = scope.take_frame();
            let mut map = Map::new();
            for v in &frame {
                match v.downcast_ref::<(String, Value)>() {
                    Some((k, value)) => {
                        map.insert(k.clone(), value.clone());
                    }
                    None => return Err(scope.fatal("object frame holds a non-member")),
                }
            }
            Ok(Val::new(Value::Object(map)))
        },
    ))
    .named("object");

    let resolved = value.resolve(
        Parser::choice([object, array, string_value, number, constant]),
    );
    assert!(resolved);

    Parser::seq([Parser::word(Parser::empty()), value]).named("json")
}

/// Pull the single JSON value off a report's value stack.
pub fn json_result(report: &stackpeg::ParseReport) -> Option<Value> {
    match report.value_stack.as_slice() {
        [only] => only.downcast_ref::<Value>().cloned(),
        _ => None,
    }
}
