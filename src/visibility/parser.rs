use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use crate::error::{LabelParseError, LabelParseErrorKind};

use super::VisibilityExpr;

/// The visibility label parser.
#[derive(Parser)]
#[grammar = "../grammar/visibility.pest"]
struct LabelParser;

pub(super) fn parse(input: &str) -> Result<VisibilityExpr, LabelParseError> {
    if input.trim().is_empty() {
        return Err(LabelParseError {
            span: 0..input.len(),
            kind: LabelParseErrorKind::Empty,
        });
    }

    let mut pairs = LabelParser::parse(Rule::label, input).map_err(convert_error)?;

    // `expr` is silent, so the label's first child is the root node
    // (followed only by EOI).
    let label = pairs.next().expect("grammar yields exactly one label");
    let root = label
        .into_inner()
        .next()
        .expect("label wraps a root expression");
    Ok(build(root))
}

fn build(pair: Pair<Rule>) -> VisibilityExpr {
    match pair.as_rule() {
        Rule::token => VisibilityExpr::Token(pair.as_str().to_owned()),
        Rule::quoted => {
            let inner = pair.into_inner().next().expect("quoted wraps one inner");
            VisibilityExpr::Token(unescape(inner.as_str()))
        }
        Rule::and_expr => collect(pair, VisibilityExpr::And),
        Rule::or_expr => collect(pair, VisibilityExpr::Or),
        rule => unreachable!("unexpected rule {rule:?}"),
    }
}

/// Build an n-ary And/Or node. Duplicate children are dropped (membership is
/// idempotent); a node left with a single child collapses to that child.
fn collect(pair: Pair<Rule>, node: fn(Vec<VisibilityExpr>) -> VisibilityExpr) -> VisibilityExpr {
    let mut children: Vec<VisibilityExpr> = Vec::new();
    for inner in pair.into_inner() {
        let child = build(inner);
        if !children.contains(&child) {
            children.push(child);
        }
    }
    if children.len() == 1 {
        children.pop().expect("len checked")
    } else {
        node(children)
    }
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            // the grammar only admits \" and \\
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn convert_error(err: pest::error::Error<Rule>) -> LabelParseError {
    let span = match err.location {
        pest::error::InputLocation::Pos(pos) => pos..pos,
        pest::error::InputLocation::Span((start, end)) => start..end,
    };
    LabelParseError {
        span,
        kind: LabelParseErrorKind::Syntax(err.variant.message().into_owned()),
    }
}

#[cfg(test)]
mod label_tests {
    use super::super::VisibilityExpr;
    use crate::error::LabelParseErrorKind;

    fn parse_ok(input: &str) -> VisibilityExpr {
        VisibilityExpr::parse(input).unwrap()
    }

    fn token(t: &str) -> VisibilityExpr {
        VisibilityExpr::Token(t.to_owned())
    }

    #[test]
    fn single_token() {
        assert_eq!(parse_ok("a"), token("a"));
        assert_eq!(parse_ok("under_score-dash9"), token("under_score-dash9"));
    }

    #[test]
    fn and_sequence_flattens() {
        assert_eq!(
            parse_ok("a&b&c"),
            VisibilityExpr::And(vec![token("a"), token("b"), token("c")])
        );
    }

    #[test]
    fn or_sequence_flattens() {
        assert_eq!(
            parse_ok("a|b|c"),
            VisibilityExpr::Or(vec![token("a"), token("b"), token("c")])
        );
    }

    #[test]
    fn parentheses_override_nesting() {
        assert_eq!(
            parse_ok("(a&b)|d"),
            VisibilityExpr::Or(vec![
                VisibilityExpr::And(vec![token("a"), token("b")]),
                token("d"),
            ])
        );
    }

    #[test]
    fn whitespace_is_insignificant() {
        assert_eq!(parse_ok(" a & ( b | c ) "), parse_ok("a&(b|c)"));
    }

    #[test]
    fn quoted_token_with_escapes() {
        assert_eq!(parse_ok("\"a b\""), token("a b"));
        assert_eq!(parse_ok("\"a\\\"b\""), token("a\"b"));
        assert_eq!(parse_ok("\"a\\\\b\""), token("a\\b"));
    }

    #[test]
    fn reparse_is_structurally_equal() {
        for label in ["a", "a&b&c", "(a&b)|d", "\"x y\"|z", "a&(b|(c&d))"] {
            assert_eq!(parse_ok(label), parse_ok(label));
        }
    }

    #[test]
    fn duplicates_are_deduplicated() {
        assert_eq!(parse_ok("a&a"), token("a"));
        assert_eq!(
            parse_ok("a&b&a"),
            VisibilityExpr::And(vec![token("a"), token("b")])
        );
    }

    #[test]
    fn empty_label_is_rejected() {
        let err = VisibilityExpr::parse("").unwrap_err();
        assert_eq!(err.kind, LabelParseErrorKind::Empty);
        let err = VisibilityExpr::parse("   ").unwrap_err();
        assert_eq!(err.kind, LabelParseErrorKind::Empty);
    }

    #[test]
    fn mixed_operators_require_parentheses() {
        VisibilityExpr::parse("a&b|c").unwrap_err();
        VisibilityExpr::parse("a|b&c").unwrap_err();
        assert!(VisibilityExpr::parse("(a&b)|c").is_ok());
        assert!(VisibilityExpr::parse("a&(b|c)").is_ok());
    }

    #[test]
    fn malformed_labels_are_rejected_with_position() {
        for bad in ["a&", "&a", "(a", "a)", "a b", "\"a", "a&&b", "a||b", "()"] {
            let err = VisibilityExpr::parse(bad).unwrap_err();
            assert!(
                matches!(err.kind, LabelParseErrorKind::Syntax(_)),
                "expected syntax error for {bad:?}, got {err:?}"
            );
            assert!(err.span.end <= bad.len());
        }
    }

    #[test]
    fn non_utf8_bytes_are_rejected() {
        let err = VisibilityExpr::parse_bytes(&[0x61, 0xff, 0x62]).unwrap_err();
        assert_eq!(err.kind, LabelParseErrorKind::NotUtf8);
    }
}
