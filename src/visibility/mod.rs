//! Visibility label expressions.
//!
//! A label is a boolean expression over authorization tokens, e.g.
//! `(a&b)|d`. Labels are attached to documents at index time and evaluated
//! against the authorization set a caller presents at query time.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::authorizations::Authorizations;
use crate::error::{LabelParseError, LabelParseErrorKind};

mod parser;

/// A parsed visibility label.
///
/// Immutable once built; `And`/`Or` always carry at least two children.
/// Equal label strings parse to structurally equal trees, which is what
/// allows caching parsed expressions by dictionary ordinal.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub enum VisibilityExpr {
    Token(String),
    And(Vec<VisibilityExpr>),
    Or(Vec<VisibilityExpr>),
}

impl VisibilityExpr {
    /// Parse a label string. Parsing is total: malformed input fails with
    /// the offending byte span, never a partial tree.
    pub fn parse(label: &str) -> Result<Self, LabelParseError> {
        parser::parse(label)
    }

    /// Parse a label stored as raw bytes (the dictionary-encoded column
    /// representation). Non-UTF-8 bytes are a parse error.
    pub fn parse_bytes(label: &[u8]) -> Result<Self, LabelParseError> {
        let label = std::str::from_utf8(label).map_err(|_| LabelParseError {
            span: 0..label.len(),
            kind: LabelParseErrorKind::NotUtf8,
        })?;
        parser::parse(label)
    }

    /// Evaluate this expression against an authorization set.
    ///
    /// Deterministic and allocation-free; the result does not depend on
    /// child evaluation order.
    pub fn satisfied_by(&self, auths: &Authorizations) -> bool {
        match self {
            Self::Token(token) => auths.contains(token),
            Self::And(children) => children.iter().all(|c| c.satisfied_by(auths)),
            Self::Or(children) => children.iter().any(|c| c.satisfied_by(auths)),
        }
    }
}

impl FromStr for VisibilityExpr {
    type Err = LabelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::VisibilityExpr;
    use crate::authorizations::Authorizations;

    fn auths(tokens: &[&str]) -> Authorizations {
        Authorizations::new(tokens.iter().copied())
    }

    fn eval(label: &str, tokens: &[&str]) -> bool {
        VisibilityExpr::parse(label)
            .unwrap()
            .satisfied_by(&auths(tokens))
    }

    #[test]
    fn token_is_membership() {
        assert!(eval("a", &["a", "b"]));
        assert!(!eval("a", &["b"]));
        assert!(!eval("a", &[]));
    }

    #[test]
    fn and_requires_all() {
        assert!(eval("a&b", &["a", "b"]));
        assert!(!eval("a&b", &["a"]));
        assert!(!eval("a&b&c", &["a", "b"]));
    }

    #[test]
    fn or_requires_any() {
        assert!(eval("a|b", &["b"]));
        assert!(!eval("a|b", &["c"]));
    }

    #[test]
    fn nested_expressions() {
        assert!(eval("(a&b)|d", &["d"]));
        assert!(eval("(a&b)|d", &["a", "b"]));
        assert!(!eval("(a&b)|d", &["a"]));
        assert!(eval("a&(b|c)", &["a", "c"]));
        assert!(!eval("a&(b|c)", &["b", "c"]));
    }

    #[test]
    fn quoted_tokens_match_verbatim() {
        assert!(eval("\"a b\"|c", &["a b"]));
        assert!(!eval("\"a b\"|c", &["a", "b"]));
        assert!(eval("\"quo\\\"te\"", &["quo\"te"]));
        assert!(eval("\"back\\\\slash\"", &["back\\slash"]));
    }

    #[test]
    fn monotone_under_superset() {
        let cases = ["a", "a&b", "a|b", "(a&b)|(c&d)", "a&(b|c)"];
        let small = auths(&["a", "b"]);
        let large = auths(&["a", "b", "c", "d"]);
        for label in cases {
            let expr = VisibilityExpr::parse(label).unwrap();
            if expr.satisfied_by(&small) {
                assert!(expr.satisfied_by(&large), "monotonicity violated for {label}");
            }
        }
    }

    #[test]
    fn shared_label_scenario() {
        // labels from two documents, three callers
        let x = VisibilityExpr::parse("(a&b)|d").unwrap();
        let y = VisibilityExpr::parse("a&b&c").unwrap();

        let dab = auths(&["d", "a", "b"]);
        assert!(x.satisfied_by(&dab));
        assert!(!y.satisfied_by(&dab));

        let cab = auths(&["c", "a", "b"]);
        assert!(x.satisfied_by(&cab));
        assert!(y.satisfied_by(&cab));

        let other = auths(&["x"]);
        assert!(!x.satisfied_by(&other));
        assert!(!y.satisfied_by(&other));
    }
}
