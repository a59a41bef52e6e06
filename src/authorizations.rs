use fnv::FnvHashSet;
use serde::{Deserialize, Serialize};

use crate::visibility::VisibilityExpr;

/// The set of authorization tokens one caller holds.
///
/// Tokens are opaque strings with no structure beyond equality. The set is
/// immutable once constructed and safe to share across threads.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Authorizations {
    tokens: FnvHashSet<String>,
}

impl Authorizations {
    pub fn new<I, T>(tokens: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// The union of two authorization sets. Discover-channel evaluation runs
    /// against `union(read_auths, discover_auths)`.
    pub fn union(a: &Self, b: &Self) -> Self {
        Self {
            tokens: a.tokens.union(&b.tokens).cloned().collect(),
        }
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }

    /// Evaluate a parsed label against this set.
    pub fn satisfies(&self, expr: &VisibilityExpr) -> bool {
        expr.satisfied_by(self)
    }
}

impl<T: Into<String>> FromIterator<T> for Authorizations {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter)
    }
}
