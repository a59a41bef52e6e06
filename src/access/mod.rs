//! Access policies: the decision engine gating every read path.
//!
//! An [`AccessControlConfig`] is the unbound policy template — immutable
//! caller configuration with no segment attached. Binding it to a segment
//! materializes the strategy's per-segment state (label column handles for
//! [`ValueCacheAccess`], visibility bitmaps for [`BitsetAccess`]) and yields
//! a shared, read-only [`AccessControl`] for that segment's lifetime.

use std::sync::Arc;

use fnv::FnvHashSet;
use serde::{Deserialize, Serialize};

use crate::authorizations::Authorizations;
use crate::cache::DEFAULT_CACHE_CAPACITY;
use crate::error::Result;
use crate::segment::{DocId, Segment};

mod bitset;
mod value_cache;

pub use bitset::BitsetAccess;
pub use value_cache::ValueCacheAccess;

/// Default field name carrying the read-channel label.
pub const READ_FIELD: &str = "_read_";

/// Default field name carrying the discover-channel label.
pub const DISCOVER_FIELD: &str = "_discover_";

/// The read paths a decision can gate. Closed set; every kind maps onto the
/// read channel, the discover channel, or their disjunction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AccessKind {
    /// Liveness and postings filtering: the document is visible at all.
    Existence,
    DocumentFetchRead,
    DocumentFetchDiscover,
    ScalarValue,
    BinaryValue,
    SortedValue,
    SortedSetValue,
    NormValue,
}

/// A policy bound to one segment.
///
/// Decisions are pure reads: `has_access` never fails for a doc id in
/// `[0, max_doc)`, and any internal error condition (an unparseable stored
/// label, say) denies rather than grants.
pub trait AccessControl: Send + Sync {
    /// Full-content visibility for `doc`.
    fn read_access(&self, doc: DocId) -> bool;

    /// Narrowed visibility for `doc`: known to exist, restricted field
    /// subset visible.
    fn discover_access(&self, doc: DocId) -> bool;

    /// Whether a stored field stays visible to a discover-only caller.
    fn can_discover_field(&self, field: &str) -> bool;

    fn has_access(&self, kind: AccessKind, doc: DocId) -> bool {
        match kind {
            AccessKind::Existence => self.read_access(doc) || self.discover_access(doc),
            AccessKind::DocumentFetchDiscover => self.discover_access(doc),
            AccessKind::DocumentFetchRead
            | AccessKind::ScalarValue
            | AccessKind::BinaryValue
            | AccessKind::SortedValue
            | AccessKind::SortedSetValue
            | AccessKind::NormValue => self.read_access(doc),
        }
    }
}

/// Which per-segment state a bound policy materializes.
///
/// `ValueCache` decodes the label ordinal per access and memoizes parsed
/// labels; negligible bind cost, O(1) amortized per access. `Bitset` walks
/// the label term dictionary once at bind time and reduces every access to
/// a bitmap test; prefer it when one policy filters many documents against
/// the same segment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    #[default]
    ValueCache,
    Bitset,
}

/// Unbound policy template: caller authorizations plus field configuration.
///
/// Cheap to clone and safe to share; binding never mutates it.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessControlConfig {
    pub read_auths: Authorizations,
    pub discover_auths: Authorizations,

    /// Stored fields that remain visible to a discover-only caller.
    pub discoverable_fields: FnvHashSet<String>,

    pub read_field: String,
    pub discover_field: String,

    pub strategy: Strategy,

    /// Capacity of each per-field label cache (value-cache strategy).
    pub cache_capacity: u64,

    /// When set, binding against a segment lacking a label column fails
    /// with [`crate::Error::MissingRequiredColumn`] instead of treating the
    /// channel as "no label present".
    pub require_label_columns: bool,
}

impl Default for AccessControlConfig {
    fn default() -> Self {
        Self {
            read_auths: Authorizations::empty(),
            discover_auths: Authorizations::empty(),
            discoverable_fields: FnvHashSet::default(),
            read_field: READ_FIELD.to_owned(),
            discover_field: DISCOVER_FIELD.to_owned(),
            strategy: Strategy::default(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            require_label_columns: false,
        }
    }
}

impl AccessControlConfig {
    pub fn new(
        read_auths: Authorizations,
        discover_auths: Authorizations,
        discoverable_fields: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            read_auths,
            discover_auths,
            discoverable_fields: discoverable_fields.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_label_fields(
        mut self,
        read_field: impl Into<String>,
        discover_field: impl Into<String>,
    ) -> Self {
        self.read_field = read_field.into();
        self.discover_field = discover_field.into();
        self
    }

    /// Bind this template to a segment, materializing the configured
    /// strategy's per-segment state. The bound policy is immutable and valid
    /// for the segment's lifetime.
    pub fn bind(&self, segment: &dyn Segment) -> Result<Arc<dyn AccessControl>> {
        Ok(match self.strategy {
            Strategy::ValueCache => Arc::new(ValueCacheAccess::bind(self, segment)?),
            Strategy::Bitset => Arc::new(BitsetAccess::bind(self, segment)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_deserializes_from_partial_json() {
        let config: AccessControlConfig = serde_json::from_str(
            r#"{
                "read_auths": ["r1", "r2"],
                "discoverable_fields": ["info"],
                "strategy": "bitset"
            }"#,
        )
        .unwrap();
        assert!(config.read_auths.contains("r1"));
        assert!(config.discover_auths.is_empty());
        assert_eq!(config.strategy, Strategy::Bitset);
        assert_eq!(config.read_field, READ_FIELD);
        assert_eq!(config.cache_capacity, DEFAULT_CACHE_CAPACITY);
    }
}
