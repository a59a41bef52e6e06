//! Per-segment cache of parsed visibility labels.
//!
//! Label columns are dictionary-encoded, so many documents share one
//! ordinal. Caching `ordinal -> parsed expression` means each distinct label
//! is decoded and parsed at most once per segment (modulo capacity eviction
//! and fill races), instead of once per document access.

use std::sync::Arc;

use moka::sync::Cache;

use crate::error::LabelParseError;
use crate::visibility::VisibilityExpr;

/// Default number of cached labels per field per segment.
pub const DEFAULT_CACHE_CAPACITY: u64 = 1000;

/// Bounded concurrent cache mapping a label ordinal to its parsed
/// expression.
///
/// Scoped to one segment and one label field; segments are immutable, so
/// entries never need invalidation — only capacity-triggered eviction.
/// Concurrent fills of the same ordinal are safe: at most one caller parses
/// while the rest wait for the resulting shared expression.
pub struct LabelCache {
    cache: Cache<u32, Arc<VisibilityExpr>>,
}

impl LabelCache {
    pub fn new(capacity: u64) -> Self {
        Self {
            cache: Cache::builder().max_capacity(capacity).build(),
        }
    }

    /// Return the cached expression for `ord`, or decode and parse it via
    /// `decode` on a miss. Parse failures are returned to every waiting
    /// caller and are not cached.
    pub fn get_or_parse<F>(
        &self,
        ord: u32,
        decode: F,
    ) -> Result<Arc<VisibilityExpr>, Arc<LabelParseError>>
    where
        F: FnOnce() -> Vec<u8>,
    {
        self.cache
            .try_get_with(ord, || VisibilityExpr::parse_bytes(&decode()).map(Arc::new))
    }

    pub fn clear(&self) {
        self.cache.invalidate_all();
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for LabelCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
