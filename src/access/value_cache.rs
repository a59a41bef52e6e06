use std::sync::Arc;

use fnv::FnvHashSet;
use tracing::warn;

use crate::authorizations::Authorizations;
use crate::cache::LabelCache;
use crate::error::{Error, Result};
use crate::segment::{DocId, Segment, SortedColumn};

use super::{AccessControl, AccessControlConfig};

/// Value-cache strategy: per access, decode the document's label ordinal
/// from the bound label column and resolve the parsed expression through a
/// per-field [`LabelCache`].
///
/// Negligible bind cost; suited to random per-document lookups.
pub struct ValueCacheAccess {
    read_auths: Authorizations,
    union_auths: Authorizations,
    discoverable_fields: FnvHashSet<String>,
    read_column: Option<Arc<dyn SortedColumn>>,
    discover_column: Option<Arc<dyn SortedColumn>>,
    read_cache: LabelCache,
    discover_cache: LabelCache,
}

impl ValueCacheAccess {
    pub(super) fn bind(config: &AccessControlConfig, segment: &dyn Segment) -> Result<Self> {
        let read_column = require_column(segment, &config.read_field, config)?;
        let discover_column = require_column(segment, &config.discover_field, config)?;

        Ok(Self {
            read_auths: config.read_auths.clone(),
            union_auths: Authorizations::union(&config.read_auths, &config.discover_auths),
            discoverable_fields: config.discoverable_fields.clone(),
            read_column,
            discover_column,
            read_cache: LabelCache::new(config.cache_capacity),
            discover_cache: LabelCache::new(config.cache_capacity),
        })
    }

    /// One channel's decision: no column or no value means no access; an
    /// undecodable stored label denies and is logged, never fails open.
    fn channel_access(
        column: Option<&Arc<dyn SortedColumn>>,
        cache: &LabelCache,
        auths: &Authorizations,
        doc: DocId,
    ) -> bool {
        let Some(column) = column else {
            return false;
        };
        let Some(ord) = column.ord(doc) else {
            return false;
        };
        match cache.get_or_parse(ord, || column.lookup_ord(ord).to_vec()) {
            Ok(expr) => auths.satisfies(&expr),
            Err(err) => {
                warn!(%err, ord, doc, "undecodable visibility label, denying access");
                false
            }
        }
    }
}

fn require_column(
    segment: &dyn Segment,
    field: &str,
    config: &AccessControlConfig,
) -> Result<Option<Arc<dyn SortedColumn>>> {
    match segment.sorted(field) {
        Some(column) => Ok(Some(column)),
        None if config.require_label_columns => {
            Err(Error::MissingRequiredColumn(field.to_owned()))
        }
        None => Ok(None),
    }
}

impl AccessControl for ValueCacheAccess {
    fn read_access(&self, doc: DocId) -> bool {
        Self::channel_access(
            self.read_column.as_ref(),
            &self.read_cache,
            &self.read_auths,
            doc,
        )
    }

    fn discover_access(&self, doc: DocId) -> bool {
        // discover is a narrowed view, not a separate grant universe: the
        // label may be satisfied with tokens from either channel
        Self::channel_access(
            self.discover_column.as_ref(),
            &self.discover_cache,
            &self.union_auths,
            doc,
        )
    }

    fn can_discover_field(&self, field: &str) -> bool {
        self.discoverable_fields.contains(field)
    }
}
