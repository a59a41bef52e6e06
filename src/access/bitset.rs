use bit_set::BitSet;
use fnv::FnvHashSet;
use tracing::{debug, warn};

use crate::authorizations::Authorizations;
use crate::error::{Error, Result};
use crate::segment::{DocId, Segment};
use crate::visibility::VisibilityExpr;

use super::{AccessControl, AccessControlConfig};

/// Bitset strategy: at bind time, walk the label field's term dictionary
/// once, evaluate every distinct label, and union the postings of satisfied
/// labels into one bitmap per channel. Every access is then a bitmap test.
///
/// Bind cost is O(distinct labels × postings length); amortize it by reusing
/// the bound policy across many lookups or as a query-time filter.
pub struct BitsetAccess {
    read_bits: Option<BitSet>,
    discover_bits: Option<BitSet>,
    discoverable_fields: FnvHashSet<String>,
}

impl BitsetAccess {
    pub(super) fn bind(config: &AccessControlConfig, segment: &dyn Segment) -> Result<Self> {
        let union_auths = Authorizations::union(&config.read_auths, &config.discover_auths);
        Ok(Self {
            read_bits: channel_bits(segment, &config.read_field, &config.read_auths, config)?,
            discover_bits: channel_bits(segment, &config.discover_field, &union_auths, config)?,
            discoverable_fields: config.discoverable_fields.clone(),
        })
    }
}

/// Build one channel's visibility bitmap.
///
/// An empty authorization set can never satisfy a label, so it
/// short-circuits to `None` without walking the dictionary, as does a
/// segment with no label terms for the field.
fn channel_bits(
    segment: &dyn Segment,
    field: &str,
    auths: &Authorizations,
    config: &AccessControlConfig,
) -> Result<Option<BitSet>> {
    if auths.is_empty() {
        return Ok(None);
    }
    let Some(mut cursor) = segment.terms(field) else {
        if config.require_label_columns {
            return Err(Error::MissingRequiredColumn(field.to_owned()));
        }
        return Ok(None);
    };

    let mut bits = BitSet::with_capacity(segment.max_doc() as usize);
    let mut terms = 0usize;
    let mut satisfied = 0usize;
    while cursor.advance() {
        terms += 1;
        let expr = match VisibilityExpr::parse_bytes(cursor.term()) {
            Ok(expr) => expr,
            Err(err) => {
                warn!(%err, field, "unparseable visibility term, denying its documents");
                continue;
            }
        };
        if auths.satisfies(&expr) {
            satisfied += 1;
            for doc in cursor.docs() {
                if segment.is_live(doc) {
                    bits.insert(doc as usize);
                }
            }
        }
    }
    debug!(
        field,
        terms,
        satisfied,
        visible_docs = bits.len(),
        "built visibility bitmap"
    );
    Ok(Some(bits))
}

impl AccessControl for BitsetAccess {
    fn read_access(&self, doc: DocId) -> bool {
        self.read_bits
            .as_ref()
            .is_some_and(|bits| bits.contains(doc as usize))
    }

    fn discover_access(&self, doc: DocId) -> bool {
        self.discover_bits
            .as_ref()
            .is_some_and(|bits| bits.contains(doc as usize))
    }

    fn can_discover_field(&self, field: &str) -> bool {
        self.discoverable_fields.contains(field)
    }
}
