//! Abstract read interfaces of the underlying document store.
//!
//! The store itself (on-disk format, encodings, query execution) is outside
//! this crate. The access-decision engine only sees a segment as a document
//! id space `[0, max_doc)` plus the accessors below.

use std::sync::Arc;

/// Document id local to one segment.
pub type DocId = u32;

/// A stored field value, borrowed from the store for the duration of one
/// visitor callback.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FieldValue<'a> {
    Str(&'a str),
    Bytes(&'a [u8]),
    Int(i64),
    Double(f64),
}

/// Callback interface for stored-field enumeration.
///
/// Implementations of [`Segment::stored_fields`] must call `needs_field`
/// before each field and only invoke `visit_field` when it returned true.
/// The secure view relies on that ordering to redact fields.
pub trait StoredFieldVisitor {
    fn needs_field(&mut self, field: &str) -> bool;
    fn visit_field(&mut self, field: &str, value: FieldValue<'_>);
}

/// Scalar per-document column. `0` is the missing sentinel.
pub trait NumericColumn: Send + Sync {
    fn get(&self, doc: DocId) -> i64;
}

/// Binary per-document column. Empty bytes is the missing sentinel.
pub trait BinaryColumn: Send + Sync {
    fn get(&self, doc: DocId) -> &[u8];
}

/// Dictionary-encoded single-valued column: per document at most one
/// ordinal, with an ordinal -> bytes dictionary. Label columns have this
/// shape, which is what lets the decision cache key on the ordinal.
pub trait SortedColumn: Send + Sync {
    /// The ordinal for `doc`, or `None` when the document has no value.
    fn ord(&self, doc: DocId) -> Option<u32>;

    /// The bytes for an ordinal previously returned by this column.
    fn lookup_ord(&self, ord: u32) -> &[u8];

    /// Number of distinct values in the dictionary.
    fn value_count(&self) -> u32;
}

/// Dictionary-encoded multi-valued column. An empty ordinal iterator is the
/// missing sentinel.
pub trait SortedSetColumn: Send + Sync {
    fn ords(&self, doc: DocId) -> Box<dyn Iterator<Item = u64> + '_>;

    fn lookup_ord(&self, ord: u64) -> &[u8];

    fn value_count(&self) -> u64;
}

/// Forward-only walk over one field's term dictionary and postings.
///
/// `term` and `docs` address the current term and may only be called after
/// `advance` has returned true.
pub trait TermCursor {
    /// Move to the next term; false when the dictionary is exhausted.
    fn advance(&mut self) -> bool;

    fn term(&self) -> &[u8];

    /// Document ids posting the current term, ascending.
    fn docs(&self) -> Box<dyn Iterator<Item = DocId> + '_>;
}

/// One immutable unit of the document store.
pub trait Segment: Send + Sync {
    fn max_doc(&self) -> DocId;

    /// Store-level liveness (deletions). Access control layers on top.
    fn is_live(&self, doc: DocId) -> bool;

    /// Enumerate `doc`'s stored fields through `visitor`.
    fn stored_fields(&self, doc: DocId, visitor: &mut dyn StoredFieldVisitor);

    fn numeric(&self, field: &str) -> Option<Arc<dyn NumericColumn>>;

    fn binary(&self, field: &str) -> Option<Arc<dyn BinaryColumn>>;

    fn sorted(&self, field: &str) -> Option<Arc<dyn SortedColumn>>;

    fn sorted_set(&self, field: &str) -> Option<Arc<dyn SortedSetColumn>>;

    fn norms(&self, field: &str) -> Option<Arc<dyn NumericColumn>>;

    /// Term dictionary walk for one field, or `None` when the field has no
    /// indexed terms.
    fn terms(&self, field: &str) -> Option<Box<dyn TermCursor + '_>>;
}
