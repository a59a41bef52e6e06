//! The secure view: a decorator gating every read path of a segment
//! through a bound access policy.
//!
//! A denied document leaks nothing: its liveness bit reads dead, its stored
//! fields are never visited (or filtered to the discoverable subset), and
//! every column answers the type's missing sentinel, indistinguishable from
//! a genuinely absent value.
//!
//! One caveat is inherited from the underlying store: [`Segment::terms`]
//! does **not** filter the term dictionary itself, only the document ids
//! posted under each term. Enumerating terms (e.g. for type-ahead) can leak
//! vocabulary, but never document content or identity beyond existence.

use std::sync::Arc;

use crate::access::{AccessControl, AccessControlConfig, AccessKind};
use crate::error::Result;
use crate::segment::{
    BinaryColumn, DocId, FieldValue, NumericColumn, Segment, SortedColumn, SortedSetColumn,
    StoredFieldVisitor, TermCursor,
};

/// A segment wrapped with an access policy. Implements [`Segment`] itself,
/// so it drops in wherever the raw segment was read.
pub struct SecureSegment<S> {
    inner: S,
    acl: Arc<dyn AccessControl>,
}

impl<S: Segment> SecureSegment<S> {
    /// Bind `config` to `inner` and wrap it. The secure view is immutable
    /// for the segment's lifetime.
    pub fn bind(inner: S, config: &AccessControlConfig) -> Result<Self> {
        let acl = config.bind(&inner)?;
        Ok(Self { inner, acl })
    }

    /// Wrap with an already-bound policy. The policy must have been bound
    /// against this same segment.
    pub fn with_access_control(inner: S, acl: Arc<dyn AccessControl>) -> Self {
        Self { inner, acl }
    }

    pub fn access_control(&self) -> &Arc<dyn AccessControl> {
        &self.acl
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: Segment> Segment for SecureSegment<S> {
    fn max_doc(&self) -> DocId {
        self.inner.max_doc()
    }

    fn is_live(&self, doc: DocId) -> bool {
        self.inner.is_live(doc) && self.acl.has_access(AccessKind::Existence, doc)
    }

    fn stored_fields(&self, doc: DocId, visitor: &mut dyn StoredFieldVisitor) {
        if self.acl.has_access(AccessKind::DocumentFetchRead, doc) {
            self.inner.stored_fields(doc, visitor);
            return;
        }
        if self.acl.has_access(AccessKind::DocumentFetchDiscover, doc) {
            let mut filtered = DiscoverFieldVisitor {
                acl: &*self.acl,
                inner: visitor,
            };
            self.inner.stored_fields(doc, &mut filtered);
        }
        // denied on both channels: the visitor is never invoked
    }

    fn numeric(&self, field: &str) -> Option<Arc<dyn NumericColumn>> {
        self.inner.numeric(field).map(|inner| {
            Arc::new(SecureNumeric {
                inner,
                acl: self.acl.clone(),
                kind: AccessKind::ScalarValue,
            }) as Arc<dyn NumericColumn>
        })
    }

    fn binary(&self, field: &str) -> Option<Arc<dyn BinaryColumn>> {
        self.inner.binary(field).map(|inner| {
            Arc::new(SecureBinary {
                inner,
                acl: self.acl.clone(),
            }) as Arc<dyn BinaryColumn>
        })
    }

    fn sorted(&self, field: &str) -> Option<Arc<dyn SortedColumn>> {
        self.inner.sorted(field).map(|inner| {
            Arc::new(SecureSorted {
                inner,
                acl: self.acl.clone(),
            }) as Arc<dyn SortedColumn>
        })
    }

    fn sorted_set(&self, field: &str) -> Option<Arc<dyn SortedSetColumn>> {
        self.inner.sorted_set(field).map(|inner| {
            Arc::new(SecureSortedSet {
                inner,
                acl: self.acl.clone(),
            }) as Arc<dyn SortedSetColumn>
        })
    }

    fn norms(&self, field: &str) -> Option<Arc<dyn NumericColumn>> {
        self.inner.norms(field).map(|inner| {
            Arc::new(SecureNumeric {
                inner,
                acl: self.acl.clone(),
                kind: AccessKind::NormValue,
            }) as Arc<dyn NumericColumn>
        })
    }

    fn terms(&self, field: &str) -> Option<Box<dyn TermCursor + '_>> {
        let inner = self.inner.terms(field)?;
        Some(Box::new(SecureTermCursor {
            inner,
            segment: &self.inner,
            acl: self.acl.clone(),
        }))
    }
}

/// Stored-field visitor for discover-only documents: skips every field
/// outside the discoverable set, forwards allowed values unmodified.
struct DiscoverFieldVisitor<'a> {
    acl: &'a dyn AccessControl,
    inner: &'a mut dyn StoredFieldVisitor,
}

impl StoredFieldVisitor for DiscoverFieldVisitor<'_> {
    fn needs_field(&mut self, field: &str) -> bool {
        self.acl.can_discover_field(field) && self.inner.needs_field(field)
    }

    fn visit_field(&mut self, field: &str, value: FieldValue<'_>) {
        self.inner.visit_field(field, value);
    }
}

struct SecureNumeric {
    inner: Arc<dyn NumericColumn>,
    acl: Arc<dyn AccessControl>,
    kind: AccessKind,
}

impl NumericColumn for SecureNumeric {
    fn get(&self, doc: DocId) -> i64 {
        if self.acl.has_access(self.kind, doc) {
            self.inner.get(doc)
        } else {
            0
        }
    }
}

struct SecureBinary {
    inner: Arc<dyn BinaryColumn>,
    acl: Arc<dyn AccessControl>,
}

impl BinaryColumn for SecureBinary {
    fn get(&self, doc: DocId) -> &[u8] {
        if self.acl.has_access(AccessKind::BinaryValue, doc) {
            self.inner.get(doc)
        } else {
            &[]
        }
    }
}

struct SecureSorted {
    inner: Arc<dyn SortedColumn>,
    acl: Arc<dyn AccessControl>,
}

impl SortedColumn for SecureSorted {
    fn ord(&self, doc: DocId) -> Option<u32> {
        if self.acl.has_access(AccessKind::SortedValue, doc) {
            self.inner.ord(doc)
        } else {
            None
        }
    }

    // ordinals are only reachable through `ord`, which is gated
    fn lookup_ord(&self, ord: u32) -> &[u8] {
        self.inner.lookup_ord(ord)
    }

    fn value_count(&self) -> u32 {
        self.inner.value_count()
    }
}

struct SecureSortedSet {
    inner: Arc<dyn SortedSetColumn>,
    acl: Arc<dyn AccessControl>,
}

impl SortedSetColumn for SecureSortedSet {
    fn ords(&self, doc: DocId) -> Box<dyn Iterator<Item = u64> + '_> {
        if self.acl.has_access(AccessKind::SortedSetValue, doc) {
            self.inner.ords(doc)
        } else {
            Box::new(std::iter::empty())
        }
    }

    fn lookup_ord(&self, ord: u64) -> &[u8] {
        self.inner.lookup_ord(ord)
    }

    fn value_count(&self) -> u64 {
        self.inner.value_count()
    }
}

/// Term cursor yielding only documents that pass the existence check. The
/// terms themselves pass through unfiltered (see the module caveat).
struct SecureTermCursor<'a> {
    inner: Box<dyn TermCursor + 'a>,
    segment: &'a (dyn Segment + 'a),
    acl: Arc<dyn AccessControl>,
}

impl TermCursor for SecureTermCursor<'_> {
    fn advance(&mut self) -> bool {
        self.inner.advance()
    }

    fn term(&self) -> &[u8] {
        self.inner.term()
    }

    fn docs(&self) -> Box<dyn Iterator<Item = DocId> + '_> {
        let segment = self.segment;
        let acl = self.acl.clone();
        Box::new(self.inner.docs().filter(move |&doc| {
            segment.is_live(doc) && acl.has_access(AccessKind::Existence, doc)
        }))
    }
}
