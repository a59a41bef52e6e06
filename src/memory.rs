//! In-memory reference segment.
//!
//! A small columnar/postings store implementing [`Segment`], used by the
//! integration tests and handy for exercising the secure view without a
//! storage backend. Not an indexing engine: documents are added once, the
//! builder freezes them into immutable columns, and the result is
//! read-only.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use fnv::{FnvHashMap, FnvHashSet};

use crate::segment::{
    BinaryColumn, DocId, FieldValue, NumericColumn, Segment, SortedColumn, SortedSetColumn,
    StoredFieldVisitor, TermCursor,
};

/// A stored field value owned by the index.
#[derive(Clone, Debug, PartialEq)]
pub enum StoredValue {
    Str(String),
    Bytes(Vec<u8>),
    Int(i64),
    Double(f64),
}

impl StoredValue {
    fn as_field_value(&self) -> FieldValue<'_> {
        match self {
            Self::Str(s) => FieldValue::Str(s),
            Self::Bytes(b) => FieldValue::Bytes(b),
            Self::Int(i) => FieldValue::Int(*i),
            Self::Double(d) => FieldValue::Double(*d),
        }
    }
}

#[derive(Clone, Debug)]
enum Field {
    /// Indexed term, optionally with a stored copy.
    Keyword {
        name: String,
        value: String,
        stored: bool,
    },
    Stored {
        name: String,
        value: StoredValue,
    },
    Numeric {
        name: String,
        value: i64,
    },
    Binary {
        name: String,
        value: Vec<u8>,
    },
    /// Single-valued dictionary-encoded field (at most one per name per doc).
    Sorted {
        name: String,
        value: Vec<u8>,
    },
    /// Multi-valued dictionary-encoded field (may repeat).
    SortedSet {
        name: String,
        value: Vec<u8>,
    },
}

/// One document's fields, built up before insertion.
#[derive(Clone, Debug, Default)]
pub struct Document {
    fields: Vec<Field>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexed and stored string field.
    pub fn keyword(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(Field::Keyword {
            name: name.into(),
            value: value.into(),
            stored: true,
        });
        self
    }

    /// Indexed-only string field (no stored copy).
    pub fn keyword_unstored(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(Field::Keyword {
            name: name.into(),
            value: value.into(),
            stored: false,
        });
        self
    }

    pub fn stored_str(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(Field::Stored {
            name: name.into(),
            value: StoredValue::Str(value.into()),
        });
        self
    }

    pub fn stored_bytes(mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.fields.push(Field::Stored {
            name: name.into(),
            value: StoredValue::Bytes(value.into()),
        });
        self
    }

    pub fn numeric(mut self, name: impl Into<String>, value: i64) -> Self {
        self.fields.push(Field::Numeric {
            name: name.into(),
            value,
        });
        self
    }

    pub fn binary(mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.fields.push(Field::Binary {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn sorted(mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.fields.push(Field::Sorted {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn sorted_set(mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.fields.push(Field::SortedSet {
            name: name.into(),
            value: value.into(),
        });
        self
    }
}

#[derive(Default)]
pub struct MemoryIndexBuilder {
    docs: Vec<Document>,
    deleted: FnvHashSet<DocId>,
}

impl MemoryIndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_document(&mut self, doc: Document) -> DocId {
        self.docs.push(doc);
        (self.docs.len() - 1) as DocId
    }

    /// Mark a document deleted; it stays in the id space but reads dead.
    pub fn delete(&mut self, doc: DocId) {
        self.deleted.insert(doc);
    }

    pub fn build(self) -> MemoryIndex {
        let max_doc = self.docs.len() as DocId;

        let mut stored: Vec<Vec<(String, StoredValue)>> = vec![Vec::new(); self.docs.len()];
        let mut numeric_raw: FnvHashMap<String, FnvHashMap<DocId, i64>> = FnvHashMap::default();
        let mut binary_raw: FnvHashMap<String, FnvHashMap<DocId, Vec<u8>>> = FnvHashMap::default();
        let mut sorted_raw: FnvHashMap<String, FnvHashMap<DocId, Vec<u8>>> = FnvHashMap::default();
        let mut sorted_set_raw: FnvHashMap<String, FnvHashMap<DocId, Vec<Vec<u8>>>> =
            FnvHashMap::default();
        let mut postings_raw: FnvHashMap<String, BTreeMap<Vec<u8>, BTreeSet<DocId>>> =
            FnvHashMap::default();
        let mut keyword_fields: FnvHashSet<String> = FnvHashSet::default();

        for (id, doc) in self.docs.into_iter().enumerate() {
            let id = id as DocId;
            for field in doc.fields {
                match field {
                    Field::Keyword {
                        name,
                        value,
                        stored: keep,
                    } => {
                        postings_raw
                            .entry(name.clone())
                            .or_default()
                            .entry(value.clone().into_bytes())
                            .or_default()
                            .insert(id);
                        keyword_fields.insert(name.clone());
                        if keep {
                            stored[id as usize].push((name, StoredValue::Str(value)));
                        }
                    }
                    Field::Stored { name, value } => {
                        stored[id as usize].push((name, value));
                    }
                    Field::Numeric { name, value } => {
                        numeric_raw.entry(name).or_default().insert(id, value);
                    }
                    Field::Binary { name, value } => {
                        binary_raw.entry(name).or_default().insert(id, value);
                    }
                    Field::Sorted { name, value } => {
                        // single-valued: a later add replaces an earlier one
                        sorted_raw.entry(name).or_default().insert(id, value);
                    }
                    Field::SortedSet { name, value } => {
                        sorted_set_raw
                            .entry(name)
                            .or_default()
                            .entry(id)
                            .or_default()
                            .push(value);
                    }
                }
            }
        }

        // norms: 1 for each document carrying the keyword field
        let mut norms = FnvHashMap::default();
        for field in &keyword_fields {
            let mut values = vec![0i64; max_doc as usize];
            if let Some(terms) = postings_raw.get(field) {
                for docs in terms.values() {
                    for &doc in docs {
                        values[doc as usize] = 1;
                    }
                }
            }
            norms.insert(
                field.clone(),
                Arc::new(MemNumericColumn { values }) as Arc<dyn NumericColumn>,
            );
        }

        let mut numeric = FnvHashMap::default();
        for (field, raw) in numeric_raw {
            let mut values = vec![0i64; max_doc as usize];
            for (doc, value) in raw {
                values[doc as usize] = value;
            }
            numeric.insert(
                field,
                Arc::new(MemNumericColumn { values }) as Arc<dyn NumericColumn>,
            );
        }

        let mut binary = FnvHashMap::default();
        for (field, raw) in binary_raw {
            let mut values = vec![Vec::new(); max_doc as usize];
            for (doc, value) in raw {
                values[doc as usize] = value;
            }
            binary.insert(
                field,
                Arc::new(MemBinaryColumn { values }) as Arc<dyn BinaryColumn>,
            );
        }

        let mut sorted = FnvHashMap::default();
        for (field, raw) in sorted_raw {
            let dict: Vec<Vec<u8>> = raw
                .values()
                .cloned()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            let mut ords = vec![None; max_doc as usize];
            for (doc, value) in &raw {
                let ord = dict.binary_search(value).expect("value is in dictionary");
                ords[*doc as usize] = Some(ord as u32);
            }
            // sorted columns double as term postings, so label columns are
            // walkable by the bitset strategy
            let field_postings = postings_raw.entry(field.clone()).or_default();
            for (doc, value) in raw {
                field_postings.entry(value).or_default().insert(doc);
            }
            sorted.insert(
                field,
                Arc::new(MemSortedColumn { dict, ords }) as Arc<dyn SortedColumn>,
            );
        }

        let mut sorted_set = FnvHashMap::default();
        for (field, raw) in sorted_set_raw {
            let dict: Vec<Vec<u8>> = raw
                .values()
                .flatten()
                .cloned()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            let mut ords: Vec<Vec<u64>> = vec![Vec::new(); max_doc as usize];
            for (doc, values) in raw {
                let mut doc_ords: Vec<u64> = values
                    .iter()
                    .map(|v| dict.binary_search(v).expect("value is in dictionary") as u64)
                    .collect();
                doc_ords.sort_unstable();
                doc_ords.dedup();
                ords[doc as usize] = doc_ords;
            }
            sorted_set.insert(
                field,
                Arc::new(MemSortedSetColumn { dict, ords }) as Arc<dyn SortedSetColumn>,
            );
        }

        let postings = postings_raw
            .into_iter()
            .map(|(field, terms)| {
                let list: Vec<(Vec<u8>, Vec<DocId>)> = terms
                    .into_iter()
                    .map(|(term, docs)| (term, docs.into_iter().collect()))
                    .collect();
                (field, list)
            })
            .collect();

        MemoryIndex {
            max_doc,
            deleted: self.deleted,
            stored,
            numeric,
            binary,
            sorted,
            sorted_set,
            norms,
            postings,
        }
    }
}

/// The frozen index. All lookups are immutable.
pub struct MemoryIndex {
    max_doc: DocId,
    deleted: FnvHashSet<DocId>,
    stored: Vec<Vec<(String, StoredValue)>>,
    numeric: FnvHashMap<String, Arc<dyn NumericColumn>>,
    binary: FnvHashMap<String, Arc<dyn BinaryColumn>>,
    sorted: FnvHashMap<String, Arc<dyn SortedColumn>>,
    sorted_set: FnvHashMap<String, Arc<dyn SortedSetColumn>>,
    norms: FnvHashMap<String, Arc<dyn NumericColumn>>,
    postings: FnvHashMap<String, Vec<(Vec<u8>, Vec<DocId>)>>,
}

impl Segment for MemoryIndex {
    fn max_doc(&self) -> DocId {
        self.max_doc
    }

    fn is_live(&self, doc: DocId) -> bool {
        doc < self.max_doc && !self.deleted.contains(&doc)
    }

    fn stored_fields(&self, doc: DocId, visitor: &mut dyn StoredFieldVisitor) {
        let Some(fields) = self.stored.get(doc as usize) else {
            return;
        };
        for (name, value) in fields {
            if visitor.needs_field(name) {
                visitor.visit_field(name, value.as_field_value());
            }
        }
    }

    fn numeric(&self, field: &str) -> Option<Arc<dyn NumericColumn>> {
        self.numeric.get(field).cloned()
    }

    fn binary(&self, field: &str) -> Option<Arc<dyn BinaryColumn>> {
        self.binary.get(field).cloned()
    }

    fn sorted(&self, field: &str) -> Option<Arc<dyn SortedColumn>> {
        self.sorted.get(field).cloned()
    }

    fn sorted_set(&self, field: &str) -> Option<Arc<dyn SortedSetColumn>> {
        self.sorted_set.get(field).cloned()
    }

    fn norms(&self, field: &str) -> Option<Arc<dyn NumericColumn>> {
        self.norms.get(field).cloned()
    }

    fn terms(&self, field: &str) -> Option<Box<dyn TermCursor + '_>> {
        let postings = self.postings.get(field)?;
        Some(Box::new(MemTermCursor { postings, pos: 0 }))
    }
}

struct MemNumericColumn {
    values: Vec<i64>,
}

impl NumericColumn for MemNumericColumn {
    fn get(&self, doc: DocId) -> i64 {
        self.values.get(doc as usize).copied().unwrap_or(0)
    }
}

struct MemBinaryColumn {
    values: Vec<Vec<u8>>,
}

impl BinaryColumn for MemBinaryColumn {
    fn get(&self, doc: DocId) -> &[u8] {
        self.values.get(doc as usize).map_or(&[], Vec::as_slice)
    }
}

struct MemSortedColumn {
    dict: Vec<Vec<u8>>,
    ords: Vec<Option<u32>>,
}

impl SortedColumn for MemSortedColumn {
    fn ord(&self, doc: DocId) -> Option<u32> {
        self.ords.get(doc as usize).copied().flatten()
    }

    fn lookup_ord(&self, ord: u32) -> &[u8] {
        &self.dict[ord as usize]
    }

    fn value_count(&self) -> u32 {
        self.dict.len() as u32
    }
}

struct MemSortedSetColumn {
    dict: Vec<Vec<u8>>,
    ords: Vec<Vec<u64>>,
}

impl SortedSetColumn for MemSortedSetColumn {
    fn ords(&self, doc: DocId) -> Box<dyn Iterator<Item = u64> + '_> {
        match self.ords.get(doc as usize) {
            Some(ords) => Box::new(ords.iter().copied()),
            None => Box::new(std::iter::empty()),
        }
    }

    fn lookup_ord(&self, ord: u64) -> &[u8] {
        &self.dict[ord as usize]
    }

    fn value_count(&self) -> u64 {
        self.dict.len() as u64
    }
}

/// Cursor positioned before the first term; `pos` is one past the current
/// entry once `advance` has returned true.
struct MemTermCursor<'a> {
    postings: &'a [(Vec<u8>, Vec<DocId>)],
    pos: usize,
}

impl TermCursor for MemTermCursor<'_> {
    fn advance(&mut self) -> bool {
        if self.pos < self.postings.len() {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn term(&self) -> &[u8] {
        &self.postings[self.pos - 1].0
    }

    fn docs(&self) -> Box<dyn Iterator<Item = DocId> + '_> {
        Box::new(self.postings[self.pos - 1].1.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_doc_index() -> MemoryIndex {
        let mut builder = MemoryIndexBuilder::new();
        builder.add_document(
            Document::new()
                .keyword("tag", "alpha")
                .numeric("count", 7)
                .binary("payload", b"zero".to_vec())
                .sorted("city", b"oslo".to_vec())
                .sorted_set("set", b"x".to_vec())
                .sorted_set("set", b"y".to_vec()),
        );
        builder.add_document(
            Document::new()
                .keyword("tag", "beta")
                .sorted("city", b"bergen".to_vec()),
        );
        builder.build()
    }

    #[test]
    fn columns_round_trip() {
        let index = two_doc_index();
        assert_eq!(index.max_doc(), 2);

        let count = index.numeric("count").unwrap();
        assert_eq!(count.get(0), 7);
        assert_eq!(count.get(1), 0);

        let payload = index.binary("payload").unwrap();
        assert_eq!(payload.get(0), b"zero");
        assert_eq!(payload.get(1), b"");

        let city = index.sorted("city").unwrap();
        assert_eq!(city.value_count(), 2);
        let ord0 = city.ord(0).unwrap();
        assert_eq!(city.lookup_ord(ord0), b"oslo");
        // dictionary order: bergen < oslo
        assert_eq!(index.sorted("city").unwrap().ord(1), Some(0));

        let set = index.sorted_set("set").unwrap();
        let values: Vec<&[u8]> = set.ords(0).map(|ord| set.lookup_ord(ord)).collect();
        assert_eq!(values, vec![b"x".as_slice(), b"y".as_slice()]);
        assert_eq!(set.ords(1).count(), 0);
    }

    #[test]
    fn sorted_fields_expose_term_postings() {
        let index = two_doc_index();
        let mut cursor = index.terms("city").unwrap();
        let mut seen = Vec::new();
        while cursor.advance() {
            seen.push((cursor.term().to_vec(), cursor.docs().collect::<Vec<_>>()));
        }
        assert_eq!(
            seen,
            vec![
                (b"bergen".to_vec(), vec![1]),
                (b"oslo".to_vec(), vec![0]),
            ]
        );
    }

    #[test]
    fn keyword_fields_have_norms() {
        let index = two_doc_index();
        let norms = index.norms("tag").unwrap();
        assert_eq!(norms.get(0), 1);
        assert_eq!(norms.get(1), 1);
        assert!(index.norms("count").is_none());
    }

    #[test]
    fn deleted_docs_read_dead() {
        let mut builder = MemoryIndexBuilder::new();
        builder.add_document(Document::new().keyword("tag", "a"));
        let doomed = builder.add_document(Document::new().keyword("tag", "b"));
        builder.delete(doomed);
        let index = builder.build();
        assert!(index.is_live(0));
        assert!(!index.is_live(doomed));
        assert!(!index.is_live(99));
    }
}
