//! Write-side helper: attach visibility labels to a document being indexed.
//!
//! A pure data transformation, not part of the decision engine. Each label
//! becomes a dictionary-encoded sorted value (what the read path decodes)
//! plus a stored copy under the same field name.

use crate::access::{DISCOVER_FIELD, READ_FIELD};
use crate::error::LabelParseError;
use crate::memory::Document;
use crate::visibility::VisibilityExpr;

/// Appends read/discover label fields to documents. Labels are validated by
/// parsing at write time, so malformed visibility strings fail at index
/// time rather than at query time.
#[derive(Clone, Debug)]
pub struct VisibilityWriter {
    read_field: String,
    discover_field: String,
}

impl Default for VisibilityWriter {
    fn default() -> Self {
        Self {
            read_field: READ_FIELD.to_owned(),
            discover_field: DISCOVER_FIELD.to_owned(),
        }
    }
}

impl VisibilityWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fields(
        read_field: impl Into<String>,
        discover_field: impl Into<String>,
    ) -> Self {
        Self {
            read_field: read_field.into(),
            discover_field: discover_field.into(),
        }
    }

    pub fn add_read_label(&self, doc: Document, label: &str) -> Result<Document, LabelParseError> {
        add_label(doc, &self.read_field, label)
    }

    pub fn add_discover_label(
        &self,
        doc: Document,
        label: &str,
    ) -> Result<Document, LabelParseError> {
        add_label(doc, &self.discover_field, label)
    }
}

fn add_label(doc: Document, field: &str, label: &str) -> Result<Document, LabelParseError> {
    VisibilityExpr::parse(label)?;
    Ok(doc
        .sorted(field, label.as_bytes().to_vec())
        .stored_bytes(field, label.as_bytes().to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::AccessControlConfig;
    use crate::authorizations::Authorizations;
    use crate::memory::MemoryIndexBuilder;
    use crate::segment::Segment;

    #[test]
    fn labels_land_in_sorted_and_stored_form() {
        let writer = VisibilityWriter::new();
        let doc = writer
            .add_discover_label(
                writer
                    .add_read_label(Document::new().keyword("body", "text"), "(a&b)|d")
                    .unwrap(),
                "d1",
            )
            .unwrap();

        let mut builder = MemoryIndexBuilder::new();
        builder.add_document(doc);
        let index = builder.build();

        let read = index.sorted(READ_FIELD).unwrap();
        let ord = read.ord(0).unwrap();
        assert_eq!(read.lookup_ord(ord), b"(a&b)|d");
        assert!(index.sorted(DISCOVER_FIELD).unwrap().ord(0).is_some());
    }

    #[test]
    fn malformed_labels_fail_at_write_time() {
        let writer = VisibilityWriter::new();
        writer
            .add_read_label(Document::new(), "a&b|c")
            .unwrap_err();
    }

    #[test]
    fn custom_field_names_flow_through_binding() {
        let writer = VisibilityWriter::with_fields("_r_", "_d_");
        let doc = writer.add_read_label(Document::new(), "r1").unwrap();
        let mut builder = MemoryIndexBuilder::new();
        builder.add_document(doc);
        let index = builder.build();

        let config = AccessControlConfig::new(
            Authorizations::new(["r1"]),
            Authorizations::empty(),
            Vec::<String>::new(),
        )
        .with_label_fields("_r_", "_d_");
        let acl = config.bind(&index).unwrap();
        assert!(acl.read_access(0));
    }
}
