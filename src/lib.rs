//! Document- and field-level access control over a read-only document
//! index.
//!
//! Documents carry up to two visibility labels — boolean expressions over
//! authorization tokens, e.g. `(a&b)|d` — written at index time under the
//! `_read_` and `_discover_` fields. At query time a caller presents its
//! read and discover authorization sets; this crate decides, per document
//! and per accessed value, whether the caller sees everything ("read"), a
//! restricted field subset ("discover"), or nothing.
//!
//! The pieces:
//! - [`VisibilityExpr`]: the label algebra (parse + evaluate).
//! - [`Authorizations`]: the token set a caller holds.
//! - [`AccessControlConfig`]: the unbound policy template; binding it to a
//!   segment yields an [`AccessControl`] using either the value-cache or
//!   the bitset strategy.
//! - [`SecureSegment`]: the decorator gating every read path of a
//!   [`segment::Segment`] through a bound policy.
//!
//! NOTE: term dictionaries are not filtered by the secure view — only the
//! documents posted under each term are. Callers enumerating terms (for
//! type-ahead and the like) must check that a term actually yields a
//! visible document, or accept leaking vocabulary.

pub mod access;
pub mod cache;
pub mod error;
pub mod memory;
pub mod secure;
pub mod segment;
pub mod visibility;
pub mod write;

mod authorizations;

pub use access::{
    AccessControl, AccessControlConfig, AccessKind, Strategy, DISCOVER_FIELD, READ_FIELD,
};
pub use authorizations::Authorizations;
pub use error::{Error, LabelParseError, LabelParseErrorKind, Result};
pub use secure::SecureSegment;
pub use visibility::VisibilityExpr;
pub use write::VisibilityWriter;
