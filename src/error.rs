use std::ops::Range;

use thiserror::Error;

/// Failure to parse a visibility label.
///
/// `span` is the byte range of the offending input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid visibility label at {}..{}: {kind}", .span.start, .span.end)]
pub struct LabelParseError {
    pub span: Range<usize>,
    pub kind: LabelParseErrorKind,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LabelParseErrorKind {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("empty label")]
    Empty,

    #[error("label is not valid UTF-8")]
    NotUtf8,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    InvalidLabel(#[from] LabelParseError),

    /// A policy was bound against a segment lacking a label column the
    /// caller declared as required. Without that declaration a missing
    /// column simply means "no label present" and denies the channel.
    #[error("required label column `{0}` is missing from the segment")]
    MissingRequiredColumn(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
