use thiserror::Error;

/// The kind of a [`ParseError`].
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum ParseErrorKind {
    /// A record's address is not a hexadecimal number.
    #[error("invalid address")]
    InvalidAddress,
    /// A `FUNC` record is missing its size or parameter size field.
    #[error("invalid func record")]
    InvalidFuncRecord,
    /// A `PUBLIC` record is missing its parameter size field.
    #[error("invalid public record")]
    InvalidPublicRecord,
}

/// An error returned when a symbol dump cannot be decoded.
#[derive(Debug, Error)]
#[error("{kind} at byte offset {offset}")]
pub struct ParseError {
    kind: ParseErrorKind,
    offset: usize,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl ParseError {
    pub(crate) fn new(kind: ParseErrorKind, offset: usize) -> Self {
        ParseError {
            kind,
            offset,
            source: None,
        }
    }

    pub(crate) fn with_source<E>(mut self, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        self.source = Some(source.into());
        self
    }

    /// Returns the corresponding [`ParseErrorKind`] for this error.
    pub fn kind(&self) -> ParseErrorKind {
        self.kind
    }

    /// Returns the byte offset of the offending record in the dump.
    pub fn offset(&self) -> usize {
        self.offset
    }
}
