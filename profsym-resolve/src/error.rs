use std::error::Error;
use std::fmt;

use thiserror::Error;

use profsym_common::BinaryIdentity;
use profsym_parse::ParseError;
use profsym_table::TableError;

use crate::sources::SourceKind;

/// The kind of a [`SourceError`].
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SourceErrorKind {
    /// The source cannot be used for this binary, for instance because its path is unknown.
    Unavailable,
    /// The source has no symbols for this binary.
    NotFound,
    /// The source has symbols, but obtaining or decoding them failed.
    Failed,
}

impl fmt::Display for SourceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => write!(f, "symbol source not applicable"),
            Self::NotFound => write!(f, "symbols not found"),
            Self::Failed => write!(f, "failed to obtain symbols"),
        }
    }
}

/// An error returned by a single [`SymbolSource`](crate::SymbolSource).
///
/// Source errors are never fatal. The pipeline records them and moves on to the next source.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct SourceError {
    kind: SourceErrorKind,
    #[source]
    source: Option<Box<dyn Error + Send + Sync + 'static>>,
}

impl SourceError {
    /// Creates a new source error from a known kind of error as well as an arbitrary error
    /// payload.
    pub fn new<E>(kind: SourceErrorKind, source: E) -> Self
    where
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        let source = Some(source.into());
        Self { kind, source }
    }

    /// Returns the corresponding [`SourceErrorKind`] for this error.
    pub fn kind(&self) -> SourceErrorKind {
        self.kind
    }
}

impl From<SourceErrorKind> for SourceError {
    fn from(kind: SourceErrorKind) -> Self {
        Self { kind, source: None }
    }
}

impl From<ParseError> for SourceError {
    fn from(e: ParseError) -> Self {
        Self::new(SourceErrorKind::Failed, e)
    }
}

impl From<TableError> for SourceError {
    fn from(e: TableError) -> Self {
        Self::new(SourceErrorKind::Failed, e)
    }
}

/// The outcome of one source that did not produce symbols.
#[derive(Debug)]
pub struct SourceAttempt {
    /// The source that was consulted.
    pub kind: SourceKind,
    /// Why the source did not produce symbols.
    pub error: SourceError,
}

/// An error returned when symbols for a binary cannot be resolved.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Every configured source was either inapplicable or failed.
    #[error("no symbol source could provide symbols for {identity}")]
    AllSourcesExhausted {
        /// The binary that could not be resolved.
        identity: BinaryIdentity,
        /// The outcome of every configured source, in the order they were consulted.
        attempts: Vec<SourceAttempt>,
    },
}

impl ResolveError {
    /// Returns the outcomes of all consulted sources.
    pub fn attempts(&self) -> &[SourceAttempt] {
        match self {
            Self::AllSourcesExhausted { attempts, .. } => attempts,
        }
    }
}
