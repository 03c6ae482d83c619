//! The places symbols can be obtained from.
//!
//! Every source implements [`SymbolSource`]. The pipeline consults them in a fixed order, from
//! the cheapest and most likely to succeed to the most expensive:
//!
//!  1. [`ObjectDirectorySource`]: symbol files written by `mach buildsymbols` next to a local
//!     build. Requires the path of the binary.
//!  2. [`SymbolServerSource`]: symbol files from a symbol server. Requires only the identity.
//!  3. [`NmSource`]: the output of `nm` for Linux binaries. Requires the path of the binary.
//!  4. [`DumpSymsSource`]: the output of `dump_syms` for Linux and macOS binaries. Requires the
//!     path of the binary.

use std::fmt;
use std::path::Path;

use async_trait::async_trait;

use profsym_common::{BinaryIdentity, ByteView, LibraryInfo};
use profsym_parse::{DumpFormat, SymbolMap};
use profsym_table::CompactSymbolTable;

use crate::error::SourceError;

mod dump_syms;
mod nm;
mod objdir;
mod server;

pub use self::dump_syms::DumpSymsSource;
pub use self::nm::NmSource;
pub use self::objdir::{objdir_dist, ObjectDirectorySource};
pub use self::server::{symbol_url, SymbolServerSource};

/// Identifies a [`SymbolSource`] implementation.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum SourceKind {
    /// Symbol files in the object directory of a local build.
    ObjectDirectory,
    /// Symbol files from a symbol server.
    SymbolServer,
    /// Symbols listed by `nm`.
    Nm,
    /// Symbol files generated by `dump_syms`.
    DumpSyms,
    /// A source provided by the embedder.
    Custom(&'static str),
}

impl SourceKind {
    /// Returns a short name for logging.
    pub fn name(self) -> &'static str {
        match self {
            SourceKind::ObjectDirectory => "objdir",
            SourceKind::SymbolServer => "symbol-server",
            SourceKind::Nm => "nm",
            SourceKind::DumpSyms => "dump_syms",
            SourceKind::Custom(name) => name,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Symbols as produced by a [`SymbolSource`].
///
/// Sources return symbols in whatever form is cheapest for them. Decoding and compaction are
/// CPU-bound and happen in the pipeline, off the async executor.
pub enum SymbolData {
    /// A finished table.
    Table(CompactSymbolTable),
    /// Decoded symbols that still need to be compacted.
    Symbols(SymbolMap<'static>),
    /// A raw symbol dump that still needs to be decoded.
    Dump(ByteView<'static>, DumpFormat),
}

impl fmt::Debug for SymbolData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table(table) => f.debug_tuple("Table").field(table).finish(),
            Self::Symbols(symbols) => f.debug_tuple("Symbols").field(&symbols.len()).finish(),
            Self::Dump(data, format) => f
                .debug_tuple("Dump")
                .field(&data.len())
                .field(format)
                .finish(),
        }
    }
}

/// A place symbols can be obtained from.
#[async_trait]
pub trait SymbolSource: Send + Sync {
    /// Identifies this source in logs and errors.
    fn kind(&self) -> SourceKind;

    /// Checks whether this source can be used with the given library hints.
    ///
    /// Inapplicable sources are skipped without being attempted. `hints` is `None` if the binary
    /// is not in the [`SymbolCache`](crate::SymbolCache).
    fn is_applicable(&self, hints: Option<&LibraryInfo>) -> bool {
        let _ = hints;
        true
    }

    /// Obtains symbols for the binary.
    async fn attempt(
        &self,
        identity: &BinaryIdentity,
        hints: Option<&LibraryInfo>,
    ) -> Result<SymbolData, SourceError>;
}

/// Returns the absolute path of the binary, if the hints carry one.
fn absolute_path(hints: Option<&LibraryInfo>) -> Option<&Path> {
    hints.and_then(LibraryInfo::absolute_path)
}
