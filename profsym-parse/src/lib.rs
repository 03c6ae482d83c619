//! Decoders for textual symbol dumps.
//!
//! Symbol dumps map code addresses to function names. This crate decodes the two formats that
//! symbol sources produce:
//!
//!  - Breakpad `.sym` files, as served by symbol servers and written by `dump_syms`. Only `FUNC`
//!    and `PUBLIC` records are read, see [`breakpad`].
//!  - The demangled text output of `nm`, see [`nm`].
//!
//! Both decoders produce a [`SymbolMap`], an unordered address to name mapping where later
//! entries replace earlier ones at the same address. Text produced incrementally, such as the
//! standard output of a running process, is split into lines by the [`LineStreamParser`].
//!
//! # Example
//!
//! ```
//! use profsym_parse::{DumpFormat, SymbolMap};
//!
//! let dump = b"MODULE Linux x86_64 0 libfoo.so\nFUNC 1000 20 0 foo()\nPUBLIC 2000 0 bar\n";
//! let symbols = DumpFormat::Breakpad.decode(dump).unwrap();
//!
//! assert_eq!(symbols.len(), 2);
//! assert_eq!(symbols.get(0x1000), Some("foo()"));
//! ```

#![warn(missing_docs)]

pub mod breakpad;
mod error;
mod lines;
mod map;
pub mod nm;

pub use crate::error::*;
pub use crate::lines::*;
pub use crate::map::*;

/// The textual encoding of a symbol dump.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DumpFormat {
    /// Breakpad `.sym` text.
    Breakpad,
    /// Demangled `nm` output.
    Nm,
}

impl DumpFormat {
    /// Guesses the format of a dump from its leading bytes.
    ///
    /// Breakpad symbol files always start with a `MODULE` record. Everything else is treated as
    /// `nm` output, which has no header.
    pub fn detect(data: &[u8]) -> DumpFormat {
        if data.starts_with(b"MODULE ") {
            DumpFormat::Breakpad
        } else {
            DumpFormat::Nm
        }
    }

    /// Decodes a complete dump in this format.
    ///
    /// Only breakpad dumps can fail to decode. `nm` output is decoded leniently, skipping lines
    /// that cannot be interpreted.
    pub fn decode(self, data: &[u8]) -> Result<SymbolMap<'_>, ParseError> {
        match self {
            DumpFormat::Breakpad => breakpad::decode(data),
            DumpFormat::Nm => Ok(nm::decode(data)),
        }
    }
}
