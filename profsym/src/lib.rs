//! Profsym produces compact symbol tables for the native binaries seen in a profile.
//!
//! A profiler records raw instruction addresses. To present function names, every address has
//! to be mapped back into the symbols of the library it belongs to. Profsym obtains those symbols
//! from wherever they are available and packs them into a [`CompactSymbolTable`] that can be
//! handed to a profile viewer as three flat arrays.
//!
//! [`CompactSymbolTable`]: table::CompactSymbolTable
//!
//! # What's in the package
//!
//! - Decoders for Breakpad symbol files and the text output of `nm`
//! - A compact, sorted symbol table with address lookups
//! - Resolution from several sources, tried in order:
//!   - Symbol files in the object directory of a local build
//!   - Symbol files on a symbol server
//!   - `nm` on Linux
//!   - `dump_syms` on Linux and macOS
//!
//! # Usage
//!
//! Add `profsym` as a dependency to your `Cargo.toml` and choose the features you need:
//!
//! - **`parse`**: Decoders for Breakpad symbol files and `nm` output.
//! - **`table`**: The compact symbol table and the compactor building it from decoded symbols.
//! - **`resolve`** (default): The resolution pipeline and its symbol sources.
//! - **`http`**: Downloads from symbol servers using `reqwest`.

#![warn(missing_docs)]

#[doc(inline)]
pub use profsym_common as common;
#[doc(inline)]
#[cfg(feature = "parse")]
pub use profsym_parse as parse;
#[doc(inline)]
#[cfg(feature = "resolve")]
pub use profsym_resolve as resolve;
#[doc(inline)]
#[cfg(feature = "table")]
pub use profsym_table as table;
