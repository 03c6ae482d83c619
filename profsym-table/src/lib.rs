//! Compact symbol tables.
//!
//! A [`CompactSymbolTable`] stores the symbols of one binary as three flat arrays: sorted
//! addresses, name offsets and packed name bytes. The layout has no per-symbol allocations, is
//! addressable by index and can be handed to profiler front-ends without further conversion.
//!
//! Tables are built from the [`SymbolMap`](profsym_parse::SymbolMap) produced by the decoders in
//! `profsym-parse` using [`compact`].

#![warn(missing_docs)]

mod error;
mod table;
pub mod writer;

pub use crate::error::*;
pub use crate::table::*;
pub use crate::writer::{compact, compact_detailed, Compaction};
