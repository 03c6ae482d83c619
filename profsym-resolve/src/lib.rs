//! Symbol resolution for native binaries.
//!
//! Given the [`BinaryIdentity`](profsym_common::BinaryIdentity) of a library, the
//! [`SymbolResolutionPipeline`] produces a [`CompactSymbolTable`](profsym_table::CompactSymbolTable)
//! mapping the library's code addresses to function names. Symbols are obtained from the first of
//! several [`sources`] that succeeds:
//!
//!  1. Symbol files in the object directory of a local build.
//!  2. Symbol files on a symbol server.
//!  3. The output of `nm` on Linux.
//!  4. The output of `dump_syms` on Linux and macOS.
//!
//! Sources reach the network, the file system and external tools only through the
//! [`SymbolFetcher`], [`FileReader`] and [`ToolRunner`] capabilities. With the `http` feature,
//! [`HttpFetcher`] downloads symbols using `reqwest`.
//!
//! Local sources need to know where a library lives and on which platform it was loaded. These
//! hints are kept in the [`SymbolCache`], which is primed once per profiling session with the
//! host's list of loaded libraries.
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "http")]
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//!
//! use profsym_common::BinaryIdentity;
//! use profsym_resolve::{Capabilities, ResolverConfig, SymbolCache, SymbolResolutionPipeline};
//!
//! let pipeline = SymbolResolutionPipeline::from_config(
//!     &ResolverConfig::default(),
//!     Capabilities::default(),
//!     Arc::new(SymbolCache::new()),
//! );
//!
//! let identity = BinaryIdentity::new("xul.pdb", "44E4EC8C2F41492B9369D6B9A059577C2");
//! let table = pipeline.resolve_symbols(&identity).await?;
//! println!("{} symbols", table.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod cache;
mod capabilities;
mod config;
mod error;
#[cfg(feature = "http")]
mod http;
mod pipeline;
pub mod sources;

pub use crate::cache::*;
pub use crate::capabilities::*;
pub use crate::config::*;
pub use crate::error::*;
#[cfg(feature = "http")]
pub use crate::http::*;
pub use crate::pipeline::*;
pub use crate::sources::{SourceKind, SymbolData, SymbolSource};
