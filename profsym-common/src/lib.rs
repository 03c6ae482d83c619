//! Common functionality for `profsym`.
//!
//! This crate exposes a set of key types:
//!
//!  - [`BinaryIdentity`]: The `(debug_name, breakpad_id)` pair identifying one build of a binary.
//!  - [`LibraryInfo`]: Path, platform and architecture hints for a loaded library.
//!  - [`Platform`]: The operating system a library was loaded on.
//!  - [`ByteView`]: Gives access to symbol dumps in-memory or on the file system.
//!
//! This module is part of the `profsym` crate.

#![warn(missing_docs)]

mod byteview;
mod identity;
mod library;

pub use crate::byteview::*;
pub use crate::identity::*;
pub use crate::library::*;

pub use debugid::{DebugId, ParseDebugIdError};
