use std::ffi::OsString;
use std::sync::Arc;

use async_trait::async_trait;

use profsym_common::{BinaryIdentity, ByteView, LibraryInfo, Platform};
use profsym_parse::DumpFormat;

use super::nm::tool_error;
use super::{absolute_path, SourceKind, SymbolData, SymbolSource};
use crate::capabilities::ToolRunner;
use crate::error::{SourceError, SourceErrorKind};

/// Generates symbol files for Linux and macOS binaries with `dump_syms`.
///
/// This is the last resort. `dump_syms` reads full debug information, which is slow for large
/// binaries, and its entire output is buffered before decoding.
pub struct DumpSymsSource {
    tools: Arc<dyn ToolRunner>,
    program: String,
}

impl DumpSymsSource {
    /// Creates a source that runs the given `dump_syms` executable.
    pub fn new(tools: Arc<dyn ToolRunner>, program: impl Into<String>) -> Self {
        DumpSymsSource {
            tools,
            program: program.into(),
        }
    }

    /// Returns the command line arguments for dumping the given library.
    ///
    /// On macOS, universal binaries contain several architectures, so the architecture is
    /// selected explicitly when known.
    fn arguments(info: &LibraryInfo) -> Vec<OsString> {
        let mut args = Vec::with_capacity(3);
        if info.platform == Platform::MacOs && !info.arch.is_empty() {
            args.push("-a".into());
            args.push(info.arch.as_str().into());
        }
        if let Some(path) = info.absolute_path() {
            args.push(path.into());
        }
        args
    }
}

#[async_trait]
impl SymbolSource for DumpSymsSource {
    fn kind(&self) -> SourceKind {
        SourceKind::DumpSyms
    }

    fn is_applicable(&self, hints: Option<&LibraryInfo>) -> bool {
        hints.map_or(false, |info| {
            matches!(info.platform, Platform::Linux | Platform::MacOs)
                && info.absolute_path().is_some()
        })
    }

    #[tracing::instrument(name = "dump_syms", level = "trace", skip_all, fields(identity = %identity))]
    async fn attempt(
        &self,
        identity: &BinaryIdentity,
        hints: Option<&LibraryInfo>,
    ) -> Result<SymbolData, SourceError> {
        let info = match hints {
            Some(info) if absolute_path(hints).is_some() => info,
            _ => return Err(SourceErrorKind::Unavailable.into()),
        };

        let mut output = Vec::new();
        let status = self
            .tools
            .run(&self.program, &Self::arguments(info), &mut |chunk| {
                output.extend_from_slice(chunk)
            })
            .await
            .map_err(|e| tool_error(&self.program, e))?;

        if !status.success() {
            let message = format!("{} exited with {status}", self.program);
            return Err(SourceError::new(SourceErrorKind::Failed, message));
        }

        tracing::trace!(bytes = output.len(), "dumped symbols");
        Ok(SymbolData::Dump(
            ByteView::from_vec(output),
            DumpFormat::Breakpad,
        ))
    }
}
