use std::ffi::OsString;
use std::io;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use profsym_common::{BinaryIdentity, LibraryInfo, Platform};
use profsym_parse::nm::NmOutputDecoder;
use profsym_parse::LineStreamParser;

use super::{absolute_path, SourceKind, SymbolData, SymbolSource};
use crate::capabilities::ToolRunner;
use crate::error::{SourceError, SourceErrorKind};

/// Lists the symbols of Linux binaries with `nm`.
///
/// `nm` runs twice, once for the regular symbol table and once for the dynamic symbol table,
/// since stripped libraries only retain the latter. Both outputs are streamed into a single map.
pub struct NmSource {
    tools: Arc<dyn ToolRunner>,
    program: String,
}

impl NmSource {
    /// Creates a source that runs the given `nm` executable.
    pub fn new(tools: Arc<dyn ToolRunner>, program: impl Into<String>) -> Self {
        NmSource {
            tools,
            program: program.into(),
        }
    }

    async fn run(
        &self,
        args: &[&str],
        binary: &Path,
        parser: &mut LineStreamParser<NmOutputDecoder>,
    ) -> Result<(), SourceError> {
        let mut args: Vec<OsString> = args.iter().map(OsString::from).collect();
        args.push(binary.into());

        let status = self
            .tools
            .run(&self.program, &args, &mut |chunk| parser.consume(chunk))
            .await
            .map_err(|e| tool_error(&self.program, e))?;

        if !status.success() {
            let message = format!("{} exited with {status}", self.program);
            return Err(SourceError::new(SourceErrorKind::Failed, message));
        }

        Ok(())
    }
}

/// Converts a failure to spawn or communicate with a tool.
///
/// A missing executable makes the source unavailable rather than failed.
pub(super) fn tool_error(program: &str, error: io::Error) -> SourceError {
    let kind = match error.kind() {
        io::ErrorKind::NotFound => SourceErrorKind::Unavailable,
        _ => SourceErrorKind::Failed,
    };
    SourceError::new(kind, format!("cannot run {program}: {error}"))
}

#[async_trait]
impl SymbolSource for NmSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Nm
    }

    fn is_applicable(&self, hints: Option<&LibraryInfo>) -> bool {
        hints.map_or(false, |info| {
            info.platform == Platform::Linux && info.absolute_path().is_some()
        })
    }

    #[tracing::instrument(name = "nm", level = "trace", skip_all, fields(identity = %identity))]
    async fn attempt(
        &self,
        identity: &BinaryIdentity,
        hints: Option<&LibraryInfo>,
    ) -> Result<SymbolData, SourceError> {
        let binary = absolute_path(hints).ok_or(SourceErrorKind::Unavailable)?;

        let mut parser = LineStreamParser::new(NmOutputDecoder::new());
        self.run(&["--demangle"], binary, &mut parser).await?;
        self.run(&["-D", "--demangle"], binary, &mut parser).await?;

        let symbols = parser.finish();
        if symbols.is_empty() {
            let message = format!("{} lists no symbols for {}", self.program, binary.display());
            return Err(SourceError::new(SourceErrorKind::NotFound, message));
        }

        tracing::trace!(symbols = symbols.len(), "listed symbols");
        Ok(SymbolData::Symbols(symbols))
    }
}
