use std::sync::Arc;

use profsym_common::{BinaryIdentity, LibraryInfo};
use profsym_table::{compact_detailed, CompactSymbolTable, Compaction};

use crate::cache::SymbolCache;
use crate::capabilities::{
    FileReader, LocalFileReader, ProcessToolRunner, SymbolFetcher, ToolRunner,
};
use crate::config::ResolverConfig;
use crate::error::{ResolveError, SourceAttempt, SourceError, SourceErrorKind};
use crate::sources::{
    DumpSymsSource, NmSource, ObjectDirectorySource, SourceKind, SymbolData, SymbolServerSource,
    SymbolSource,
};

/// The capabilities the default symbol sources operate with.
#[derive(Clone)]
pub struct Capabilities {
    /// Downloads from the symbol server.
    pub fetcher: Arc<dyn SymbolFetcher>,
    /// Reads symbol files from object directories.
    pub files: Arc<dyn FileReader>,
    /// Runs `nm` and `dump_syms`.
    pub tools: Arc<dyn ToolRunner>,
}

impl Capabilities {
    /// Uses the given fetcher along with the local file system and process spawning.
    pub fn new(fetcher: Arc<dyn SymbolFetcher>) -> Self {
        Capabilities {
            fetcher,
            files: Arc::new(LocalFileReader),
            tools: Arc::new(ProcessToolRunner),
        }
    }
}

#[cfg(feature = "http")]
impl Default for Capabilities {
    fn default() -> Self {
        Self::new(Arc::new(crate::HttpFetcher::new()))
    }
}

/// Symbols resolved for a binary, along with their provenance.
#[derive(Clone, Debug)]
pub struct ResolvedSymbols {
    /// The symbol table.
    pub table: CompactSymbolTable,
    /// The source that provided the symbols.
    pub source: SourceKind,
    /// The number of symbols that were discarded because their address exceeds 32 bits.
    pub dropped_addresses: usize,
}

/// Resolves symbol tables for binaries by consulting a list of sources in order.
///
/// Sources are tried one after another until the first one succeeds. Sources that are not
/// applicable to a binary, for instance because its local path is unknown, are skipped. Failures
/// of individual sources are logged and never abort resolution; only when no source remains does
/// resolution fail with [`ResolveError::AllSourcesExhausted`].
///
/// Raw symbol dumps are decoded and compacted on a blocking worker thread, so that multi-gigabyte
/// dumps do not stall the async executor.
///
/// Concurrent calls for the same binary are not coalesced and each run all sources.
pub struct SymbolResolutionPipeline {
    sources: Vec<Box<dyn SymbolSource>>,
    cache: Arc<SymbolCache>,
}

impl SymbolResolutionPipeline {
    /// Creates a pipeline that consults `sources` in the given order.
    pub fn new(cache: Arc<SymbolCache>, sources: Vec<Box<dyn SymbolSource>>) -> Self {
        SymbolResolutionPipeline { sources, cache }
    }

    /// Creates a pipeline with the default sources that are enabled in `config`.
    ///
    /// The sources are consulted in this order: object directory, symbol server, `nm` and
    /// `dump_syms`.
    pub fn from_config(
        config: &ResolverConfig,
        capabilities: Capabilities,
        cache: Arc<SymbolCache>,
    ) -> Self {
        let Capabilities {
            fetcher,
            files,
            tools,
        } = capabilities;

        let mut sources: Vec<Box<dyn SymbolSource>> = Vec::with_capacity(4);
        if config.sources.object_directory {
            sources.push(Box::new(ObjectDirectorySource::new(
                files,
                &config.objdir_symbols_dir,
            )));
        }
        if config.sources.symbol_server {
            sources.push(Box::new(SymbolServerSource::new(
                fetcher,
                &config.symbol_server_url,
            )));
        }
        if config.sources.nm {
            sources.push(Box::new(NmSource::new(tools.clone(), &config.nm_program)));
        }
        if config.sources.dump_syms {
            sources.push(Box::new(DumpSymsSource::new(
                tools,
                &config.dump_syms_program,
            )));
        }

        Self::new(cache, sources)
    }

    /// Returns the cache consulted for library hints.
    pub fn cache(&self) -> &Arc<SymbolCache> {
        &self.cache
    }

    /// Returns the kinds of all sources, in the order they are consulted.
    pub fn source_kinds(&self) -> Vec<SourceKind> {
        self.sources.iter().map(|source| source.kind()).collect()
    }

    /// Replaces the library hints with the libraries of a new profiling session.
    pub fn prime_cache<I>(&self, libraries: I)
    where
        I: IntoIterator<Item = LibraryInfo>,
    {
        self.cache.prime(libraries);
    }

    /// Resolves the symbol table for a binary.
    pub async fn resolve_symbols(
        &self,
        identity: &BinaryIdentity,
    ) -> Result<CompactSymbolTable, ResolveError> {
        self.resolve_symbols_detailed(identity)
            .await
            .map(|resolved| resolved.table)
    }

    /// Resolves the symbol table for a binary and reports which source provided it.
    #[tracing::instrument(level = "debug", skip_all, fields(identity = %identity))]
    pub async fn resolve_symbols_detailed(
        &self,
        identity: &BinaryIdentity,
    ) -> Result<ResolvedSymbols, ResolveError> {
        let hints = self.cache.get(identity);
        let mut attempts = Vec::new();

        for source in &self.sources {
            let kind = source.kind();

            if !source.is_applicable(hints.as_ref()) {
                tracing::trace!(source = %kind, "skipping inapplicable source");
                attempts.push(SourceAttempt {
                    kind,
                    error: SourceErrorKind::Unavailable.into(),
                });
                continue;
            }

            let result = match source.attempt(identity, hints.as_ref()).await {
                Ok(data) => finish(data).await,
                Err(error) => Err(error),
            };

            match result {
                Ok(compaction) => {
                    tracing::debug!(
                        source = %kind,
                        symbols = compaction.table.len(),
                        "resolved symbols"
                    );
                    return Ok(ResolvedSymbols {
                        table: compaction.table,
                        source: kind,
                        dropped_addresses: compaction.dropped_addresses,
                    });
                }
                Err(error) => {
                    log_source_error(kind, &error);
                    attempts.push(SourceAttempt { kind, error });
                }
            }
        }

        tracing::info!("no source could provide symbols");
        Err(ResolveError::AllSourcesExhausted {
            identity: identity.clone(),
            attempts,
        })
    }
}

/// Decodes and compacts the output of a source on a blocking worker thread.
async fn finish(data: SymbolData) -> Result<Compaction, SourceError> {
    let task = match data {
        SymbolData::Table(table) => {
            return Ok(Compaction {
                table,
                dropped_addresses: 0,
            })
        }
        SymbolData::Symbols(symbols) => tokio::task::spawn_blocking(move || {
            compact_detailed(&symbols).map_err(SourceError::from)
        }),
        SymbolData::Dump(data, format) => tokio::task::spawn_blocking(move || {
            let symbols = format.decode(&data)?;
            compact_detailed(&symbols).map_err(SourceError::from)
        }),
    };

    task.await
        .map_err(|e| SourceError::new(SourceErrorKind::Failed, e))?
}

fn log_source_error(kind: SourceKind, error: &SourceError) {
    let error_ref = error as &dyn std::error::Error;
    match error.kind() {
        SourceErrorKind::Unavailable => {
            tracing::trace!(source = %kind, error = error_ref, "source unavailable");
        }
        SourceErrorKind::NotFound => {
            tracing::info!(source = %kind, error = error_ref, "symbols not found");
        }
        _ => {
            tracing::warn!(source = %kind, error = error_ref, "symbol source failed");
        }
    }
}
