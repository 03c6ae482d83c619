use std::sync::Arc;

use async_trait::async_trait;

use profsym_common::{BinaryIdentity, LibraryInfo};
use profsym_parse::DumpFormat;

use super::{SourceKind, SymbolData, SymbolSource};
use crate::capabilities::{FetchResponse, SymbolFetcher};
use crate::error::{SourceError, SourceErrorKind};

/// Returns the URL of a binary's symbol file on a symbol server.
///
/// ```
/// use profsym_common::BinaryIdentity;
/// use profsym_resolve::sources::symbol_url;
///
/// let identity = BinaryIdentity::new("xul.pdb", "44E4EC8C2F41492B9369D6B9A059577C2");
/// assert_eq!(
///     symbol_url("https://symbols.mozilla.org/", &identity),
///     "https://symbols.mozilla.org/xul.pdb/44E4EC8C2F41492B9369D6B9A059577C2/xul.sym"
/// );
/// ```
pub fn symbol_url(base_url: &str, identity: &BinaryIdentity) -> String {
    let mut url = base_url.trim_end_matches('/').to_owned();
    for component in identity.path_components() {
        url.push('/');
        url.push_str(&component);
    }
    url
}

/// Downloads symbol files from a symbol server.
///
/// This source only needs the identity of a binary and is applicable to every library,
/// including those loaded on remote devices.
pub struct SymbolServerSource {
    fetcher: Arc<dyn SymbolFetcher>,
    base_url: String,
}

impl SymbolServerSource {
    /// Creates a source for the symbol server at `base_url`.
    pub fn new(fetcher: Arc<dyn SymbolFetcher>, base_url: impl Into<String>) -> Self {
        SymbolServerSource {
            fetcher,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl SymbolSource for SymbolServerSource {
    fn kind(&self) -> SourceKind {
        SourceKind::SymbolServer
    }

    #[tracing::instrument(name = "symbol_server", level = "trace", skip_all, fields(identity = %identity))]
    async fn attempt(
        &self,
        identity: &BinaryIdentity,
        _hints: Option<&LibraryInfo>,
    ) -> Result<SymbolData, SourceError> {
        let url = symbol_url(&self.base_url, identity);

        match self.fetcher.fetch(&url).await {
            Ok(FetchResponse::Found(data)) => Ok(SymbolData::Dump(data, DumpFormat::Breakpad)),
            Ok(FetchResponse::NotFound) => Err(SourceError::new(SourceErrorKind::NotFound, url)),
            Ok(FetchResponse::Status(status)) => {
                let message = format!("got status {status} for {url}");
                Err(SourceError::new(SourceErrorKind::Failed, message))
            }
            Err(e) => Err(SourceError::new(SourceErrorKind::Failed, e)),
        }
    }
}
