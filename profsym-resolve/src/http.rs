use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use profsym_common::ByteView;

use crate::capabilities::{FetchError, FetchResponse, SymbolFetcher};

/// A [`SymbolFetcher`] that downloads symbol files over HTTP.
#[derive(Clone, Debug, Default)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Creates a fetcher with a default client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fetcher that sends requests through `client`.
    pub fn with_client(client: Client) -> Self {
        HttpFetcher { client }
    }
}

#[async_trait]
impl SymbolFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError> {
        tracing::debug!(url, "fetching symbol file");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::new(url, e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(FetchResponse::NotFound);
        }
        if !status.is_success() {
            return Ok(FetchResponse::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(|e| FetchError::new(url, e))?;
        Ok(FetchResponse::Found(ByteView::from_vec(body.to_vec())))
    }
}
