//! SSB PxWeb API client.
//!
//! Provides an async HTTP client for:
//! - Table lookup by title (`?query=title:<id>`)
//! - Table metadata (`<table-api>/<id>`)
//! - JSON-stat2 data queries (`POST <table-api>/<id>`)
//!
//! Requests are never retried; pacing is left to the fetch loop.

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::config::{Config, api};
use crate::error::{ClientError, ClientResult};
use crate::fetch::TableLookup;
use crate::models::{JsonStatDataset, TableMetadata, TableQueryResult};
use crate::query::DataQuery;

/// SSB table API client.
#[derive(Clone)]
pub struct SsbClient {
    /// HTTP client.
    client: Client,

    /// Table endpoint, always ending in `/`.
    table_api_url: Url,
}

impl SsbClient {
    /// Create a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the endpoint is not a valid URL or HTTP client
    /// initialization fails.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let table_api_url = Url::parse(&config.table_api_url)?;

        let client = Client::builder()
            .user_agent(api::USER_AGENT)
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .gzip(true)
            .build()?;

        Ok(Self { client, table_api_url })
    }

    /// Table endpoint this client talks to.
    #[must_use]
    pub fn table_api_url(&self) -> &str {
        self.table_api_url.as_str()
    }

    /// Lookup URL for a table: the endpoint with `?query=title:<id>` appended.
    #[must_use]
    pub fn query_url(&self, table_id: u32) -> String {
        format!("{}?query=title:{}", self.table_api_url, table_id)
    }

    /// Metadata URL for a table: the endpoint with the identifier appended.
    #[must_use]
    pub fn metadata_url(&self, table_id: u32) -> String {
        format!("{}{}", self.table_api_url, table_id)
    }

    /// Search tables whose title matches the identifier.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure, non-2xx status or a body that is
    /// not an array of table records.
    pub async fn search_tables(&self, table_id: u32) -> ClientResult<Vec<TableQueryResult>> {
        self.get(&self.query_url(table_id)).await
    }

    /// First lookup record for a table, `None` if the API returned `[]`.
    ///
    /// # Errors
    ///
    /// Returns error on API failure.
    pub async fn first_match(&self, table_id: u32) -> ClientResult<Option<TableQueryResult>> {
        let results = self.search_tables(table_id).await?;
        tracing::debug!(table_id, matches = results.len(), "Table lookup decoded");
        Ok(results.into_iter().next())
    }

    /// Get the variables (dimensions) of a table.
    ///
    /// # Errors
    ///
    /// Returns error on API failure.
    pub async fn table_metadata(&self, table_id: u32) -> ClientResult<TableMetadata> {
        self.get(&self.metadata_url(table_id)).await
    }

    /// Post a data query for a table and decode the JSON-stat2 dataset.
    ///
    /// # Errors
    ///
    /// Returns error on API failure, including 400 for a selection the
    /// table rejects.
    pub async fn data_query(
        &self,
        table_id: u32,
        query: &DataQuery,
    ) -> ClientResult<JsonStatDataset> {
        self.post(&self.metadata_url(table_id), query).await
    }

    /// Make a GET request and decode the whole body as JSON.
    async fn get<T>(&self, url: &str) -> ClientResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        tracing::debug!(url, "GET");

        let response = self.client.get(url).send().await?;

        let response = Self::handle_response(response).await?;
        let body = response.bytes().await?;

        serde_json::from_slice(&body).map_err(ClientError::from)
    }

    /// Make a POST request with a JSON body and decode the response as JSON.
    async fn post<T, B>(&self, url: &str, body: &B) -> ClientResult<T>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        tracing::debug!(url, "POST");

        let response = self.client.post(url).json(body).send().await?;

        let response = Self::handle_response(response).await?;
        let body = response.bytes().await?;

        serde_json::from_slice(&body).map_err(ClientError::from)
    }

    /// Handle API response status codes.
    async fn handle_response(response: reqwest::Response) -> ClientResult<reqwest::Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        tracing::warn!(status = status.as_u16(), url = %response.url(), "Request failed");

        match status.as_u16() {
            429 => {
                let retry_after = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(api::DEFAULT_RETRY_AFTER_SECS);

                Err(ClientError::rate_limited(retry_after))
            }
            404 => {
                let text = response.text().await.unwrap_or_default();
                Err(ClientError::not_found(text))
            }
            400 => {
                let text = response.text().await.unwrap_or_default();
                Err(ClientError::bad_request(text))
            }
            500..=599 => {
                let text = response.text().await.unwrap_or_default();
                Err(ClientError::server(status.as_u16(), text))
            }
            _ => {
                let text = response.text().await.unwrap_or_default();
                Err(ClientError::UnexpectedStatus { status: status.as_u16(), message: text })
            }
        }
    }
}

#[async_trait]
impl TableLookup for SsbClient {
    async fn lookup(&self, table_id: u32) -> ClientResult<Option<TableQueryResult>> {
        self.first_match(table_id).await
    }
}

impl std::fmt::Debug for SsbClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SsbClient").field("table_api_url", &self.table_api_url.as_str()).finish()
    }
}
