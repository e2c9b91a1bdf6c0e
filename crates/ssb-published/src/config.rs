//! Configuration for the SSB publication checker.

use std::time::Duration;

use url::Url;

/// API configuration constants.
pub mod api {
    use std::time::Duration;

    /// Table endpoint (Norwegian language).
    pub const TABLE_API: &str = "http://data.ssb.no/api/v0/no/table/";

    /// Request timeout.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection timeout.
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Fixed pause after every lookup (1 req/s).
    pub const FETCH_DELAY: Duration = Duration::from_secs(1);

    /// Pause after every data query (the API allows 30 queries a minute).
    pub const QUERY_DELAY: Duration = Duration::from_secs(2);

    /// Most rows a single data query may return.
    pub const MAX_QUERY_ROWS: usize = 800_000;

    /// Retry-After fallback when a 429 carries no usable header.
    pub const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

    /// User agent sent with every request.
    pub const USER_AGENT: &str = concat!("ssb-published/", env!("CARGO_PKG_VERSION"));
}

/// Table identifiers checked by default.
pub mod tables {
    /// SSB tables whose publication date is reported on a plain run.
    ///
    /// Identifiers are printed and queried in decimal, so tables with a
    /// leading zero (05939, 09345, 08655) appear without it.
    pub const TABLE_IDS: &[u32] = &[
        12115, 12189, 12238, 12275, 12276, 12279, 12280, 12286, 12287, 12305, 12615, 12150,
        12151, 12612, 12292, 12003, 12293, 11924, 11875, 11933, 11820, 11805, 11814, 11816,
        11845, 12183, 12367, 12295, 5939, 11211, 12303, 12920, 12611, 11879, 12676, 12597,
        12364, 11994, 11996, 12005, 11993, 11995, 11906, 12559, 12905, 13006, 12160, 12213,
        12203, 12222, 12272, 12056, 12129, 12562, 12216, 12436, 9345, 11977, 12285, 11974,
        12236, 12234, 12282, 11971, 12247, 12860, 12861, 8655, 12055, 11975, 12919, 12209,
        13013,
    ];
}

/// What the fetch loop does when a lookup returns an empty array.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmptyPolicy {
    /// Stop the whole run with [`crate::ClientError::EmptyResult`].
    #[default]
    Abort,
    /// Log a warning and move on to the next identifier.
    Skip,
}

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Table endpoint, ending in `/` (overridable for mock servers).
    pub table_api_url: String,

    /// Request timeout.
    pub request_timeout: Duration,

    /// Connection timeout.
    pub connect_timeout: Duration,

    /// Pause after every lookup.
    pub fetch_delay: Duration,

    /// Pause after every data query.
    pub query_delay: Duration,

    /// Row limit for a single data query.
    pub max_query_rows: usize,

    /// Behaviour on an empty lookup response.
    pub empty_policy: EmptyPolicy,
}

impl Config {
    /// Create a configuration pointing at the given table endpoint.
    ///
    /// A missing trailing slash is added so identifiers can be appended.
    ///
    /// # Errors
    ///
    /// Returns error if the endpoint is not an absolute URL or carries a
    /// query string or fragment.
    pub fn new(table_api_url: impl AsRef<str>) -> anyhow::Result<Self> {
        Ok(Self::with_endpoint(normalize_endpoint(table_api_url.as_ref())?))
    }

    fn with_endpoint(table_api_url: String) -> Self {
        Self {
            table_api_url,
            request_timeout: api::REQUEST_TIMEOUT,
            connect_timeout: api::CONNECT_TIMEOUT,
            fetch_delay: api::FETCH_DELAY,
            query_delay: api::QUERY_DELAY,
            max_query_rows: api::MAX_QUERY_ROWS,
            empty_policy: EmptyPolicy::default(),
        }
    }

    /// Create a test configuration for a mock server.
    #[must_use]
    pub fn for_testing(base_url: &str) -> Self {
        Self {
            table_api_url: format!("{}/api/v0/no/table/", base_url.trim_end_matches('/')),
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
            fetch_delay: Duration::ZERO, // No delay in tests
            query_delay: Duration::ZERO,
            max_query_rows: api::MAX_QUERY_ROWS,
            empty_policy: EmptyPolicy::Abort,
        }
    }

    /// Create configuration from environment variables.
    ///
    /// Reads `SSB_API_URL` (table endpoint) and `SSB_DELAY_MS`.
    ///
    /// # Errors
    ///
    /// Returns error if either variable is invalid.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Create configuration from a variable source keyed like the environment.
    ///
    /// # Errors
    ///
    /// Returns error if `SSB_API_URL` is not a usable endpoint or
    /// `SSB_DELAY_MS` is not an integer.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = match var("SSB_API_URL") {
            Some(url) => Self::new(url)
                .map_err(|e| anyhow::anyhow!("SSB_API_URL is not a usable endpoint: {e}"))?,
            None => Self::default(),
        };

        if let Some(raw) = var("SSB_DELAY_MS") {
            let millis: u64 = raw
                .trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("SSB_DELAY_MS must be milliseconds: {e}"))?;
            config.fetch_delay = Duration::from_millis(millis);
        }

        Ok(config)
    }

    /// Replace the table endpoint, keeping every other setting.
    ///
    /// # Errors
    ///
    /// Same rules as [`Config::new`].
    pub fn with_table_api_url(mut self, table_api_url: &str) -> anyhow::Result<Self> {
        self.table_api_url = normalize_endpoint(table_api_url)?;
        Ok(self)
    }

    /// Builder-style override of the empty-response policy.
    #[must_use]
    pub fn with_empty_policy(mut self, policy: EmptyPolicy) -> Self {
        self.empty_policy = policy;
        self
    }

    /// Builder-style override of the fetch delay.
    #[must_use]
    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    /// Builder-style override of the data query row limit.
    #[must_use]
    pub fn with_max_query_rows(mut self, rows: usize) -> Self {
        self.max_query_rows = rows;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::with_endpoint(api::TABLE_API.to_string())
    }
}

/// Validate an endpoint and make sure identifiers can be appended to it.
fn normalize_endpoint(raw: &str) -> anyhow::Result<String> {
    let mut url = Url::parse(raw.trim())?;

    if url.cannot_be_a_base() {
        anyhow::bail!("{raw} cannot be used as a base URL");
    }
    if url.query().is_some() || url.fragment().is_some() {
        anyhow::bail!("{raw} must not carry a query string or fragment");
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url.into())
}
