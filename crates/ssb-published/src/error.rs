//! Error types for the SSB publication checker.
//!
//! Uses `thiserror` for structured error handling with automatic `From` implementations.

use std::time::Duration;

/// Errors from the HTTP client layer and the fetch loop.
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    /// HTTP transport error (connection, DNS, TLS, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Rate limited by the SSB API (429 response)
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Suggested wait time
        retry_after: Duration,
    },

    /// Table not found (404 response)
    #[error("Resource not found: {resource}")]
    NotFound {
        /// Description of the missing resource
        resource: String,
    },

    /// Invalid request parameters (400 response)
    #[error("Bad request: {message}")]
    BadRequest {
        /// Error message from API
        message: String,
    },

    /// JSON parsing error
    #[error("Failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Server error (5xx response)
    #[error("Server error ({status}): {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
    },

    /// Unexpected HTTP status
    #[error("Unexpected status {status}: {message}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
        /// Response body or message
        message: String,
    },

    /// Lookup returned an empty array for a table
    #[error("No table matched title:{table_id}")]
    EmptyResult {
        /// Identifier that produced no records
        table_id: u32,
    },

    /// Data query could not be built from the table metadata
    #[error("Invalid data query: {0}")]
    Query(#[from] QueryError),

    /// Writing a result line failed
    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

impl ClientError {
    /// Create a rate limited error with retry-after duration.
    #[must_use]
    pub fn rate_limited(seconds: u64) -> Self {
        Self::RateLimited { retry_after: Duration::from_secs(seconds) }
    }

    /// Create a not found error.
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound { resource: resource.into() }
    }

    /// Create a bad request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest { message: message.into() }
    }

    /// Create a server error.
    #[must_use]
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server { status, message: message.into() }
    }

    /// Create an empty result error.
    #[must_use]
    pub const fn empty_result(table_id: u32) -> Self {
        Self::EmptyResult { table_id }
    }

    /// HTTP status behind this error, if the API answered at all.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::RateLimited { .. } => Some(429),
            Self::NotFound { .. } => Some(404),
            Self::BadRequest { .. } => Some(400),
            Self::Server { status, .. } | Self::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors building a data query from table metadata.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Filter text is not `code=v1,v2&code=v3`
    #[error("malformed filter {0:?}, expected code=value,value&code=value")]
    MalformedFilter(String),

    /// Filter names a variable the table does not have
    #[error("table has no variable {code:?}")]
    UnknownVariable {
        /// Variable code from the filter
        code: String,
    },

    /// Filter names a value the variable does not have
    #[error("variable {code:?} has no value {value:?}")]
    UnknownValue {
        /// Variable code
        code: String,
        /// Value code from the filter
        value: String,
    },
}

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
