//! SSB Table Publication Checker
//!
//! Looks up Statistics Norway (SSB) tables through the PxWeb API and reports
//! when each one was last published.
//!
//! # Features
//!
//! - **Sequential lookups**: one request per table, in order, 1 s apart
//! - **Typed decoding**: responses are validated into [`models::TableQueryResult`]
//! - **All-or-nothing**: the first failure ends the run with a [`ClientError`]
//! - **Table metadata**: dimensions and value lists for a single table
//! - **Data queries**: filtered JSON-stat2 downloads, batched per year and
//!   region under the API row limit
//!
//! # Example
//!
//! ```no_run
//! use ssb_published::{Config, SsbClient, TableFetchLoop, config::tables::TABLE_IDS};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let fetch = TableFetchLoop::from_config(&config);
//!     let client = SsbClient::new(config)?;
//!
//!     fetch.run(&client, TABLE_IDS, &mut std::io::stdout().lock()).await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod fetch;
pub mod formatters;
pub mod models;
pub mod query;

pub use client::SsbClient;
pub use config::{Config, EmptyPolicy};
pub use error::{ClientError, ClientResult, QueryError};
pub use fetch::{RunSummary, TableFetchLoop, TableLookup};
pub use query::{DataQuery, DataQueryRunner, DataSummary, MetadataFilter, build_query, plan_batches};
