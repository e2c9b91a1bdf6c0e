//! Table fetch loop.
//!
//! Looks up each table in order, one request at a time, pausing a fixed
//! interval after every request, and writes `<published> <id>` per table.
//! The first failure ends the run.

use std::io::Write;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{Config, EmptyPolicy};
use crate::error::{ClientError, ClientResult};
use crate::formatters;
use crate::models::TableQueryResult;

/// Source of table lookup results.
#[async_trait]
pub trait TableLookup: Send + Sync {
    /// First record returned for `table_id`, `None` if the lookup was empty.
    async fn lookup(&self, table_id: u32) -> ClientResult<Option<TableQueryResult>>;
}

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Lines written.
    pub printed: usize,
    /// Identifiers with an empty lookup, skipped under [`EmptyPolicy::Skip`].
    pub skipped: usize,
}

/// Sequential lookup loop with a fixed pause between requests.
#[derive(Debug, Clone, Copy)]
pub struct TableFetchLoop {
    delay: Duration,
    empty_policy: EmptyPolicy,
}

impl TableFetchLoop {
    /// Create a loop with an explicit delay and empty-response policy.
    #[must_use]
    pub const fn new(delay: Duration, empty_policy: EmptyPolicy) -> Self {
        Self { delay, empty_policy }
    }

    /// Create a loop from runtime configuration.
    #[must_use]
    pub const fn from_config(config: &Config) -> Self {
        Self::new(config.fetch_delay, config.empty_policy)
    }

    /// Look up every identifier in order and write one line per table.
    ///
    /// # Errors
    ///
    /// Returns the first lookup or write error. Under [`EmptyPolicy::Abort`]
    /// an empty lookup ends the run with [`ClientError::EmptyResult`].
    pub async fn run<L, W>(
        &self,
        lookup: &L,
        table_ids: &[u32],
        out: &mut W,
    ) -> ClientResult<RunSummary>
    where
        L: TableLookup + ?Sized,
        W: Write,
    {
        let mut summary = RunSummary::default();

        tracing::info!(tables = table_ids.len(), delay = ?self.delay, "Starting table lookups");

        for &table_id in table_ids {
            let first = match lookup.lookup(table_id).await {
                Ok(first) => first,
                Err(err) => {
                    tracing::error!(
                        table_id,
                        status = ?err.status(),
                        error = %err,
                        "Lookup failed"
                    );
                    return Err(err);
                }
            };

            tokio::time::sleep(self.delay).await;

            match first {
                Some(record) => {
                    tracing::debug!(
                        table_id,
                        title = record.title_or_default(),
                        published = %record.published.date_time(),
                        "Table published"
                    );
                    writeln!(out, "{}", formatters::published_line(&record, table_id))?;
                    summary.printed += 1;
                }
                None => match self.empty_policy {
                    EmptyPolicy::Abort => return Err(ClientError::empty_result(table_id)),
                    EmptyPolicy::Skip => {
                        tracing::warn!(table_id, "Lookup returned no tables, skipping");
                        summary.skipped += 1;
                    }
                },
            }
        }

        out.flush()?;
        tracing::info!(
            printed = summary.printed,
            skipped = summary.skipped,
            "Finished table lookups"
        );

        Ok(summary)
    }
}

impl Default for TableFetchLoop {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
