//! Table data queries.
//!
//! Narrows table metadata with a `code=v1,v2&code=v3` filter, splits it into
//! batches of one year and as many regions as fit under the API row limit,
//! and posts one JSON-stat2 query per batch.

use std::io::Write;
use std::ops::Range;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::SsbClient;
use crate::config::Config;
use crate::error::{ClientResult, QueryError};
use crate::models::{TableMetadata, Variable};

/// Value selections parsed from `code=v1,v2&code=v3`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataFilter {
    selections: Vec<(String, Vec<String>)>,
}

impl MetadataFilter {
    /// Selections in filter order.
    #[must_use]
    pub fn selections(&self) -> &[(String, Vec<String>)] {
        &self.selections
    }

    /// Copy of `meta` with every filtered variable narrowed to the chosen
    /// values, in filter order. Labels follow their values.
    ///
    /// # Errors
    ///
    /// Returns error if the filter names a variable or value the table lacks.
    pub fn apply(&self, meta: &TableMetadata) -> Result<TableMetadata, QueryError> {
        let mut filtered = meta.clone();

        for (code, keep) in &self.selections {
            let var = filtered
                .variables
                .iter_mut()
                .find(|v| v.code == *code)
                .ok_or_else(|| QueryError::UnknownVariable { code: code.clone() })?;
            retain_values(var, keep)?;
        }

        Ok(filtered)
    }
}

impl FromStr for MetadataFilter {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || QueryError::MalformedFilter(s.to_string());

        let selections = s
            .split('&')
            .map(|part| {
                let (code, values) = part.split_once('=').ok_or_else(malformed)?;
                let code = code.trim();
                let values: Vec<String> =
                    values.split(',').map(|v| v.trim().to_string()).collect();

                if code.is_empty() || values.iter().any(String::is_empty) {
                    return Err(malformed());
                }
                Ok((code.to_string(), values))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { selections })
    }
}

fn retain_values(var: &mut Variable, keep: &[String]) -> Result<(), QueryError> {
    let mut values = Vec::with_capacity(keep.len());
    let mut texts = Vec::with_capacity(keep.len());

    for wanted in keep {
        let pos = var.values.iter().position(|v| v == wanted).ok_or_else(|| {
            QueryError::UnknownValue { code: var.code.clone(), value: wanted.clone() }
        })?;
        values.push(wanted.clone());
        texts.push(var.value_texts.get(pos).cloned().unwrap_or_default());
    }

    var.values = values;
    var.value_texts = texts;
    Ok(())
}

/// Body of a PxWeb data query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataQuery {
    /// One selection per variable.
    pub query: Vec<QuerySelection>,
    /// Requested response format.
    pub response: ResponseFormat,
}

/// Selection of values for one variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySelection {
    /// Variable code.
    pub code: String,
    /// Chosen values.
    pub selection: Selection,
}

/// Filter kind and values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    /// Selection filter ("item" picks values by code).
    pub filter: String,
    /// Value codes.
    pub values: Vec<String>,
}

/// Response format member of a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseFormat {
    /// Format name.
    pub format: String,
}

/// Query selecting every value of every variable in `meta`.
///
/// Accounting-scope variables (text containing "omfang") are pinned to "A",
/// the whole-municipality scope.
#[must_use]
pub fn build_query(meta: &TableMetadata) -> DataQuery {
    let query = meta
        .variables
        .iter()
        .map(|var| QuerySelection {
            code: var.code.clone(),
            selection: Selection {
                filter: "item".to_string(),
                values: if var.text.contains("omfang") {
                    vec!["A".to_string()]
                } else {
                    var.values.clone()
                },
            },
        })
        .collect();

    DataQuery { query, response: ResponseFormat { format: "json-stat2".to_string() } }
}

/// Split `meta` into batches of one year each, with regions chunked so every
/// batch stays below `max_rows`.
///
/// Tables without a time or region dimension are not split along it. A
/// single region is always sent even if it alone exceeds the limit.
#[must_use]
pub fn plan_batches(meta: &TableMetadata, max_rows: usize) -> Vec<TableMetadata> {
    let time = meta.time_variable();
    let region = meta.region_variable();

    let excluded: Vec<&str> = time.into_iter().chain(region).map(|v| v.code.as_str()).collect();
    let row_size = meta.size_excluding(&excluded).max(1);
    let regions_per_batch = (max_rows.saturating_sub(1) / row_size).max(1);

    if row_size >= max_rows {
        tracing::warn!(row_size, max_rows, "One region exceeds the row limit");
    }

    let years: Vec<Option<Range<usize>>> = match time {
        Some(var) => (0..var.values.len()).map(|i| Some(i..i + 1)).collect(),
        None => vec![None],
    };
    let regions: Vec<Option<Range<usize>>> = match region {
        Some(var) => {
            let n = var.values.len();
            (0..n)
                .step_by(regions_per_batch)
                .map(|start| Some(start..(start + regions_per_batch).min(n)))
                .collect()
        }
        None => vec![None],
    };

    let mut batches = Vec::with_capacity(years.len() * regions.len());
    for year in &years {
        for chunk in &regions {
            let mut batch = meta.clone();
            if let (Some(var), Some(range)) = (time, year) {
                slice_variable(&mut batch, &var.code, range.clone());
            }
            if let (Some(var), Some(range)) = (region, chunk) {
                slice_variable(&mut batch, &var.code, range.clone());
            }
            batches.push(batch);
        }
    }

    batches
}

fn slice_variable(meta: &mut TableMetadata, code: &str, range: Range<usize>) {
    if let Some(var) = meta.variables.iter_mut().find(|v| v.code == code) {
        var.value_texts =
            var.value_texts.get(range.clone()).map(<[String]>::to_vec).unwrap_or_default();
        var.values = var.values[range].to_vec();
    }
}

/// Counts reported at the end of a data run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataSummary {
    /// Queries posted.
    pub queries: usize,
    /// Cells received across all datasets.
    pub cells: usize,
    /// Cells without a value.
    pub missing: usize,
}

/// Sequential data download with a fixed pause after every query.
#[derive(Debug, Clone, Copy)]
pub struct DataQueryRunner {
    delay: Duration,
    max_rows: usize,
}

impl DataQueryRunner {
    /// Create a runner with an explicit pause and row limit.
    #[must_use]
    pub const fn new(delay: Duration, max_rows: usize) -> Self {
        Self { delay, max_rows }
    }

    /// Create a runner from runtime configuration.
    #[must_use]
    pub const fn from_config(config: &Config) -> Self {
        Self::new(config.query_delay, config.max_query_rows)
    }

    /// Fetch the table's metadata, narrow it with `filter`, and write one
    /// JSON-stat2 dataset per batch as a line of JSON.
    ///
    /// # Errors
    ///
    /// Returns the first API, filter or write error.
    pub async fn run<W: Write>(
        &self,
        client: &SsbClient,
        table_id: u32,
        filter: Option<&MetadataFilter>,
        out: &mut W,
    ) -> ClientResult<DataSummary> {
        let meta = client.table_metadata(table_id).await?;
        let meta = match filter {
            Some(filter) => filter.apply(&meta)?,
            None => meta,
        };

        let batches = plan_batches(&meta, self.max_rows);
        tracing::info!(
            table_id,
            title = %meta.title,
            dimensions = ?meta.dimensions(),
            batches = batches.len(),
            "Planned data queries"
        );

        let mut summary = DataSummary::default();
        for batch in &batches {
            let dataset = client.data_query(table_id, &build_query(batch)).await?;

            tokio::time::sleep(self.delay).await;

            serde_json::to_writer(&mut *out, &dataset)?;
            writeln!(out)?;

            summary.queries += 1;
            summary.cells += dataset.cell_count();
            summary.missing += dataset.missing_count();
        }

        out.flush()?;
        tracing::info!(queries = summary.queries, cells = summary.cells, "Finished data queries");

        Ok(summary)
    }
}
