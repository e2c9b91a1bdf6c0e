//! JSON-stat2 dataset returned by a data query.

use serde::{Deserialize, Serialize};

/// A JSON-stat2 dataset.
///
/// Only the fields needed to size the result are typed; everything else
/// (`dimension`, `role`, `status`, ...) is kept verbatim in `extension`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JsonStatDataset {
    /// Dataset class, always "dataset" for data queries.
    #[serde(default)]
    pub class: String,

    /// Dataset label (table title).
    #[serde(default)]
    pub label: Option<String>,

    /// Time of last update.
    #[serde(default)]
    pub updated: Option<String>,

    /// Dimension codes, in value order.
    #[serde(default)]
    pub id: Vec<String>,

    /// Number of categories per dimension, index-aligned with `id`.
    #[serde(default)]
    pub size: Vec<usize>,

    /// Cell values in row-major order; `null` marks a missing cell.
    #[serde(default)]
    pub value: Vec<Option<f64>>,

    /// Remaining members.
    #[serde(flatten)]
    pub extension: serde_json::Map<String, serde_json::Value>,
}

impl JsonStatDataset {
    /// Number of cells the dimensions span.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.size.iter().product()
    }

    /// Number of cells without a value.
    #[must_use]
    pub fn missing_count(&self) -> usize {
        self.value.iter().filter(|v| v.is_none()).count()
    }
}
