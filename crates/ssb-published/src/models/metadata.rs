//! Table metadata returned by `GET <table-api>/<id>`.

use serde::{Deserialize, Serialize};

/// Title and dimensions of a PxWeb table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMetadata {
    /// Table title.
    #[serde(default)]
    pub title: String,

    /// Table variables (dimensions), in query order.
    #[serde(default)]
    pub variables: Vec<Variable>,
}

/// One dimension of a table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    /// Dimension code used in data queries (e.g. "Region", "Tid").
    pub code: String,

    /// Human-readable dimension name.
    #[serde(default)]
    pub text: String,

    /// Value codes.
    #[serde(default)]
    pub values: Vec<String>,

    /// Labels for `values`, index-aligned.
    #[serde(default)]
    pub value_texts: Vec<String>,

    /// Whether the dimension may be left out of a query.
    #[serde(default)]
    pub elimination: bool,

    /// Whether this is the time dimension.
    #[serde(default)]
    pub time: bool,
}

impl TableMetadata {
    /// Dimension codes in order.
    #[must_use]
    pub fn dimensions(&self) -> Vec<&str> {
        self.variables.iter().map(|v| v.code.as_str()).collect()
    }

    /// Look up a variable by code.
    #[must_use]
    pub fn variable(&self, code: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.code == code)
    }

    /// The time dimension, if the table has one.
    #[must_use]
    pub fn time_variable(&self) -> Option<&Variable> {
        self.variables.iter().find(|v| v.time || v.code == "Tid")
    }

    /// The region dimension, if the table has one.
    #[must_use]
    pub fn region_variable(&self) -> Option<&Variable> {
        self.variable("Region")
    }

    /// Number of cells spanned by every dimension not listed in `excluded`.
    ///
    /// Used to size data queries that iterate over `Region` and `Tid`.
    #[must_use]
    pub fn size_excluding(&self, excluded: &[&str]) -> usize {
        self.variables
            .iter()
            .filter(|v| !excluded.contains(&v.code.as_str()))
            .map(|v| v.values.len())
            .product()
    }
}

impl Variable {
    /// Pairs of (value code, label).
    pub fn labelled_values(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().zip(&self.value_texts).map(|(v, t)| (v.as_str(), t.as_str()))
    }
}
