//! Data models for SSB PxWeb API entities.

mod dataset;
mod metadata;
mod table;

pub use dataset::JsonStatDataset;
pub use metadata::{TableMetadata, Variable};
pub use table::{InvalidTimestamp, Published, TableQueryResult};
