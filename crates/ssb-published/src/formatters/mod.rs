//! Plain-text rendering of lookup results and table metadata.

use crate::models::{TableMetadata, TableQueryResult};

/// Output line for one table: `<published> <id>`.
#[must_use]
pub fn published_line(record: &TableQueryResult, table_id: u32) -> String {
    format!("{} {}", record.published, table_id)
}

/// Title line followed by one tab-separated line per variable.
///
/// With `with_values`, each variable line is followed by its value codes and
/// labels, indented by one tab.
#[must_use]
pub fn format_metadata(meta: &TableMetadata, with_values: bool) -> String {
    let mut output = format!("{}\n", meta.title);

    for var in &meta.variables {
        output.push_str(&format!("{}\t{}\t{} values", var.code, var.text, var.values.len()));
        if var.time {
            output.push_str("\t(time)");
        }
        if var.elimination {
            output.push_str("\t(optional)");
        }
        output.push('\n');

        if with_values {
            for (value, label) in var.labelled_values() {
                output.push_str(&format!("\t{value}\t{label}\n"));
            }
        }
    }

    output
}
