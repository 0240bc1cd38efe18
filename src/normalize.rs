use crate::bundle::TableData;
use anyhow::Result;
use arrow::record_batch::RecordBatch;
use tracing::debug;

/// Reason reported when a source had nothing for a category.
pub const SKIP_NO_DATA: &str = "no data for this category";
/// Reason reported when a category value is not tabular at all.
pub const SKIP_NOT_TABULAR: &str = "not a recognized tabular type";

/// Outcome of normalizing one category value.
#[derive(Debug)]
pub enum Normalized {
    Table(RecordBatch),
    Skip { reason: &'static str },
}

/// Coerce one category value into a standard table, or decide to skip it.
///
/// The arms run in the fixed decision order: absent values skip, column-major
/// values convert ahead of record promotion, single records promote to a
/// one-row table, standard tables pass through, anything else skips.
pub fn normalize(data: TableData) -> Result<Normalized> {
    match data {
        TableData::Absent => Ok(Normalized::Skip {
            reason: SKIP_NO_DATA,
        }),
        TableData::Columnar(columns) => Ok(Normalized::Table(columns.to_record_batch()?)),
        TableData::Record(record) => Ok(Normalized::Table(record.to_record_batch()?)),
        TableData::Table(batch) => Ok(Normalized::Table(batch)),
        TableData::Unrecognized(what) => {
            debug!(value = %what, "category value is not tabular");
            Ok(Normalized::Skip {
                reason: SKIP_NOT_TABULAR,
            })
        }
    }
}
