use std::io;

use thiserror::Error;

use super::SegmentId;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AdjoinError>;

/// Errors raised while ingesting tables, building trees or persisting results.
#[derive(Debug, Error)]
pub enum AdjoinError {
    /// One or more required columns are absent from the source table.
    #[error("missing required column(s): {}", .missing.join(", "))]
    Schema {
        /// Names of the missing columns, as configured.
        missing: Vec<String>,
    },
    /// A cell could not be normalized to an integer identifier or order.
    #[error("row {row}: column '{column}' has invalid value '{value}'")]
    InvalidValue {
        /// One-based data row (the header is row 0).
        row: usize,
        /// Column the value was read from.
        column: String,
        /// Raw cell contents.
        value: String,
    },
    /// The same segment id occurs twice in one table.
    #[error("duplicate segment id {0}")]
    DuplicateSegment(SegmentId),
    /// A lookup hit an id that is not a key of the tree.
    #[error("segment {0} is not present in the tree")]
    UnknownId(SegmentId),
    /// A linear walk revisited segments, so the source data contains a loop.
    #[error("chain starting at segment {start} loops after {steps} steps")]
    CycleDetected {
        /// Segment the walk started from.
        start: SegmentId,
        /// Number of hops taken before the loop was detected.
        steps: usize,
    },
    /// Free-form error message.
    #[error("{0}")]
    Message(String),
    /// I/O error.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// CSV parsing error.
    #[error(transparent)]
    Csv(#[from] csv::Error),
    /// JSON encoding or decoding error.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl AdjoinError {
    /// Returns true for errors caused by a missing column.
    pub fn is_schema(&self) -> bool {
        matches!(self, AdjoinError::Schema { .. })
    }

    pub(crate) fn missing_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AdjoinError::Schema {
            missing: columns.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<&str> for AdjoinError {
    fn from(value: &str) -> Self {
        AdjoinError::Message(value.to_string())
    }
}

impl From<String> for AdjoinError {
    fn from(value: String) -> Self {
        AdjoinError::Message(value)
    }
}
