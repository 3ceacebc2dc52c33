use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::debug;

use super::{ColumnNames, Segment, SegmentTable};
use crate::types::{AdjoinError, Result, SegmentId, StreamOrder};

// 2^63: the first f64 that no longer fits in an i64.
const I64_LIMIT: f64 = 9_223_372_036_854_775_808.0;

impl SegmentTable {
    /// Reads a segment table from a CSV attribute export.
    ///
    /// Header names are matched case-insensitively. The order column is only
    /// mandatory when `require_order` is set; when it is absent otherwise every
    /// segment simply has no order.
    pub fn from_csv_path(
        path: impl AsRef<Path>,
        columns: &ColumnNames,
        require_order: bool,
    ) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let table = Self::from_csv_reader(BufReader::new(file), columns, require_order)?;
        debug!(
            path = %path.display(),
            segments = table.len(),
            "loaded segment table"
        );
        Ok(table)
    }

    /// Reads a segment table from any CSV source.
    pub fn from_csv_reader<R: io::Read>(
        reader: R,
        columns: &ColumnNames,
        require_order: bool,
    ) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);
        let headers = reader.headers()?.clone();

        let id_index = find_column(&headers, &columns.id);
        let next_down_index = find_column(&headers, &columns.next_down);
        let order_index = find_column(&headers, &columns.order);

        let mut missing = Vec::new();
        if id_index.is_none() {
            missing.push(columns.id.clone());
        }
        if next_down_index.is_none() {
            missing.push(columns.next_down.clone());
        }
        if require_order && order_index.is_none() {
            missing.push(columns.order.clone());
        }
        let (Some(id_index), Some(next_down_index)) = (id_index, next_down_index) else {
            return Err(AdjoinError::missing_columns(missing));
        };
        if !missing.is_empty() {
            return Err(AdjoinError::missing_columns(missing));
        }

        let mut segments = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let record = result?;
            let row = idx + 1;
            let id = parse_id_cell(&record, id_index, row, &columns.id)?;
            let next_down = parse_id_cell(&record, next_down_index, row, &columns.next_down)?;
            let order = match order_index {
                Some(order_index) => {
                    let raw = record.get(order_index).unwrap_or_default();
                    normalize_order(raw).ok_or_else(|| invalid(row, &columns.order, raw))?
                }
                None => None,
            };
            segments.push(Segment::new(id, next_down, order));
        }

        Self::with_columns(segments, columns.clone(), order_index.is_some())
    }
}

/// Normalizes integer or integral floating-point text to a segment id.
///
/// `"42"`, `"42.0"` and `"4.2e1"` all yield `42`; fractional, non-finite or
/// out-of-range values yield `None`.
pub fn normalize_id(raw: &str) -> Option<SegmentId> {
    let raw = raw.trim();
    if let Ok(value) = raw.parse::<i64>() {
        return Some(value);
    }
    let value = raw.parse::<f64>().ok()?;
    if value.is_finite() && value.fract() == 0.0 && (-I64_LIMIT..I64_LIMIT).contains(&value) {
        Some(value as i64)
    } else {
        None
    }
}

/// Normalizes a stream order cell.
///
/// Returns `Some(None)` for an absent order (empty, `NaN` or `null`), and
/// `None` when the cell holds something that is not a non-negative integer.
pub fn normalize_order(raw: &str) -> Option<Option<StreamOrder>> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") || raw.eq_ignore_ascii_case("null") {
        return Some(None);
    }
    let value = normalize_id(raw)?;
    StreamOrder::try_from(value).ok().map(Some)
}

fn find_column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.eq_ignore_ascii_case(name))
}

fn parse_id_cell(
    record: &StringRecord,
    index: usize,
    row: usize,
    column: &str,
) -> Result<SegmentId> {
    let raw = record.get(index).unwrap_or_default();
    normalize_id(raw).ok_or_else(|| invalid(row, column, raw))
}

fn invalid(row: usize, column: &str, raw: &str) -> AdjoinError {
    AdjoinError::InvalidValue {
        row,
        column: column.to_string(),
        value: raw.to_string(),
    }
}
