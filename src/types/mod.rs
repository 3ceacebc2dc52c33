#![forbid(unsafe_code)]

//! Core identifiers and error types shared by every module.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

mod error;

pub use error::{AdjoinError, Result};

/// Identifier of a network segment after ingestion normalization.
pub type SegmentId = i64;

/// Stream order classification (for example Strahler order).
pub type StreamOrder = u32;

/// Reserved next-down value marking a segment without a downstream neighbor.
pub const OUTLET: SegmentId = -1;

/// Which way a tree points and a trace walks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Towards the headwaters: each segment maps to the segments flowing into it.
    Upstream,
    /// Towards the outlet: each segment maps to the segment it flows into.
    Downstream,
}

impl Direction {
    /// Short lowercase label used in file names and reports.
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Upstream => "upstream",
            Direction::Downstream => "downstream",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = AdjoinError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "up" | "upstream" => Ok(Direction::Upstream),
            "down" | "downstream" => Ok(Direction::Downstream),
            other => Err(AdjoinError::Message(format!(
                "unknown direction '{other}', expected upstream or downstream"
            ))),
        }
    }
}
