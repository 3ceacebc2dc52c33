use serde::Serialize;

use crate::table::ColumnNames;
use crate::trace::TraceOptions;
use crate::types::{Direction, StreamOrder};

/// Configuration for building adjoint dictionaries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AdjointOptions {
    /// Whether chains are traced upstream or downstream.
    pub direction: Direction,
    /// Stream order to restrict the tree to; `0` means the whole network.
    pub order: StreamOrder,
    /// Breadth-first trace settings.
    pub trace: TraceOptions,
    /// Source column names.
    pub columns: ColumnNames,
}

impl Default for AdjointOptions {
    fn default() -> Self {
        Self {
            direction: Direction::Upstream,
            order: 0,
            trace: TraceOptions::default(),
            columns: ColumnNames::default(),
        }
    }
}

impl AdjointOptions {
    /// Options tracing in `direction` with every other setting at its default.
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            ..Self::default()
        }
    }

    /// The order filter, or `None` for the whole network.
    pub fn order_filter(&self) -> Option<StreamOrder> {
        (self.order != 0).then_some(self.order)
    }
}
