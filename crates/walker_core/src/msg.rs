use crate::{Category, Checkpoint, DetailItem, ProcessedSet, RowRead};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Durable state loaded at start-up; the list view shows page 1.
    Resumed {
        checkpoint: Checkpoint,
        processed: ProcessedSet,
    },
    /// A pagination action produced a confirmed page change.
    PageAdvanced,
    /// No next-page candidate produced a change: the table is exhausted.
    PaginationExhausted,
    /// The visible row set was re-read.
    RowsListed { count: usize },
    /// A single row was read and classified.
    RowRead { index: usize, row: RowRead },
    /// The detail view of a category was visited.
    DetailsFetched {
        category: Category,
        items: Vec<DetailItem>,
    },
}
