use crate::{Category, Checkpoint, OutputRow};

/// Work the orchestrator must perform, in the order the effects are returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Advance the list view by one page.
    GoNextPage,
    /// Re-read the visible row set and report its size.
    ListRows,
    /// Read and classify the row at `index` of the freshly listed row set.
    ReadRow { index: usize },
    /// Open the detail view of the row at `index` and collect its items.
    FetchDetails { index: usize, category: Category },
    /// Append rows to the output store.
    AppendRows(Vec<OutputRow>),
    /// Durably overwrite the checkpoint.
    SaveCheckpoint(Checkpoint),
    /// Terminal; release the document source.
    Finish,
}
