use crate::{Checkpoint, ProcessedSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Waiting for the durable state to be loaded.
    #[default]
    Starting,
    /// Skipping pages already covered by the checkpoint.
    FastForward { target: u32 },
    IteratePage,
    AdvancePage,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TraversalStats {
    pub pages_visited: u32,
    pub categories_recorded: usize,
    pub rows_written: usize,
    pub skipped_blank: usize,
    pub skipped_processed: usize,
}

/// Traversal state owned by the orchestrator and advanced only by [`crate::update`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TraversalState {
    phase: Phase,
    /// Page currently displayed by the list view.
    page: u32,
    cursor: Checkpoint,
    /// Checkpoint loaded at start-up. Nothing below it is ever persisted.
    floor: Checkpoint,
    processed: ProcessedSet,
    page_rows: usize,
    stats: TraversalStats,
}

impl TraversalState {
    pub fn new() -> Self {
        Self {
            page: 1,
            ..Self::default()
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn cursor(&self) -> Checkpoint {
        self.cursor
    }

    /// Where a new run should pick up: the cursor, or the loaded checkpoint
    /// while a re-based cursor is still behind it.
    pub fn resume_point(&self) -> Checkpoint {
        self.cursor.max(self.floor)
    }

    pub fn processed(&self) -> &ProcessedSet {
        &self.processed
    }

    /// Row count of the current page as last listed.
    pub fn page_rows(&self) -> usize {
        self.page_rows
    }

    pub fn stats(&self) -> TraversalStats {
        self.stats
    }

    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    pub(crate) fn restore(&mut self, checkpoint: Checkpoint, processed: ProcessedSet) {
        self.cursor = checkpoint;
        self.floor = checkpoint;
        self.processed = processed;
        self.page = 1;
        self.stats.pages_visited = 1;
    }

    pub(crate) fn enter_next_page(&mut self) {
        self.page += 1;
        self.page_rows = 0;
        self.stats.pages_visited += 1;
    }

    /// Move the cursor to `checkpoint`. Only called with a cursor that is not
    /// behind the current one, except when fast-forward fell short.
    pub(crate) fn set_cursor(&mut self, checkpoint: Checkpoint) {
        self.cursor = checkpoint;
    }

    /// Whether `checkpoint` moves the persisted position forward.
    pub(crate) fn is_ahead_of_floor(&self, checkpoint: Checkpoint) -> bool {
        checkpoint > self.floor
    }

    pub(crate) fn set_page_rows(&mut self, count: usize) {
        self.page_rows = count;
    }

    pub(crate) fn record(&mut self, code: &str, rows_written: usize) {
        self.processed.insert(code);
        self.stats.categories_recorded += 1;
        self.stats.rows_written += rows_written;
    }

    pub(crate) fn stats_mut(&mut self) -> &mut TraversalStats {
        &mut self.stats
    }
}
