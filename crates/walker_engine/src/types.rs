use std::time::Duration;

use thiserror::Error;
use walker_core::{Category, Checkpoint, TraversalStats};

use crate::persist::PersistError;
use crate::source::{Locator, SourceError};

/// Outcome of a pagination attempt. Exhaustion is the normal end of data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageTurn {
    Advanced,
    Exhausted,
}

#[derive(Debug, Error)]
pub enum WalkError {
    #[error("table #{table_id} not found in root document or any frame after {waited:?}")]
    ContextNotFound { table_id: String, waited: Duration },
    #[error("{what} never confirmed {probe} after a forced click")]
    InteractionTimeout { what: String, probe: Locator },
    #[error("{what} is missing")]
    ControlMissing { what: String },
    #[error("document source: {0}")]
    Source(#[from] SourceError),
    #[error("persistence: {0}")]
    Persist(#[from] PersistError),
    #[error("at {checkpoint}: {source}")]
    At {
        checkpoint: Checkpoint,
        #[source]
        source: Box<WalkError>,
    },
}

impl WalkError {
    /// Attach the resume position to a fatal error, once.
    pub fn at(self, checkpoint: Checkpoint) -> Self {
        match self {
            WalkError::At { .. } => self,
            other => WalkError::At {
                checkpoint,
                source: Box::new(other),
            },
        }
    }

    pub fn checkpoint(&self) -> Option<Checkpoint> {
        match self {
            WalkError::At { checkpoint, .. } => Some(*checkpoint),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Blank,
    AlreadyProcessed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkEvent {
    PageEntered { page: u32, rows: usize },
    CategoryRecorded {
        category: Category,
        detail_items: usize,
    },
    CategorySkipped {
        index: usize,
        reason: SkipReason,
    },
    Finished(WalkSummary),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkSummary {
    pub stats: TraversalStats,
    pub final_checkpoint: Checkpoint,
    /// Fast-forward could not reach the checkpointed page.
    pub rebased: bool,
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: WalkEvent);
}

/// Sink that drops every event.
#[derive(Debug, Default)]
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn emit(&self, _event: WalkEvent) {}
}
