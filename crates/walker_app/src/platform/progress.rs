use engine_logging::{engine_debug, engine_info};
use walker_engine::{ProgressSink, SkipReason, WalkEvent};

/// Reports walk progress through the log.
#[derive(Debug, Default)]
pub(crate) struct LogProgressSink;

impl ProgressSink for LogProgressSink {
    fn emit(&self, event: WalkEvent) {
        match event {
            WalkEvent::PageEntered { page, rows } => {
                engine_debug!("Entered page {} ({} rows)", page, rows);
            }
            WalkEvent::CategoryRecorded {
                category,
                detail_items,
            } => match detail_items {
                0 => engine_info!("Recorded {} (no detail items)", category),
                n => engine_info!("Recorded {} ({} detail items)", category, n),
            },
            WalkEvent::CategorySkipped { index, reason } => {
                let why = match reason {
                    SkipReason::Blank => "blank or incomplete",
                    SkipReason::AlreadyProcessed => "already recorded",
                };
                engine_debug!("Skipped row {}: {}", index, why);
            }
            WalkEvent::Finished(summary) => {
                engine_info!(
                    "Skipped {} blank and {} already recorded rows; resume point {}",
                    summary.stats.skipped_blank,
                    summary.stats.skipped_processed,
                    summary.final_checkpoint
                );
            }
        }
    }
}
