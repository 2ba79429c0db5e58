use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use engine_logging::{engine_debug, engine_info, engine_warn};
use futures_util::FutureExt;
use tokio::time::{sleep, Instant};
use walker_core::{update, Category, Effect, Msg, OutputRow, Phase, RowRead, TraversalState};

use crate::checkpoint::CheckpointStore;
use crate::context::ensure_context;
use crate::detail::fetch_details;
use crate::interact::dismiss_cookie_prompt;
use crate::output::OutputStore;
use crate::paginate::{go_next_page, set_page_size};
use crate::settings::WalkerSettings;
use crate::source::{Context, DocumentSource, ElementHandle};
use crate::table::{list_rows, read_cells};
use crate::types::{PageTurn, ProgressSink, SkipReason, WalkError, WalkEvent, WalkSummary};

/// Drives one traversal: runs the core state machine and executes its effects
/// against a document source, the checkpoint file and the output store.
pub struct Walker {
    source: Arc<dyn DocumentSource>,
    settings: WalkerSettings,
    checkpoints: CheckpointStore,
    output: OutputStore,
    sink: Arc<dyn ProgressSink>,
}

/// Per-run bookkeeping that is not part of the traversal state proper.
#[derive(Debug, Default)]
struct RunMarks {
    announced_page: Option<u32>,
    rebased: bool,
}

impl Walker {
    pub fn new(
        source: Arc<dyn DocumentSource>,
        settings: WalkerSettings,
        checkpoints: CheckpointStore,
        output: OutputStore,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            source,
            settings,
            checkpoints,
            output,
            sink,
        }
    }

    /// Runs the traversal to completion or to the first fatal error.
    ///
    /// The document source is released on every exit path, panics included.
    /// Fatal errors carry the checkpoint the next run resumes from.
    pub async fn run(self) -> Result<WalkSummary, WalkError> {
        let outcome = AssertUnwindSafe(self.traverse()).catch_unwind().await;
        if let Err(err) = self.source.release().await {
            engine_warn!("Releasing the document source failed: {}", err);
        }
        engine_logging::clear_cursor();
        match outcome {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    async fn traverse(&self) -> Result<WalkSummary, WalkError> {
        let checkpoint = self.checkpoints.load();
        let processed = self.output.load_processed_codes()?;
        engine_info!(
            "Starting at {} with {} categories already recorded",
            checkpoint,
            processed.len()
        );

        self.start_session()
            .await
            .map_err(|err| err.at(checkpoint))?;

        let mut marks = RunMarks::default();
        let (mut state, effects) = update(
            TraversalState::new(),
            Msg::Resumed {
                checkpoint,
                processed,
            },
        );
        let mut queue: VecDeque<Effect> = effects.into();

        while let Some(effect) = queue.pop_front() {
            let cursor = state.cursor();
            engine_logging::set_cursor(cursor.page, cursor.next_row_index);

            let Some(msg) = self
                .execute(effect, &state, &mut marks)
                .await
                .map_err(|err| err.at(state.resume_point()))?
            else {
                continue;
            };

            if matches!(state.phase(), Phase::FastForward { .. })
                && matches!(msg, Msg::PaginationExhausted)
            {
                marks.rebased = true;
                engine_warn!(
                    "Checkpointed page {} is unreachable; resuming from page {}",
                    cursor.page,
                    state.page()
                );
            }

            let (next, effects) = update(state, msg);
            state = next;
            queue.extend(effects);
        }

        let summary = WalkSummary {
            stats: state.stats(),
            final_checkpoint: state.resume_point(),
            rebased: marks.rebased,
        };
        engine_info!(
            "Traversal finished: {} pages, {} categories, {} rows written",
            summary.stats.pages_visited,
            summary.stats.categories_recorded,
            summary.stats.rows_written
        );
        self.sink.emit(WalkEvent::Finished(summary.clone()));
        Ok(summary)
    }

    async fn start_session(&self) -> Result<(), WalkError> {
        let source = self.source.as_ref();
        engine_info!("Opening {}", self.settings.start_url);
        source.navigate(&self.settings.start_url).await?;
        dismiss_cookie_prompt(source, &self.settings).await;
        let ctx = ensure_context(source, &self.settings).await?;
        engine_debug!("List table lives in {}", ctx.target());
        set_page_size(source, &self.settings).await?;
        Ok(())
    }

    async fn execute(
        &self,
        effect: Effect,
        state: &TraversalState,
        marks: &mut RunMarks,
    ) -> Result<Option<Msg>, WalkError> {
        let source = self.source.as_ref();
        let settings = &self.settings;

        match effect {
            Effect::ListRows => {
                let ctx = ensure_context(source, settings).await?;
                let count = list_rows(source, &ctx, settings).await?.len();
                if marks.announced_page != Some(state.page()) {
                    marks.announced_page = Some(state.page());
                    engine_info!("Page {}: {} rows", state.page(), count);
                    self.sink.emit(WalkEvent::PageEntered {
                        page: state.page(),
                        rows: count,
                    });
                }
                Ok(Some(Msg::RowsListed { count }))
            }
            Effect::ReadRow { index } => {
                let Some((_, _, cells)) = self.locate_row(index).await? else {
                    return self.relisted().await;
                };
                let row = RowRead::classify(&cells, settings.min_columns);
                match &row {
                    RowRead::Incomplete { columns } => {
                        engine_debug!("Row {} has only {} cells; skipping", index, columns);
                        self.sink.emit(WalkEvent::CategorySkipped {
                            index,
                            reason: SkipReason::Blank,
                        });
                    }
                    RowRead::Blank => {
                        engine_debug!("Row {} is blank; skipping", index);
                        self.sink.emit(WalkEvent::CategorySkipped {
                            index,
                            reason: SkipReason::Blank,
                        });
                    }
                    RowRead::Category(category) if state.processed().contains(&category.code) => {
                        engine_debug!("{} already recorded; skipping", category);
                        self.sink.emit(WalkEvent::CategorySkipped {
                            index,
                            reason: SkipReason::AlreadyProcessed,
                        });
                    }
                    RowRead::Category(_) => {}
                }
                Ok(Some(Msg::RowRead { index, row }))
            }
            Effect::FetchDetails { index, category } => {
                let Some((ctx, row, cells)) = self.locate_row(index).await? else {
                    return self.relisted().await;
                };
                // A redraw since the row was read may have put another category here.
                if cells.first().map(String::as_str) != Some(category.code.as_str()) {
                    engine_warn!(
                        "Row {} now shows {:?} instead of {}",
                        index,
                        cells.first(),
                        category.code
                    );
                    return self.relisted().await;
                }
                engine_info!("Category {}", category);
                let items = fetch_details(source, settings, &ctx, &row).await?;
                for item in &items {
                    engine_debug!("  {} - {}", item.code, item.description);
                }
                Ok(Some(Msg::DetailsFetched { category, items }))
            }
            Effect::AppendRows(rows) => {
                self.output.append_rows(&rows)?;
                if let Some(event) = recorded_event(&rows) {
                    self.sink.emit(event);
                }
                sleep(settings.timing.between_categories).await;
                Ok(None)
            }
            Effect::SaveCheckpoint(checkpoint) => {
                self.checkpoints.save(checkpoint)?;
                Ok(None)
            }
            Effect::GoNextPage => match go_next_page(source, settings).await? {
                PageTurn::Advanced => {
                    let ctx = ensure_context(source, settings).await?;
                    set_page_size(source, settings).await?;
                    list_rows(source, &ctx, settings).await?;
                    sleep(settings.timing.between_pages).await;
                    Ok(Some(Msg::PageAdvanced))
                }
                PageTurn::Exhausted => {
                    engine_info!("No further pages");
                    Ok(Some(Msg::PaginationExhausted))
                }
            },
            Effect::Finish => Ok(None),
        }
    }

    /// Lists the rows afresh and reads the one at `index`, retrying through
    /// redraws for up to `wait_long`. `None` when the table now has fewer rows.
    async fn locate_row(
        &self,
        index: usize,
    ) -> Result<Option<(Context, ElementHandle, Vec<String>)>, WalkError> {
        let source = self.source.as_ref();
        let settings = &self.settings;
        let deadline = Instant::now() + settings.timing.wait_long;
        loop {
            let ctx = ensure_context(source, settings).await?;
            let rows = list_rows(source, &ctx, settings).await?;
            let Some(row) = rows.into_iter().nth(index) else {
                return Ok(None);
            };
            // A row that goes stale between listing and reading is listed again.
            match read_cells(source, &row).await {
                Ok(cells) => return Ok(Some((ctx, row, cells))),
                Err(err) if err.is_transient() && Instant::now() < deadline => {
                    engine_debug!("Row {} went stale: {}", index, err);
                    sleep(settings.timing.poll_interval).await;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// The table changed under the cursor; report the current row count so the
    /// state machine re-evaluates its position.
    async fn relisted(&self) -> Result<Option<Msg>, WalkError> {
        let ctx = ensure_context(self.source.as_ref(), &self.settings).await?;
        let count = list_rows(self.source.as_ref(), &ctx, &self.settings)
            .await?
            .len();
        engine_debug!("Rows listed again: {}", count);
        Ok(Some(Msg::RowsListed { count }))
    }
}

fn recorded_event(rows: &[OutputRow]) -> Option<WalkEvent> {
    let first = rows.first()?;
    let detail_items = rows
        .iter()
        .filter(|row| !row.detail_code.is_empty() || !row.detail_description.is_empty())
        .count();
    Some(WalkEvent::CategoryRecorded {
        category: Category::new(
            first.category_code.as_str(),
            first.category_description.as_str(),
        ),
        detail_items,
    })
}
