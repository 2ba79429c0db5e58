use crate::{Effect, Msg, OutputRow, Phase, RowRead, TraversalState};

/// Pure update function: applies a message to state and returns any effects.
///
/// Messages that do not belong to the current phase are ignored, so a late or
/// duplicated observation can never move the cursor.
pub fn update(mut state: TraversalState, msg: Msg) -> (TraversalState, Vec<Effect>) {
    let effects = match (state.phase(), msg) {
        (Phase::Starting, Msg::Resumed { checkpoint, processed }) => {
            state.restore(checkpoint, processed);
            if checkpoint.page > 1 {
                state.set_phase(Phase::FastForward {
                    target: checkpoint.page,
                });
                vec![Effect::GoNextPage]
            } else {
                state.set_phase(Phase::IteratePage);
                vec![Effect::ListRows]
            }
        }
        (Phase::FastForward { target }, Msg::PageAdvanced) => {
            state.enter_next_page();
            if state.page() >= target {
                state.set_phase(Phase::IteratePage);
                vec![Effect::ListRows]
            } else {
                vec![Effect::GoNextPage]
            }
        }
        (Phase::FastForward { .. }, Msg::PaginationExhausted) => {
            // The checkpointed page is unreachable; carry on from the page we
            // actually reached. Already recorded codes are still skipped.
            let rebased = crate::Checkpoint::new(state.page(), 0);
            state.set_cursor(rebased);
            state.set_phase(Phase::IteratePage);
            vec![Effect::ListRows]
        }
        (Phase::AdvancePage, Msg::PageAdvanced) => {
            state.enter_next_page();
            state.set_phase(Phase::IteratePage);
            vec![Effect::ListRows]
        }
        (Phase::AdvancePage, Msg::PaginationExhausted) => {
            state.set_phase(Phase::Done);
            vec![Effect::Finish]
        }
        (Phase::IteratePage, Msg::RowsListed { count }) => {
            state.set_page_rows(count);
            let cursor = state.cursor();
            if count == 0 {
                state.set_phase(Phase::Done);
                vec![Effect::Finish]
            } else if cursor.next_row_index >= count {
                let next = cursor.next_page();
                state.set_cursor(next);
                state.set_phase(Phase::AdvancePage);
                let mut effects = save(&state, next);
                effects.push(Effect::GoNextPage);
                effects
            } else {
                vec![Effect::ReadRow {
                    index: cursor.next_row_index,
                }]
            }
        }
        (Phase::IteratePage, Msg::RowRead { index, row })
            if index == state.cursor().next_row_index =>
        {
            match row {
                RowRead::Incomplete { .. } | RowRead::Blank => {
                    state.stats_mut().skipped_blank += 1;
                    skip_row(&mut state)
                }
                RowRead::Category(category) if state.processed().contains(&category.code) => {
                    state.stats_mut().skipped_processed += 1;
                    skip_row(&mut state)
                }
                RowRead::Category(category) => vec![Effect::FetchDetails { index, category }],
            }
        }
        (Phase::IteratePage, Msg::DetailsFetched { category, items }) => {
            let rows = OutputRow::for_category(&category, &items);
            state.record(&category.code, rows.len());
            let next = state.cursor().advance_row();
            state.set_cursor(next);
            let mut effects = vec![Effect::AppendRows(rows)];
            effects.extend(save(&state, next));
            effects.push(Effect::ListRows);
            effects
        }
        _ => Vec::new(),
    };

    (state, effects)
}

fn skip_row(state: &mut TraversalState) -> Vec<Effect> {
    let next = state.cursor().advance_row();
    state.set_cursor(next);
    let mut effects = save(state, next);
    effects.push(Effect::ListRows);
    effects
}

/// A re-based cursor walks rows the loaded checkpoint already covers; those
/// positions are not written back.
fn save(state: &TraversalState, next: crate::Checkpoint) -> Vec<Effect> {
    if state.is_ahead_of_floor(next) {
        vec![Effect::SaveCheckpoint(next)]
    } else {
        Vec::new()
    }
}
