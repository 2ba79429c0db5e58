use engine_logging::{engine_debug, engine_trace, engine_warn};
use tokio::time::{sleep, Instant};
use walker_core::DetailItem;

use crate::context::ensure_context;
use crate::interact::{click_and_confirm, force_and_confirm, wait_for_clickable};
use crate::settings::WalkerSettings;
use crate::source::{Context, DocumentSource, ElementHandle, SourceError};
use crate::table::read_cells;
use crate::types::WalkError;

/// Opens the detail view of `row`, reads its items and returns to the list.
///
/// The list is showing again when this returns `Ok`, though any element
/// handle taken before the call is stale.
pub async fn fetch_details(
    source: &dyn DocumentSource,
    settings: &WalkerSettings,
    ctx: &Context,
    row: &ElementHandle,
) -> Result<Vec<DetailItem>, WalkError> {
    let action = row_action(source, settings, row).await?;
    let back = settings.back_control();

    let opened = click_and_confirm(
        source,
        ctx,
        &action,
        &back,
        settings.detail_click_attempts,
        settings,
    )
    .await?;
    if !opened {
        force_and_confirm(source, ctx, &action, &back, "detail view", settings).await?;
    }

    let items = read_detail_items(source, settings, ctx).await?;
    return_to_list(source, settings, ctx).await?;
    Ok(items)
}

async fn row_action(
    source: &dyn DocumentSource,
    settings: &WalkerSettings,
    row: &ElementHandle,
) -> Result<ElementHandle, WalkError> {
    for locator in [settings.row_action(), settings.row_action_fallback()] {
        match source.find_within(row, &locator).await {
            Ok(found) => {
                if let Some(action) = found.into_iter().next() {
                    return Ok(action);
                }
            }
            Err(err) if err.is_transient() => {
                engine_trace!("Row action {} unreadable: {}", locator, err);
            }
            Err(err) => return Err(err.into()),
        }
    }
    Err(WalkError::ControlMissing {
        what: format!("row action in column {}", settings.action_column),
    })
}

/// Items of the open detail view. A view without a detail table, or whose
/// table stays empty for `detail_poll_budget`, has no items.
async fn read_detail_items(
    source: &dyn DocumentSource,
    settings: &WalkerSettings,
    ctx: &Context,
) -> Result<Vec<DetailItem>, WalkError> {
    let timing = &settings.timing;
    if !has_detail_table(source, settings, ctx).await? {
        engine_debug!("No detail table");
        return Ok(Vec::new());
    }

    let deadline = Instant::now() + timing.detail_poll_budget;
    loop {
        match read_items_once(source, settings, ctx).await {
            Ok(items) if !items.is_empty() => return Ok(items),
            Ok(_) if Instant::now() >= deadline => return Ok(Vec::new()),
            Ok(_) => {}
            Err(err) if err.is_transient() && Instant::now() < deadline => {
                engine_trace!("Detail rows redrawing: {}", err);
            }
            Err(err) => return Err(err.into()),
        }
        sleep(timing.poll_interval).await;
    }
}

async fn has_detail_table(
    source: &dyn DocumentSource,
    settings: &WalkerSettings,
    ctx: &Context,
) -> Result<bool, WalkError> {
    for locator in [settings.detail_table(), settings.detail_table_partial()] {
        match source.find_all(ctx, &locator).await {
            Ok(found) if !found.is_empty() => return Ok(true),
            Ok(_) => {}
            Err(err) if err.is_transient() => {}
            Err(err) => return Err(err.into()),
        }
    }
    Ok(false)
}

/// Rows with fewer than two cells carry no item and are dropped.
async fn read_items_once(
    source: &dyn DocumentSource,
    settings: &WalkerSettings,
    ctx: &Context,
) -> Result<Vec<DetailItem>, SourceError> {
    let rows = source.find_all(ctx, &settings.detail_rows()).await?;
    let mut items = Vec::with_capacity(rows.len());
    for row in &rows {
        let cells = read_cells(source, row).await?;
        if let [code, description, ..] = cells.as_slice() {
            items.push(DetailItem::new(code.as_str(), description.as_str()));
        }
    }
    Ok(items)
}

/// Leaves the detail view through its back control, falling back to history
/// navigation, and waits for the list table to be reachable again.
pub async fn return_to_list(
    source: &dyn DocumentSource,
    settings: &WalkerSettings,
    ctx: &Context,
) -> Result<Context, WalkError> {
    let timing = &settings.timing;
    let back = settings.back_control();

    let button =
        wait_for_clickable(source, ctx, &back, timing.wait_long, timing.poll_interval).await?;
    let returned = match button {
        Some(button) => {
            click_and_confirm(
                source,
                ctx,
                &button,
                &settings.table(),
                settings.back_click_attempts,
                settings,
            )
            .await?
        }
        None => false,
    };

    if !returned {
        engine_warn!("Back control did not restore the list; navigating back");
        source.navigate_back().await?;
    }
    ensure_context(source, settings).await
}
