use engine_logging::engine_trace;
use tokio::time::{sleep, Instant};
use walker_core::{RowSignature, TableSnapshot};

use crate::settings::WalkerSettings;
use crate::source::{Context, DocumentSource, ElementHandle, SourceError};
use crate::types::WalkError;

/// Current row set of the list table.
///
/// Handles go stale whenever the table redraws, so callers list the rows
/// again instead of holding on to them. Waits up to `wait_short` for at least
/// one row to render; transient failures are retried until `wait_long`.
pub async fn list_rows(
    source: &dyn DocumentSource,
    ctx: &Context,
    settings: &WalkerSettings,
) -> Result<Vec<ElementHandle>, WalkError> {
    let timing = &settings.timing;
    let started = Instant::now();
    let rows = settings.rows();
    loop {
        let elapsed = started.elapsed();
        match source.find_all(ctx, &rows).await {
            Ok(found) if !found.is_empty() || elapsed >= timing.wait_short => return Ok(found),
            Ok(_) => engine_trace!("No rows rendered yet"),
            Err(err) if err.is_transient() && elapsed < timing.wait_long => {
                engine_trace!("Listing rows failed: {}", err);
            }
            Err(err) => return Err(err.into()),
        }
        sleep(timing.poll_interval).await;
    }
}

/// Trimmed text of every cell of `row`, in column order.
pub async fn read_cells(
    source: &dyn DocumentSource,
    row: &ElementHandle,
) -> Result<Vec<String>, SourceError> {
    let cells = source.find_within(row, &WalkerSettings::cells()).await?;
    let mut texts = Vec::with_capacity(cells.len());
    for cell in &cells {
        texts.push(source.text(cell).await?.trim().to_string());
    }
    Ok(texts)
}

/// Row count plus first-row signature, or `None` when the table was
/// redrawing while being read.
pub async fn snapshot(
    source: &dyn DocumentSource,
    ctx: &Context,
    settings: &WalkerSettings,
) -> Result<Option<TableSnapshot>, WalkError> {
    let read = async {
        let rows = source.find_all(ctx, &settings.rows()).await?;
        let signature = match rows.first() {
            Some(first) => {
                let cells = read_cells(source, first).await?;
                let cell = |i: usize| cells.get(i).map(String::as_str).unwrap_or("");
                RowSignature::from_first_row(cell(0), cell(1))
            }
            None => RowSignature::empty(),
        };
        Ok::<_, SourceError>(TableSnapshot {
            signature,
            row_count: rows.len(),
        })
    };
    match read.await {
        Ok(snap) => Ok(Some(snap)),
        Err(err) if err.is_transient() => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Snapshot taken before an action whose effect is detected by change.
/// Retries through redraws for up to `wait_short`; an empty snapshot stands in
/// when the table never settles.
pub async fn baseline(
    source: &dyn DocumentSource,
    ctx: &Context,
    settings: &WalkerSettings,
) -> Result<TableSnapshot, WalkError> {
    let timing = &settings.timing;
    let deadline = Instant::now() + timing.wait_short;
    loop {
        if let Some(snap) = snapshot(source, ctx, settings).await? {
            return Ok(snap);
        }
        if Instant::now() >= deadline {
            return Ok(TableSnapshot::default());
        }
        sleep(timing.poll_interval).await;
    }
}

/// Polls up to `change_poll_iterations` times for the table to differ from
/// `before`.
pub async fn poll_for_change(
    source: &dyn DocumentSource,
    ctx: &Context,
    settings: &WalkerSettings,
    before: &TableSnapshot,
) -> Result<bool, WalkError> {
    let timing = &settings.timing;
    for _ in 0..timing.change_poll_iterations {
        sleep(timing.poll_interval).await;
        if let Some(after) = snapshot(source, ctx, settings).await? {
            if after.changed_from(before) {
                return Ok(true);
            }
        }
    }
    Ok(false)
}
