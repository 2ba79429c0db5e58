use engine_logging::{engine_debug, engine_trace};
use tokio::time::{sleep, Instant};

use crate::settings::WalkerSettings;
use crate::source::{Context, DocumentSource, Locator, SourceError};
use crate::types::WalkError;

/// Finds the context whose document contains the target table: the root
/// document first, then each embedded frame in document order.
///
/// Idempotent and callable from any state. Polls until the table shows up or
/// `wait_long` elapses. Call it again after anything that may navigate.
pub async fn ensure_context(
    source: &dyn DocumentSource,
    settings: &WalkerSettings,
) -> Result<Context, WalkError> {
    let timing = &settings.timing;
    let started = Instant::now();
    let deadline = started + timing.wait_long;
    let table = settings.table();

    loop {
        if let Some(ctx) = probe_contexts(source, &table).await? {
            engine_trace!("Table #{} found in {}", settings.table_id, ctx.target());
            return Ok(ctx);
        }
        if Instant::now() >= deadline {
            return Err(WalkError::ContextNotFound {
                table_id: settings.table_id.clone(),
                waited: started.elapsed(),
            });
        }
        sleep(timing.poll_interval).await;
    }
}

async fn probe_contexts(
    source: &dyn DocumentSource,
    table: &Locator,
) -> Result<Option<Context>, WalkError> {
    let root = Context::root();
    if contains(source, &root, table).await? {
        return Ok(Some(root));
    }

    let frames = match source.find_all(&root, &Locator::css("iframe")).await {
        Ok(frames) => frames.len(),
        Err(err) if err.is_transient() => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    for index in 0..frames {
        let Ok(index) = u16::try_from(index) else {
            break;
        };
        let ctx = Context::frame(index);
        if contains(source, &ctx, table).await? {
            return Ok(Some(ctx));
        }
    }
    Ok(None)
}

async fn contains(
    source: &dyn DocumentSource,
    ctx: &Context,
    table: &Locator,
) -> Result<bool, SourceError> {
    match source.find_all(ctx, table).await {
        Ok(found) => Ok(!found.is_empty()),
        Err(err) if err.is_transient() => {
            engine_debug!("Probing {} failed: {}", ctx.target(), err);
            Ok(false)
        }
        Err(err) => Err(err),
    }
}
