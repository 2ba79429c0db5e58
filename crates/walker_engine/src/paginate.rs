use engine_logging::{engine_debug, engine_trace, engine_warn};
use serde_json::json;

use crate::context::ensure_context;
use crate::interact::{is_interactable, safe_click, wait_for_element, wait_for_presence};
use crate::settings::WalkerSettings;
use crate::source::{DocumentSource, ElementHandle, SourceError};
use crate::table::{baseline, poll_for_change};
use crate::types::{PageTurn, WalkError};

const SET_SELECT_VALUE_JS: &str = r#"
const select = document.querySelector(arguments[0]);
if (!select) { return false; }
select.value = arguments[1];
select.dispatchEvent(new Event('change', { bubbles: true }));
return true;
"#;

/// Clicks the first usable next-page control and waits for the table to
/// change.
///
/// Candidates are tried in priority order. A control that is hidden, disabled,
/// or marked `disabled` by class or `aria-disabled` is passed over. A click
/// whose table never changes falls through to the remaining controls.
/// `Exhausted` when nothing moved the table.
pub async fn go_next_page(
    source: &dyn DocumentSource,
    settings: &WalkerSettings,
) -> Result<PageTurn, WalkError> {
    let timing = &settings.timing;
    let mut ctx = ensure_context(source, settings).await?;

    for candidate in &settings.next_page_candidates {
        let controls = match source.find_all(&ctx, candidate).await {
            Ok(controls) => controls,
            Err(err) if err.is_transient() => {
                engine_trace!("Next-page candidate {} unreadable: {}", candidate, err);
                continue;
            }
            Err(err) => return Err(err.into()),
        };

        for control in controls {
            if !is_usable(source, &control).await? {
                continue;
            }
            let before = baseline(source, &ctx, settings).await?;
            safe_click(source, &control).await?;

            let table = settings.table();
            if !wait_for_presence(source, &ctx, &table, timing.wait_long, timing.poll_interval)
                .await?
            {
                ctx = ensure_context(source, settings).await?;
            }
            if poll_for_change(source, &ctx, settings, &before).await? {
                engine_debug!("Page advanced via {}", candidate);
                return Ok(PageTurn::Advanced);
            }
            engine_debug!("Click on {} left the table unchanged", candidate);
        }
    }

    engine_debug!("No usable next-page control");
    Ok(PageTurn::Exhausted)
}

async fn is_usable(
    source: &dyn DocumentSource,
    control: &ElementHandle,
) -> Result<bool, SourceError> {
    if !is_interactable(source, control).await? {
        return Ok(false);
    }
    let class = optional(source.attr(control, "class").await)?.unwrap_or_default();
    if class.contains("disabled") {
        return Ok(false);
    }
    let aria = optional(source.attr(control, "aria-disabled").await)?.unwrap_or_default();
    Ok(!aria.eq_ignore_ascii_case("true"))
}

/// Transient read failures read as an absent attribute.
fn optional(read: Result<Option<String>, SourceError>) -> Result<Option<String>, SourceError> {
    match read {
        Err(err) if err.is_transient() => Ok(None),
        other => other,
    }
}

/// Selects the configured rows-per-page value and waits for the redraw.
///
/// Never fatal: a missing control or a select that does not redraw the table
/// only costs extra page turns. Returns whether the requested size is in
/// effect as far as can be observed.
pub async fn set_page_size(
    source: &dyn DocumentSource,
    settings: &WalkerSettings,
) -> Result<bool, WalkError> {
    let Some(target) = settings.page_size.as_deref() else {
        return Ok(true);
    };
    let timing = &settings.timing;
    let ctx = ensure_context(source, settings).await?;

    let control = settings.page_size_control();
    let Some(select) =
        wait_for_element(source, &ctx, &control, timing.wait_long, timing.poll_interval).await?
    else {
        engine_warn!("Page-size control {} not found; keeping default size", control);
        return Ok(false);
    };

    let current = optional(source.property(&select, "value").await)?;
    if current.as_deref() == Some(target) {
        engine_trace!("Page size already {}", target);
        return Ok(true);
    }

    let before = baseline(source, &ctx, settings).await?;
    if let Err(err) = source.select_value(&select, target).await {
        if !err.is_transient() {
            return Err(err.into());
        }
        engine_debug!("Selecting page size failed ({}); setting it by script", err);
        let args = vec![json!(settings.page_size_selector), json!(target)];
        match source.execute(&ctx, SET_SELECT_VALUE_JS, args).await {
            Ok(_) => {}
            Err(err) if err.is_transient() => {
                engine_warn!("Could not set page size to {}: {}", target, err);
                return Ok(false);
            }
            Err(err) => return Err(err.into()),
        }
    }

    let changed = poll_for_change(source, &ctx, settings, &before).await?;
    if changed {
        engine_debug!("Page size set to {}", target);
    } else {
        engine_debug!("Table did not redraw after selecting page size {}", target);
    }
    Ok(changed)
}
