use std::time::Duration;

use engine_logging::{engine_debug, engine_warn};
use tokio::time::{sleep, Instant};

use crate::settings::{Timing, WalkerSettings};
use crate::source::{Context, DocumentSource, ElementHandle, Locator, SourceError};
use crate::types::WalkError;

/// Delay schedule of [`click_and_confirm`].
#[derive(Debug, Clone)]
pub struct Backoff {
    pub base: Duration,
    pub step: Duration,
    pub jitter_max: Duration,
    pub penalty: Duration,
    pub penalty_step: Duration,
}

impl Backoff {
    pub fn from_timing(timing: &Timing) -> Self {
        Self {
            base: timing.post_click,
            step: timing.backoff_step,
            jitter_max: timing.jitter_max,
            penalty: timing.retry_penalty,
            penalty_step: timing.retry_penalty_step,
        }
    }

    /// Settle time after the click of `attempt` (1-based):
    /// `base + (attempt - 1) * step + jitter`.
    pub fn settle(&self, attempt: u32) -> Duration {
        self.base + self.step * attempt.saturating_sub(1) + self.jitter()
    }

    /// Extra pause before retrying after `attempt` failed.
    pub fn penalty(&self, attempt: u32) -> Duration {
        self.penalty + self.penalty_step * attempt
    }

    fn jitter(&self) -> Duration {
        let max = u64::try_from(self.jitter_max.as_millis()).unwrap_or(u64::MAX);
        if max == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(fastrand::u64(0..=max))
    }
}

/// Polls until `locator` matches at least one element in `ctx`.
/// Returns `false` once `timeout` elapses.
pub async fn wait_for_presence(
    source: &dyn DocumentSource,
    ctx: &Context,
    locator: &Locator,
    timeout: Duration,
    poll: Duration,
) -> Result<bool, WalkError> {
    Ok(wait_for_element(source, ctx, locator, timeout, poll)
        .await?
        .is_some())
}

/// Like [`wait_for_presence`], returning the first match.
pub async fn wait_for_element(
    source: &dyn DocumentSource,
    ctx: &Context,
    locator: &Locator,
    timeout: Duration,
    poll: Duration,
) -> Result<Option<ElementHandle>, WalkError> {
    wait_for(source, ctx, locator, timeout, poll, false).await
}

/// Polls until an element matching `locator` is displayed and enabled.
pub async fn wait_for_clickable(
    source: &dyn DocumentSource,
    ctx: &Context,
    locator: &Locator,
    timeout: Duration,
    poll: Duration,
) -> Result<Option<ElementHandle>, WalkError> {
    wait_for(source, ctx, locator, timeout, poll, true).await
}

async fn wait_for(
    source: &dyn DocumentSource,
    ctx: &Context,
    locator: &Locator,
    timeout: Duration,
    poll: Duration,
    clickable: bool,
) -> Result<Option<ElementHandle>, WalkError> {
    let deadline = Instant::now() + timeout;
    loop {
        match source.find_all(ctx, locator).await {
            Ok(found) => {
                for element in found {
                    if !clickable || is_interactable(source, &element).await? {
                        return Ok(Some(element));
                    }
                }
            }
            Err(err) if err.is_transient() => {}
            Err(err) => return Err(err.into()),
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        sleep(poll).await;
    }
}

/// Displayed and enabled. Elements that vanish while being checked are not.
pub async fn is_interactable(
    source: &dyn DocumentSource,
    element: &ElementHandle,
) -> Result<bool, SourceError> {
    let state = match source.is_displayed(element).await {
        Ok(true) => source.is_enabled(element).await,
        other => other,
    };
    match state {
        Ok(ok) => Ok(ok),
        Err(err) if err.is_transient() => Ok(false),
        Err(err) => Err(err),
    }
}

/// Scrolls `target` into view and clicks it, falling back to a forced
/// script click when the native click fails for any transient reason.
pub async fn safe_click(
    source: &dyn DocumentSource,
    target: &ElementHandle,
) -> Result<(), SourceError> {
    if let Err(err) = source.scroll_into_view(target).await {
        if !err.is_transient() {
            return Err(err);
        }
        engine_debug!("Scroll into view failed: {}", err);
    }
    match source.click(target).await {
        Ok(()) => Ok(()),
        Err(err) if err.is_transient() => {
            engine_debug!("Native click failed ({}); forcing", err);
            match source.force_click(target).await {
                Ok(()) => Ok(()),
                Err(err) if err.is_transient() => {
                    engine_debug!("Forced click failed: {}", err);
                    Ok(())
                }
                Err(err) => Err(err),
            }
        }
        Err(err) => Err(err),
    }
}

/// Clicks `target` until `probe` appears in `ctx`, at most `max_attempts`
/// times with increasing settle delays. `Ok(false)` when every attempt went
/// unconfirmed; the caller decides whether that is fatal.
pub async fn click_and_confirm(
    source: &dyn DocumentSource,
    ctx: &Context,
    target: &ElementHandle,
    probe: &Locator,
    max_attempts: u32,
    settings: &WalkerSettings,
) -> Result<bool, WalkError> {
    let timing = &settings.timing;
    let backoff = Backoff::from_timing(timing);

    for attempt in 1..=max_attempts {
        safe_click(source, target).await?;
        sleep(backoff.settle(attempt)).await;

        if wait_for_presence(source, ctx, probe, timing.wait_long, timing.poll_interval).await? {
            return Ok(true);
        }
        if attempt < max_attempts {
            engine_debug!(
                "Click attempt {}/{} not confirmed by {}",
                attempt,
                max_attempts,
                probe
            );
            sleep(backoff.penalty(attempt)).await;
        }
    }
    Ok(false)
}

/// Last resort after [`click_and_confirm`] gave up: one forced click and a
/// bounded wait. Expiry is fatal instead of hanging the run.
pub async fn force_and_confirm(
    source: &dyn DocumentSource,
    ctx: &Context,
    target: &ElementHandle,
    probe: &Locator,
    what: &str,
    settings: &WalkerSettings,
) -> Result<(), WalkError> {
    let timing = &settings.timing;
    engine_warn!("{} unconfirmed after retries; forcing one last click", what);
    if let Err(err) = source.force_click(target).await {
        if !err.is_transient() {
            return Err(err.into());
        }
        engine_debug!("Last-resort click failed: {}", err);
    }
    if wait_for_presence(source, ctx, probe, timing.last_resort_wait, timing.poll_interval).await? {
        Ok(())
    } else {
        Err(WalkError::InteractionTimeout {
            what: what.to_string(),
            probe: probe.clone(),
        })
    }
}

/// Best-effort dismissal of a cookie-consent prompt in the root document.
pub async fn dismiss_cookie_prompt(source: &dyn DocumentSource, settings: &WalkerSettings) {
    let Some(prompt) = settings.cookie_prompt.as_ref() else {
        return;
    };
    let timing = &settings.timing;
    let root = Context::root();
    match wait_for_clickable(source, &root, prompt, timing.wait_short, timing.poll_interval).await {
        Ok(Some(button)) => match safe_click(source, &button).await {
            Ok(()) => engine_debug!("Cookie prompt dismissed"),
            Err(err) => engine_debug!("Cookie prompt click failed: {}", err),
        },
        Ok(None) => engine_debug!("No cookie prompt"),
        Err(err) => engine_debug!("Cookie prompt lookup failed: {}", err),
    }
}
