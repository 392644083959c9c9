use std::future::Future;
use std::time::{Duration, Instant};

use crate::config::RetryLimit;
use crate::driver::Handle;
use crate::error::{Error, Result};
use crate::locator::Locator;

/// What to click. A `Reference` is re-resolved fresh on every retry cycle,
/// so it survives DOM replacement; a `Resolved` handle is clicked as-is.
pub enum ClickTarget<'a> {
    Reference(&'a str),
    Resolved(&'a dyn Handle),
}

impl ClickTarget<'_> {
    fn describe(&self) -> String {
        match self {
            ClickTarget::Reference(reference) => (*reference).to_string(),
            ClickTarget::Resolved(_) => "resolved element".to_string(),
        }
    }
}

/// Clicks a target until a caller-supplied condition holds, compensating
/// for clicks lost to re-renders.
///
/// Clicks land at most once per `retry_interval`; between clicks the
/// condition is polled at `poll_interval`. Stale and not-interactable
/// faults during the click are absorbed and the whole cycle retried.
pub struct ClickUntil<'a> {
    locator: &'a Locator,
    retry_interval: Duration,
    poll_interval: Duration,
    attempts: RetryLimit,
}

impl<'a> ClickUntil<'a> {
    pub fn new(
        locator: &'a Locator,
        retry_interval: Duration,
        poll_interval: Duration,
        attempts: RetryLimit,
    ) -> Self {
        Self {
            locator,
            retry_interval,
            poll_interval,
            attempts,
        }
    }

    async fn click_once(&self, target: &ClickTarget<'_>) -> Result<()> {
        match target {
            ClickTarget::Reference(reference) => self.locator.one(reference).await?.click().await,
            ClickTarget::Resolved(handle) => handle.click().await,
        }
    }

    /// Click `target` until `condition()` holds. Returns only once it does,
    /// or with `LookupTimeout` when the attempt cap is exhausted while the
    /// condition is still false.
    pub async fn run<C, Fut>(&self, target: ClickTarget<'_>, mut condition: C) -> Result<()>
    where
        C: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        let mut attempts: u32 = 0;
        let mut last_click: Option<Instant> = None;
        loop {
            let due = last_click.map_or(true, |at| at.elapsed() >= self.retry_interval);
            if due {
                if self.attempts.exhausted(attempts) {
                    return Err(Error::LookupTimeout(target.describe()));
                }
                attempts += 1;
                match self.click_once(&target).await {
                    Ok(()) => last_click = Some(Instant::now()),
                    // The element vanished or was covered mid-click; the
                    // next cycle resolves and clicks again.
                    Err(e) if e.is_transient() => last_click = Some(Instant::now()),
                    Err(e) => return Err(e),
                }
            }
            if condition().await {
                return Ok(());
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
