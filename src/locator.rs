use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::driver::{Driver, Handle};
use crate::error::{Error, Result};

/// Outcome of a successful resolution: a single element for an identity
/// reference, one-or-more elements for a group reference. The caller knows
/// in advance which shape to expect.
pub enum Resolved {
    One(Box<dyn Handle>),
    Many(Vec<Box<dyn Handle>>),
}

/// An identity reference names exactly one element; anything else is a
/// group reference. The marker is a leading `#` with no whitespace in the
/// rest of the selector.
fn is_identity_reference(reference: &str) -> bool {
    reference.starts_with('#') && !reference.contains(char::is_whitespace)
}

/// Resolves logical element references against a page that is under
/// continuous asynchronous mutation, by polling until the reference
/// stabilizes or a deadline passes.
#[derive(Clone)]
pub struct Locator {
    driver: Arc<dyn Driver>,
    timeout: Duration,
    poll_interval: Duration,
}

impl Locator {
    pub fn new(driver: Arc<dyn Driver>, timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            driver,
            timeout,
            poll_interval,
        }
    }

    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    pub fn default_timeout(&self) -> Duration {
        self.timeout
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// One lookup round-trip. A group reference with zero matches counts as
    /// missing, not as an empty success.
    async fn try_lookup(&self, reference: &str) -> Result<Resolved> {
        if is_identity_reference(reference) {
            match self.driver.find_one(reference).await? {
                Some(handle) => Ok(Resolved::One(handle)),
                None => Err(Error::NotFound(reference.to_string())),
            }
        } else {
            let handles = self.driver.find_all(reference).await?;
            if handles.is_empty() {
                Err(Error::NotFound(reference.to_string()))
            } else {
                Ok(Resolved::Many(handles))
            }
        }
    }

    /// Resolve `reference`, retrying missing and stale lookups every poll
    /// interval until `timeout` elapses. Any other fault propagates
    /// immediately.
    pub async fn resolve(&self, reference: &str, timeout: Duration) -> Result<Resolved> {
        let start = Instant::now();
        loop {
            match self.try_lookup(reference).await {
                Ok(found) => return Ok(found),
                Err(Error::NotFound(_)) | Err(Error::StaleElement(_)) => {
                    if start.elapsed() > timeout {
                        return Err(Error::LookupTimeout(reference.to_string()));
                    }
                    tokio::time::sleep(self.poll_interval).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Single synchronous probe: the match if it is there right now, `None`
    /// otherwise. Never blocks beyond one lookup, never raises. Meant for
    /// cheap "has this appeared yet" checks inside conditions.
    pub async fn probe(&self, reference: &str) -> Option<Resolved> {
        self.try_lookup(reference).await.ok()
    }

    /// Resolve an identity reference to its single handle, with the
    /// configured default timeout.
    pub async fn one(&self, reference: &str) -> Result<Box<dyn Handle>> {
        match self.resolve(reference, self.timeout).await? {
            Resolved::One(handle) => Ok(handle),
            Resolved::Many(_) => Err(Error::PageShape(format!(
                "expected an identity reference: {reference}"
            ))),
        }
    }

    /// Resolve a group reference to its (non-empty) handles, with the
    /// configured default timeout.
    pub async fn all(&self, reference: &str) -> Result<Vec<Box<dyn Handle>>> {
        match self.resolve(reference, self.timeout).await? {
            Resolved::Many(handles) => Ok(handles),
            Resolved::One(_) => Err(Error::PageShape(format!(
                "expected a group reference: {reference}"
            ))),
        }
    }

    /// Poll `condition` at the configured interval until it holds or
    /// `timeout` elapses. `what` names the wait in the timeout error.
    pub async fn wait<C, Fut>(&self, what: &str, mut condition: C, timeout: Duration) -> Result<()>
    where
        C: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        let start = Instant::now();
        while !condition().await {
            if start.elapsed() > timeout {
                return Err(Error::LookupTimeout(what.to_string()));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
        Ok(())
    }
}
