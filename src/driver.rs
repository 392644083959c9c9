use async_trait::async_trait;

use crate::error::Result;

/// The browser-control capability the scraping engine consumes.
///
/// One session, one implementor. All element lookups go through CSS
/// selectors; absence is `Ok(None)` / an empty vec, never an error — the
/// [`Locator`](crate::locator::Locator) layer owns retry and timeout
/// semantics on top of this.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Navigate the session to the given URL.
    async fn open(&self, url: &str) -> Result<()>;

    /// Look up a single element in the current document focus.
    async fn find_one(&self, selector: &str) -> Result<Option<Box<dyn Handle>>>;

    /// Look up every element matching the selector in the current document
    /// focus.
    async fn find_all(&self, selector: &str) -> Result<Vec<Box<dyn Handle>>>;

    /// Restore the top-level document as the resolution context.
    async fn switch_to_default(&self) -> Result<()>;

    /// Run a script in the page and return its value.
    async fn run_script(&self, source: &str) -> Result<serde_json::Value>;

    /// End the browser session.
    async fn close(&self) -> Result<()>;
}

/// A live reference to a resolved page element.
///
/// Handles go stale when the DOM under them is replaced; every method may
/// fail with [`Error::StaleElement`](crate::Error::StaleElement), which the
/// retrying layers absorb.
#[async_trait]
pub trait Handle: Send + Sync {
    async fn click(&self) -> Result<()>;

    async fn type_text(&self, text: &str) -> Result<()>;

    /// Capture this element's rendered image as PNG bytes.
    async fn screenshot(&self) -> Result<Vec<u8>>;

    async fn text(&self) -> Result<String>;

    async fn attribute(&self, name: &str) -> Result<Option<String>>;

    /// Focus the embedded document this element hosts. Nested lookups then
    /// resolve inside it until [`Driver::switch_to_default`] is called.
    async fn enter_frame(&self) -> Result<()>;
}
