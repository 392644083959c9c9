use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Session setup failed: {0}")]
    Setup(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Timed out waiting for {0}")]
    LookupTimeout(String),

    #[error("Element not found: {0}")]
    NotFound(String),

    #[error("Stale element reference: {0}")]
    StaleElement(String),

    #[error("Element not interactable: {0}")]
    NotInteractable(String),

    #[error("Script error: {0}")]
    Script(String),

    #[error("Screenshot failed: {0}")]
    Screenshot(String),

    #[error("Image decode failed: {0}")]
    ImageDecode(String),

    #[error("Malformed page data: {0}")]
    PageShape(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("WebDriver error: {0}")]
    WebDriver(String),
}

impl Error {
    /// Faults that interaction retries (click, type, keypad capture) absorb
    /// and retry up to their enclosing timeout. Everything else propagates.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::StaleElement(_) | Error::NotInteractable(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
