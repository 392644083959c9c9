use std::time::Duration;

use secrecy::SecretString;

/// How many times a retry loop may go around before giving up.
///
/// The portal recovers from most lost clicks and half-rendered keypads on
/// its own, so the retry loops default to unbounded; callers that need a
/// hard ceiling opt into one here rather than relying on loop structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryLimit {
    Unbounded,
    Capped(u32),
}

impl RetryLimit {
    pub fn exhausted(self, attempts: u32) -> bool {
        match self {
            RetryLimit::Unbounded => false,
            RetryLimit::Capped(max) => attempts >= max,
        }
    }
}

/// Login identity: the typed user id and the numeric code entered through
/// the on-screen keypad.
pub struct Credentials {
    pub user_id: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(user_id: impl Into<String>, password: SecretString) -> Self {
        Self {
            user_id: user_id.into(),
            password,
        }
    }
}

/// Timeouts, poll intervals and retry policies for one scraping session.
pub struct ScraperConfig {
    /// Portal root the session navigates to first.
    pub base_url: String,
    /// Deadline for a required element to stabilize (default: 10s).
    pub element_timeout: Duration,
    /// Deadline for retry-typing into a field (default: 3s).
    pub typing_timeout: Duration,
    /// Interval between element resolution attempts (default: 100ms).
    pub poll_interval: Duration,
    /// Minimum spacing between re-clicks of the same target (default: 1s).
    pub click_retry_interval: Duration,
    /// Interval between condition checks while a click settles (default: 100ms).
    pub click_poll_interval: Duration,
    /// Click attempts per condition-gated click.
    pub click_attempts: RetryLimit,
    /// Full keypad recapture attempts.
    pub keypad_attempts: RetryLimit,
    /// Click attempts for expanding a collapsed transaction history.
    pub expand_attempts: RetryLimit,
    /// Deadline for transaction rows to appear; expiry means no history
    /// (default: 2s).
    pub history_timeout: Duration,
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.labanquepostale.fr".into(),
            element_timeout: Duration::from_secs(10),
            typing_timeout: Duration::from_secs(3),
            poll_interval: Duration::from_millis(100),
            click_retry_interval: Duration::from_secs(1),
            click_poll_interval: Duration::from_millis(100),
            click_attempts: RetryLimit::Unbounded,
            keypad_attempts: RetryLimit::Unbounded,
            expand_attempts: RetryLimit::Capped(5),
            history_timeout: Duration::from_secs(2),
            headless: true,
            window_width: 1920,
            window_height: 1080,
        }
    }
}

impl ScraperConfig {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

pub struct ConfigBuilder {
    config: ScraperConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ScraperConfig::default(),
        }
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn element_timeout(mut self, timeout: Duration) -> Self {
        self.config.element_timeout = timeout;
        self
    }

    pub fn typing_timeout(mut self, timeout: Duration) -> Self {
        self.config.typing_timeout = timeout;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    pub fn click_retry_interval(mut self, interval: Duration) -> Self {
        self.config.click_retry_interval = interval;
        self
    }

    pub fn click_poll_interval(mut self, interval: Duration) -> Self {
        self.config.click_poll_interval = interval;
        self
    }

    pub fn click_attempts(mut self, limit: RetryLimit) -> Self {
        self.config.click_attempts = limit;
        self
    }

    pub fn keypad_attempts(mut self, limit: RetryLimit) -> Self {
        self.config.keypad_attempts = limit;
        self
    }

    pub fn expand_attempts(mut self, limit: RetryLimit) -> Self {
        self.config.expand_attempts = limit;
        self
    }

    pub fn history_timeout(mut self, timeout: Duration) -> Self {
        self.config.history_timeout = timeout;
        self
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    pub fn window(mut self, width: u32, height: u32) -> Self {
        self.config.window_width = width;
        self.config.window_height = height;
        self
    }

    pub fn build(self) -> ScraperConfig {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
