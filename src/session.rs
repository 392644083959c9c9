use std::sync::Arc;
use std::time::Instant;

use secrecy::ExposeSecret;

use crate::config::{Credentials, ScraperConfig};
use crate::driver::{Driver, Handle};
use crate::error::{Error, Result};
use crate::frame::with_frame;
use crate::keypad::{DigitPad, FingerprintTable};
use crate::locator::{Locator, Resolved};
use crate::model::Contract;
use crate::scraper::ContractScraper;

const COOKIE_DISMISS: &str = "#footer_tc_privacy_button_2";
const CONNECT_BUTTON: &str = "#connect";
const IDENTIFIER_FIELD: &str = "#val_cel_identifiant";
const SUBMIT_BUTTON: &str = "#valider";
const FRAME_LIST: &str = "iframe";
const READY_STATE_PROBE: &str = "return document.readyState;";

/// Label the primary call-to-action shows while unauthenticated.
const LOGIN_PROMPT: &str = "Me connecter";
/// Decorative frames carry empty or near-empty titles; the login frame's
/// title is a full sentence.
const MIN_FRAME_TITLE_LEN: usize = 3;

/// One authenticated portal session: drives the login state machine, then
/// hands off to [`ContractScraper`] for extraction.
pub struct Session {
    driver: Arc<dyn Driver>,
    locator: Locator,
    config: ScraperConfig,
    credentials: Credentials,
    fingerprints: FingerprintTable,
}

impl Session {
    pub fn new(
        driver: Arc<dyn Driver>,
        config: ScraperConfig,
        credentials: Credentials,
        fingerprints: FingerprintTable,
    ) -> Self {
        let locator = Locator::new(
            Arc::clone(&driver),
            config.element_timeout,
            config.poll_interval,
        );
        Self {
            driver,
            locator,
            config,
            credentials,
            fingerprints,
        }
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    /// Run the login state machine to completion. All-or-nothing: any
    /// unresolved wait propagates and no partial progress is exposed.
    pub async fn login(&self) -> Result<()> {
        tracing::info!(url = %self.config.base_url, "opening portal");
        self.driver.open(&self.config.base_url).await?;
        self.wait_ready().await?;

        if let Some(Resolved::One(banner)) = self.locator.probe(COOKIE_DISMISS).await {
            tracing::debug!("dismissing cookie banner");
            banner.click().await?;
        }

        if self.is_authenticated().await? {
            tracing::info!("session already authenticated");
            return Ok(());
        }

        self.locator.one(CONNECT_BUTTON).await?.click().await?;
        let frame = self.find_login_frame().await?;
        with_frame(
            self.driver.as_ref(),
            frame.as_ref(),
            self.enter_credentials(),
        )
        .await?;
        tracing::info!("credentials submitted");
        Ok(())
    }

    /// Walk every account menu and tile, returning the parsed contracts.
    pub async fn dump_all(&self) -> Result<Vec<Contract>> {
        ContractScraper::new(&self.locator, &self.config)
            .scrape_all()
            .await
    }

    /// End the underlying browser session.
    pub async fn close(&self) -> Result<()> {
        self.driver.close().await
    }

    async fn is_authenticated(&self) -> Result<bool> {
        let prompt = self.locator.one(CONNECT_BUTTON).await?.text().await?;
        Ok(prompt != LOGIN_PROMPT)
    }

    /// Poll the page-ready state until the document has finished loading.
    pub async fn wait_ready(&self) -> Result<()> {
        self.locator
            .wait(
                "document ready",
                move || async move {
                    matches!(
                        self.driver.run_script(READY_STATE_PROBE).await,
                        Ok(state) if state.as_str() == Some("complete")
                    )
                },
                self.config.element_timeout,
            )
            .await
    }

    /// The login form lives in the first embedded document with a real
    /// title. The frame list churns while the form pops up, so stale
    /// listings are relisted rather than propagated.
    async fn find_login_frame(&self) -> Result<Box<dyn Handle>> {
        let start = Instant::now();
        loop {
            let frames = self.locator.all(FRAME_LIST).await?;
            match self.first_titled_frame(frames).await {
                Ok(Some(frame)) => return Ok(frame),
                Ok(None) => {}
                Err(e) if e.is_transient() => {}
                Err(e) => return Err(e),
            }
            if start.elapsed() > self.config.element_timeout {
                return Err(Error::LookupTimeout("login frame".into()));
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    async fn first_titled_frame(
        &self,
        frames: Vec<Box<dyn Handle>>,
    ) -> Result<Option<Box<dyn Handle>>> {
        for frame in frames {
            let title = frame.attribute("title").await?.unwrap_or_default();
            if title.len() > MIN_FRAME_TITLE_LEN {
                return Ok(Some(frame));
            }
        }
        Ok(None)
    }

    /// Runs with focus already inside the login frame.
    async fn enter_credentials(&self) -> Result<()> {
        let field = self.locator.one(IDENTIFIER_FIELD).await?;
        self.type_with_retry(field.as_ref(), &self.credentials.user_id, "identifier field")
            .await?;

        let keypad = DigitPad::new(&self.locator, &self.fingerprints, self.config.keypad_attempts)
            .capture()
            .await?;
        keypad
            .press_sequence(self.credentials.password.expose_secret())
            .await?;

        self.locator.one(SUBMIT_BUTTON).await?.click().await?;
        Ok(())
    }

    /// Type into a field that may not be interactable yet, retrying
    /// transient faults up to the typing timeout.
    async fn type_with_retry(&self, handle: &dyn Handle, text: &str, what: &str) -> Result<()> {
        let start = Instant::now();
        loop {
            match handle.type_text(text).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_transient() => {
                    if start.elapsed() > self.config.typing_timeout {
                        return Err(Error::LookupTimeout(what.to_string()));
                    }
                    tokio::time::sleep(self.config.poll_interval).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
