use std::sync::Arc;

use async_trait::async_trait;
use thirtyfour::error::WebDriverError;
use thirtyfour::prelude::*;

use crate::config::ScraperConfig;
use crate::driver::{Driver, Handle};
use crate::error::{Error, Result};

/// Chrome flags that keep the portal from flagging the session as automated.
const CHROME_ARGS: &[&str] = &[
    "--disable-blink-features=AutomationControlled",
    "--disable-infobars",
    "--no-first-run",
    "--no-default-browser-check",
];

/// The concrete [`Driver`] adapter over a Selenium WebDriver session.
pub struct WebDriverBackend {
    driver: WebDriver,
}

impl WebDriverBackend {
    /// Open a WebDriver session against a running chromedriver and wrap it
    /// as the engine's driver capability.
    pub async fn connect(server_url: &str, config: &ScraperConfig) -> Result<Arc<dyn Driver>> {
        let mut caps = DesiredCapabilities::chrome();
        for arg in CHROME_ARGS {
            caps.add_arg(arg)
                .map_err(|e| Error::Setup(e.to_string()))?;
        }
        if config.headless {
            caps.add_arg("--headless=new")
                .map_err(|e| Error::Setup(e.to_string()))?;
        }
        caps.add_arg(&format!(
            "--window-size={},{}",
            config.window_width, config.window_height
        ))
        .map_err(|e| Error::Setup(e.to_string()))?;

        let driver = WebDriver::new(server_url, caps)
            .await
            .map_err(|e| Error::Setup(e.to_string()))?;
        Ok(Arc::new(Self { driver }))
    }

    /// Wrap an already-established WebDriver session.
    pub fn from_session(driver: WebDriver) -> Arc<dyn Driver> {
        Arc::new(Self { driver })
    }
}

/// Map WebDriver protocol error codes onto the crate taxonomy so the retry
/// layers can tell transient faults from terminal ones.
fn map_err(err: WebDriverError) -> Error {
    let message = err.to_string();
    match err {
        WebDriverError::NoSuchElement(_) => Error::NotFound(message),
        WebDriverError::StaleElementReference(_) => Error::StaleElement(message),
        WebDriverError::ElementNotInteractable(_) | WebDriverError::ElementClickIntercepted(_) => {
            Error::NotInteractable(message)
        }
        _ => Error::WebDriver(message),
    }
}

#[async_trait]
impl Driver for WebDriverBackend {
    async fn open(&self, url: &str) -> Result<()> {
        self.driver
            .goto(url)
            .await
            .map_err(|e| Error::Navigation(e.to_string()))
    }

    async fn find_one(&self, selector: &str) -> Result<Option<Box<dyn Handle>>> {
        match self.driver.find(By::Css(selector)).await {
            Ok(el) => Ok(Some(Box::new(WdHandle { element: el }))),
            Err(WebDriverError::NoSuchElement(_)) => Ok(None),
            Err(e) => Err(map_err(e)),
        }
    }

    async fn find_all(&self, selector: &str) -> Result<Vec<Box<dyn Handle>>> {
        let els = self
            .driver
            .find_all(By::Css(selector))
            .await
            .map_err(map_err)?;
        Ok(els
            .into_iter()
            .map(|element| Box::new(WdHandle { element }) as Box<dyn Handle>)
            .collect())
    }

    async fn switch_to_default(&self) -> Result<()> {
        self.driver.enter_default_frame().await.map_err(map_err)
    }

    async fn run_script(&self, source: &str) -> Result<serde_json::Value> {
        let ret = self
            .driver
            .execute(source, vec![])
            .await
            .map_err(|e| Error::Script(e.to_string()))?;
        Ok(ret.json().clone())
    }

    async fn close(&self) -> Result<()> {
        self.driver
            .clone()
            .quit()
            .await
            .map_err(|e| Error::WebDriver(e.to_string()))
    }
}

struct WdHandle {
    element: WebElement,
}

#[async_trait]
impl Handle for WdHandle {
    async fn click(&self) -> Result<()> {
        self.element.click().await.map_err(map_err)
    }

    async fn type_text(&self, text: &str) -> Result<()> {
        self.element.send_keys(text).await.map_err(map_err)
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        self.element
            .screenshot_as_png()
            .await
            .map_err(|e| Error::Screenshot(e.to_string()))
    }

    async fn text(&self) -> Result<String> {
        self.element.text().await.map_err(map_err)
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>> {
        self.element.attr(name).await.map_err(map_err)
    }

    async fn enter_frame(&self) -> Result<()> {
        self.element.clone().enter_frame().await.map_err(map_err)
    }
}
