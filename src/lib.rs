pub mod click;
pub mod config;
pub mod driver;
pub mod error;
pub mod frame;
pub mod keypad;
pub mod locator;
pub mod model;
pub mod scraper;
pub mod session;
pub mod webdriver;

pub use click::{ClickTarget, ClickUntil};
pub use config::{ConfigBuilder, Credentials, RetryLimit, ScraperConfig};
pub use driver::{Driver, Handle};
pub use error::{Error, Result};
pub use keypad::{DigitPad, FingerprintEntry, FingerprintTable, KeypadAssignment};
pub use locator::{Locator, Resolved};
pub use model::{Contract, Transaction};
pub use scraper::ContractScraper;
pub use session::Session;
pub use webdriver::WebDriverBackend;
