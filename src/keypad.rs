use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::RetryLimit;
use crate::driver::Handle;
use crate::error::{Error, Result};
use crate::locator::Locator;

/// The keypad renders four rows of four buttons; only ten carry digits,
/// the rest are decoys.
const KEYPAD_CELLS: usize = 16;
const KEYPAD_CELL_PREFIX: &str = "#val_cel_";
const DIGIT_COUNT: usize = 10;

/// One reference fingerprint: the mean-luminance value a known glyph
/// renders to, and the digit it stands for. `digit: None` marks a decoy
/// glyph that must never be pressed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintEntry {
    pub value: f64,
    pub digit: Option<u8>,
}

/// Immutable reference table mapping fingerprint values to digits, loaded
/// once before any capture and shared read-only for the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FingerprintTable {
    entries: Vec<FingerprintEntry>,
}

impl FingerprintTable {
    pub fn from_entries(entries: Vec<FingerprintEntry>) -> Self {
        Self { entries }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Parse(e.to_string()))
    }

    /// Nearest-match classification: the digit of the entry whose reference
    /// value is closest to `fingerprint`, or `None` when the nearest entry
    /// is a decoy (or the table is empty).
    pub fn classify(&self, fingerprint: f64) -> Option<u8> {
        let mut best: Option<&FingerprintEntry> = None;
        let mut best_distance = f64::INFINITY;
        for entry in &self.entries {
            let distance = (entry.value - fingerprint).abs();
            if distance < best_distance {
                best_distance = distance;
                best = Some(entry);
            }
        }
        best.and_then(|entry| entry.digit)
    }
}

/// Reduce a button's rendered PNG to its scalar fingerprint: mean luminance
/// over the 8-bit grayscale rendering. Stable across repeated captures of
/// the same glyph; the table's reference values use the same reduction.
pub fn fingerprint(png: &[u8]) -> Result<f64> {
    let gray = image::load_from_memory(png)
        .map_err(|e| Error::ImageDecode(e.to_string()))?
        .to_luma8();
    let raw = gray.as_raw();
    if raw.is_empty() {
        return Err(Error::ImageDecode("empty button image".into()));
    }
    let sum: u64 = raw.iter().map(|&p| u64::from(p)).sum();
    Ok(sum as f64 / raw.len() as f64)
}

/// Digit → button mapping for one shuffled keypad instance. Only ever
/// constructed complete: all ten digits, no collisions.
pub struct KeypadAssignment {
    buttons: BTreeMap<u8, Box<dyn Handle>>,
}

impl KeypadAssignment {
    pub fn len(&self) -> usize {
        self.buttons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buttons.is_empty()
    }

    pub fn get(&self, digit: u8) -> Option<&dyn Handle> {
        self.buttons.get(&digit).map(|b| b.as_ref())
    }

    pub fn digits(&self) -> impl Iterator<Item = u8> + '_ {
        self.buttons.keys().copied()
    }

    /// Click the button for each digit of `code` in order.
    pub async fn press_sequence(&self, code: &str) -> Result<()> {
        for ch in code.chars() {
            let digit = ch
                .to_digit(10)
                .ok_or_else(|| Error::Parse(format!("non-digit in keypad code: {ch:?}")))?
                as u8;
            let button = self
                .buttons
                .get(&digit)
                .ok_or_else(|| Error::NotFound(format!("keypad button for digit {digit}")))?;
            button.click().await?;
        }
        Ok(())
    }
}

/// Captures the shuffled keypad and assigns each button the digit it shows,
/// by visual fingerprint. An attempt is accepted only when exactly ten
/// distinct digits are recognized; anything else is discarded whole and the
/// keypad recaptured, since it may have re-shuffled in between.
pub struct DigitPad<'a> {
    locator: &'a Locator,
    table: &'a FingerprintTable,
    attempts: RetryLimit,
}

impl<'a> DigitPad<'a> {
    pub fn new(locator: &'a Locator, table: &'a FingerprintTable, attempts: RetryLimit) -> Self {
        Self {
            locator,
            table,
            attempts,
        }
    }

    /// One full pass over the sixteen cells. `Ok(None)` means the attempt
    /// did not produce a complete assignment and should be retried from
    /// scratch; partial results are never carried over.
    async fn try_capture(&self) -> Result<Option<KeypadAssignment>> {
        let mut buttons: BTreeMap<u8, Box<dyn Handle>> = BTreeMap::new();
        for cell in 0..KEYPAD_CELLS {
            let reference = format!("{KEYPAD_CELL_PREFIX}{cell}");
            let handle = self.locator.one(&reference).await?;
            let png = match handle.screenshot().await {
                Ok(bytes) => bytes,
                // Re-render mid-capture; this attempt is already invalid.
                Err(e) if e.is_transient() => return Ok(None),
                Err(e) => return Err(e),
            };
            let value = fingerprint(&png)?;
            if let Some(digit) = self.table.classify(value) {
                if buttons.insert(digit, handle).is_some() {
                    tracing::debug!(digit, "two keypad buttons classified as the same digit");
                    return Ok(None);
                }
            }
        }
        if buttons.len() == DIGIT_COUNT {
            Ok(Some(KeypadAssignment { buttons }))
        } else {
            tracing::debug!(recognized = buttons.len(), "incomplete keypad capture");
            Ok(None)
        }
    }

    /// Capture until a valid assignment is produced, waiting one poll
    /// interval between attempts.
    pub async fn capture(&self) -> Result<KeypadAssignment> {
        let mut attempts: u32 = 0;
        loop {
            if let Some(assignment) = self.try_capture().await? {
                return Ok(assignment);
            }
            attempts += 1;
            if self.attempts.exhausted(attempts) {
                return Err(Error::LookupTimeout("keypad digit assignment".into()));
            }
            tokio::time::sleep(self.locator.poll_interval()).await;
        }
    }
}
