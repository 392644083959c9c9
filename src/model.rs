use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One scraped account: header identity, displayed balance, and the
/// transaction history as rendered. Owned by the caller once returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub owner: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub account_id: String,
    pub amount_date: NaiveDate,
    pub amount: Decimal,
    pub transactions: Vec<Transaction>,
}

/// A single statement row, in source display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: NaiveDate,
    pub label: String,
    pub amount: Decimal,
}

/// Parse a `dd/mm/yyyy` date cell.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%d/%m/%Y")
        .map_err(|e| Error::Parse(format!("date {raw:?}: {e}")))
}

/// Parse the date out of a balance line such as `"Solde au 01/02/2023"`:
/// the last whitespace-separated token is the date.
pub fn parse_display_date(line: &str) -> Result<NaiveDate> {
    let token = line
        .split_whitespace()
        .last()
        .ok_or_else(|| Error::Parse(format!("no date in {line:?}")))?;
    parse_date(token)
}

/// Parse a displayed amount into an exact decimal.
///
/// The portal renders French formatting: narrow no-break spaces as
/// thousands separators, a decimal comma, and a trailing currency symbol.
/// Everything that is not a digit, sign, comma or dot is dropped, then the
/// decimal comma is normalized: `"1 234,56€"` → `1234.56`.
pub fn parse_amount(raw: &str) -> Result<Decimal> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ',' | '.'))
        .collect();
    let normalized = if cleaned.contains(',') {
        // Any dot left of the comma is a thousands separator.
        cleaned.replace('.', "").replace(',', ".")
    } else {
        cleaned
    };
    normalized
        .trim_start_matches('+')
        .parse::<Decimal>()
        .map_err(|e| Error::Parse(format!("amount {raw:?}: {e}")))
}
