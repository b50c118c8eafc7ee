use std::io::Read;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

use super::{AccrualImportError, LedgerEntry};

pub(crate) fn parse_entries<R: Read>(reader: R) -> Result<Vec<LedgerEntry>, AccrualImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut entries = Vec::new();

    for (index, record) in csv_reader.deserialize::<LedgerRow>().enumerate() {
        let row = record?;
        entries.push(row.into_entry(index + 1)?);
    }

    Ok(entries)
}

#[derive(Debug, Deserialize)]
struct LedgerRow {
    #[serde(rename = "Contract")]
    contract: String,
    #[serde(rename = "Amount")]
    amount: String,
    #[serde(
        rename = "Confirmed At",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    confirmed_at: Option<String>,
    #[serde(rename = "Paid At", default, deserialize_with = "empty_string_as_none")]
    paid_at: Option<String>,
    #[serde(rename = "Comment", default, deserialize_with = "empty_string_as_none")]
    comment: Option<String>,
}

impl LedgerRow {
    fn into_entry(self, row: usize) -> Result<LedgerEntry, AccrualImportError> {
        let amount = parse_amount(&self.amount).ok_or_else(|| AccrualImportError::InvalidAmount {
            row,
            value: self.amount.clone(),
        })?;
        let confirmed_at = timestamp(row, "Confirmed At", self.confirmed_at.as_deref())?;
        let paid_at = timestamp(row, "Paid At", self.paid_at.as_deref())?;

        Ok(LedgerEntry {
            row,
            contract_number: self.contract,
            amount,
            confirmed_at,
            paid_at,
            comment: self.comment,
        })
    }
}

fn timestamp(
    row: usize,
    column: &'static str,
    value: Option<&str>,
) -> Result<Option<DateTime<Utc>>, AccrualImportError> {
    match value {
        None => Ok(None),
        Some(raw) => parse_datetime(raw)
            .map(Some)
            .ok_or_else(|| AccrualImportError::InvalidTimestamp {
                row,
                column,
                value: raw.to_string(),
            }),
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

/// Accepts `1200.50`, `1200,50` and digit groups separated by spaces.
fn parse_amount(value: &str) -> Option<Decimal> {
    let normalized: String = value
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .map(|ch| if ch == ',' { '.' } else { ch })
        .collect();
    if normalized.is_empty() {
        return None;
    }
    Decimal::from_str(&normalized).ok()
}

fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }

    None
}
