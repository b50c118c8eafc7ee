//! Accrual ledgers exported from the accounting system as CSV.
//!
//! Expected columns: `Contract`, `Amount`, `Confirmed At`, `Paid At`,
//! `Comment`. Empty cells are absent values.

mod parser;

use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

#[derive(Debug)]
pub enum AccrualImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidAmount {
        row: usize,
        value: String,
    },
    InvalidTimestamp {
        row: usize,
        column: &'static str,
        value: String,
    },
}

impl std::fmt::Display for AccrualImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccrualImportError::Io(err) => write!(f, "failed to read accrual ledger: {}", err),
            AccrualImportError::Csv(err) => write!(f, "invalid accrual ledger CSV: {}", err),
            AccrualImportError::InvalidAmount { row, value } => {
                write!(f, "row {row}: '{value}' is not an amount")
            }
            AccrualImportError::InvalidTimestamp { row, column, value } => write!(
                f,
                "row {row}: {column} '{value}' is neither RFC 3339 nor YYYY-MM-DD"
            ),
        }
    }
}

impl std::error::Error for AccrualImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AccrualImportError::Io(err) => Some(err),
            AccrualImportError::Csv(err) => Some(err),
            AccrualImportError::InvalidAmount { .. }
            | AccrualImportError::InvalidTimestamp { .. } => None,
        }
    }
}

impl From<std::io::Error> for AccrualImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for AccrualImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// One parsed ledger line, not yet bound to a stored contract.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub row: usize,
    pub contract_number: String,
    pub amount: Decimal,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub comment: Option<String>,
}

pub struct AccrualImporter;

impl AccrualImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<LedgerEntry>, AccrualImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<LedgerEntry>, AccrualImportError> {
        parser::parse_entries(reader)
    }
}
