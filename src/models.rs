use std::fmt;
use std::str::FromStr;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};

use crate::error::TaxmateError;

/// Implements text-backed SQL conversions for a string-like enum.
macro_rules! sql_text_enum {
    ($ty:ty) => {
        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                let text = value.as_str()?;
                text.parse()
                    .map_err(|e: TaxmateError| FromSqlError::Other(e.to_string().into()))
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxnKind {
    Income,
    Expense,
}

impl TxnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl FromStr for TxnKind {
    type Err = TaxmateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(TaxmateError::Validation(format!(
                "Unknown transaction type: {other} (expected income or expense)"
            ))),
        }
    }
}

sql_text_enum!(TxnKind);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Manual,
    Import,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Import => "import",
        }
    }
}

impl FromStr for Source {
    type Err = TaxmateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(Self::Manual),
            "import" => Ok(Self::Import),
            other => Err(TaxmateError::Validation(format!("Unknown source: {other}"))),
        }
    }
}

sql_text_enum!(Source);

/// Filing lifecycle. Only ever advances towards `Submitted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilingStatus {
    Draft,
    Open,
    Submitted,
}

impl FilingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Open => "open",
            Self::Submitted => "submitted",
        }
    }

    pub fn is_submitted(&self) -> bool {
        matches!(self, Self::Submitted)
    }
}

impl FromStr for FilingStatus {
    type Err = TaxmateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "open" => Ok(Self::Open),
            "submitted" => Ok(Self::Submitted),
            other => Err(TaxmateError::Validation(format!("Unknown filing status: {other}"))),
        }
    }
}

sql_text_enum!(FilingStatus);

#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub user_id: String,
    pub full_name: String,
    pub dob: String,
    pub ni_number: String,
    pub country: String,
    pub occupation: String,
    pub account_method: String,
    pub phone_number: String,
    pub start_date: String,
}

#[derive(Debug, Clone)]
pub struct Filing {
    pub id: i64,
    pub user_id: String,
    pub tax_year: i32,
    pub month: Option<u32>,
    pub status: FilingStatus,
    pub created_at: String,
}

impl Filing {
    /// "2025" for yearly filings, "March 2025" for monthly ones.
    pub fn period_label(&self) -> String {
        match self.month.and_then(month_name) {
            Some(name) => format!("{name} {}", self.tax_year),
            None => self.tax_year.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: i64,
    pub user_id: String,
    pub filing_id: Option<i64>,
    pub date: String,
    pub amount: f64,
    pub kind: TxnKind,
    pub category: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub receipt: Option<String>,
    pub source: Source,
}

/// A CSV row awaiting review. Never persisted until accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTransaction {
    pub date: String,
    /// Zero when the source field was not a finite number.
    pub amount: f64,
    pub vendor: String,
    pub category: String,
    pub amount_valid: bool,
}

pub fn month_name(month: u32) -> Option<&'static str> {
    let m = u8::try_from(month).ok()?;
    chrono::Month::try_from(m).ok().map(|m| m.name())
}
