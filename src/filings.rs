use rusqlite::{Connection, OptionalExtension, Row};

use crate::error::{Result, TaxmateError};
use crate::models::{month_name, Filing, FilingStatus, Source, TxnKind};
use crate::transactions::{insert_transaction, NewTransaction};

const SELECT_COLUMNS: &str = "SELECT id, user_id, tax_year, month, status, created_at FROM filings";

pub const MIN_TAX_YEAR: i32 = 2000;
pub const MAX_TAX_YEAR: i32 = 2100;

/// The "new filing" form: a period plus its income and expense totals.
#[derive(Debug, Clone)]
pub struct NewFiling {
    pub tax_year: i32,
    /// `None` for a yearly filing.
    pub month: Option<u32>,
    pub income: f64,
    pub expenses: f64,
}

#[derive(Debug, PartialEq)]
pub enum SubmitOutcome {
    Submitted,
    AlreadySubmitted,
}

pub struct FilingTotals {
    pub filing: Filing,
    pub income: f64,
    pub expenses: f64,
}

fn map_row(row: &Row) -> rusqlite::Result<Filing> {
    Ok(Filing {
        id: row.get(0)?,
        user_id: row.get(1)?,
        tax_year: row.get(2)?,
        month: row.get(3)?,
        status: row.get(4)?,
        created_at: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
    })
}

fn validate_period(tax_year: i32, month: Option<u32>) -> Result<()> {
    if !(MIN_TAX_YEAR..=MAX_TAX_YEAR).contains(&tax_year) {
        return Err(TaxmateError::Validation(format!(
            "Filing year must be between {MIN_TAX_YEAR} and {MAX_TAX_YEAR}"
        )));
    }
    if let Some(m) = month {
        if month_name(m).is_none() {
            return Err(TaxmateError::Validation(format!("Invalid month: {m}")));
        }
    }
    Ok(())
}

pub fn create_filing(
    conn: &Connection,
    user_id: &str,
    tax_year: i32,
    month: Option<u32>,
    status: FilingStatus,
) -> Result<Filing> {
    validate_period(tax_year, month)?;
    conn.execute(
        "INSERT INTO filings (user_id, tax_year, month, status) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![user_id, tax_year, month, status],
    )?;
    get_filing(conn, user_id, conn.last_insert_rowid())
}

/// Create a draft filing and record its income and expense totals as two entries dated today.
pub fn new_filing(conn: &Connection, user_id: &str, form: &NewFiling) -> Result<Filing> {
    for (label, value) in [("Income", form.income), ("Expenses", form.expenses)] {
        if !value.is_finite() || value < 0.0 {
            return Err(TaxmateError::Validation(format!("{label} must be zero or more")));
        }
    }

    let tx = conn.unchecked_transaction()?;
    let filing = create_filing(&tx, user_id, form.tax_year, form.month, FilingStatus::Draft)?;

    let today = chrono::Local::now().format("%Y-%m-%d").to_string();
    let category = form
        .month
        .and_then(month_name)
        .unwrap_or("yearly")
        .to_string();
    for (kind, amount) in [(TxnKind::Income, form.income), (TxnKind::Expense, form.expenses)] {
        let entry = NewTransaction {
            date: today.clone(),
            amount,
            kind,
            category: Some(category.clone()),
            description: None,
            receipt: None,
        };
        insert_transaction(&tx, user_id, Some(filing.id), &entry, Source::Manual)?;
    }
    tx.commit()?;
    log::info!("created draft filing {} ({})", filing.id, filing.period_label());
    Ok(filing)
}

/// The newest unsubmitted filing for `year`, or a new `open` one.
pub fn get_or_create_open_filing(conn: &Connection, user_id: &str, year: i32) -> Result<Filing> {
    let existing = conn
        .query_row(
            &format!(
                "{SELECT_COLUMNS} WHERE user_id = ?1 AND tax_year = ?2 AND status != 'submitted' \
                 ORDER BY created_at DESC, id DESC LIMIT 1"
            ),
            rusqlite::params![user_id, year],
            map_row,
        )
        .optional()?;
    match existing {
        Some(filing) => Ok(filing),
        None => {
            log::info!("no open filing for {year}, creating one");
            create_filing(conn, user_id, year, None, FilingStatus::Open)
        }
    }
}

pub fn get_filing(conn: &Connection, user_id: &str, id: i64) -> Result<Filing> {
    conn.query_row(
        &format!("{SELECT_COLUMNS} WHERE id = ?1 AND user_id = ?2"),
        rusqlite::params![id, user_id],
        map_row,
    )
    .optional()?
    .ok_or(TaxmateError::UnknownFiling(id))
}

pub fn list_filings(conn: &Connection, user_id: &str) -> Result<Vec<Filing>> {
    let mut stmt = conn.prepare(&format!(
        "{SELECT_COLUMNS} WHERE user_id = ?1 ORDER BY created_at DESC, id DESC"
    ))?;
    let rows = stmt
        .query_map([user_id], map_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Mark a filing submitted. Submitting again changes nothing.
pub fn submit_filing(conn: &Connection, user_id: &str, id: i64) -> Result<SubmitOutcome> {
    let filing = get_filing(conn, user_id, id)?;
    if filing.status.is_submitted() {
        return Ok(SubmitOutcome::AlreadySubmitted);
    }
    conn.execute(
        "UPDATE filings SET status = 'submitted' WHERE id = ?1 AND user_id = ?2",
        rusqlite::params![id, user_id],
    )?;
    log::info!("filing {id} submitted");
    Ok(SubmitOutcome::Submitted)
}

pub fn filing_totals(conn: &Connection, user_id: &str) -> Result<Vec<FilingTotals>> {
    let mut stmt = conn.prepare(
        "SELECT f.id, f.user_id, f.tax_year, f.month, f.status, f.created_at, \
         COALESCE(SUM(CASE WHEN t.kind = 'income' THEN t.amount END), 0), \
         COALESCE(SUM(CASE WHEN t.kind = 'expense' THEN t.amount END), 0) \
         FROM filings f LEFT JOIN transactions t ON t.filing_id = f.id \
         WHERE f.user_id = ?1 \
         GROUP BY f.id ORDER BY f.tax_year DESC, f.id DESC",
    )?;
    let rows = stmt
        .query_map([user_id], |row| {
            Ok(FilingTotals {
                filing: map_row(row)?,
                income: row.get(6)?,
                expenses: row.get(7)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
