use chrono::{Datelike, NaiveDate};
use rusqlite::{Connection, Row};

use crate::error::{Result, TaxmateError};
use crate::filings::get_or_create_open_filing;
use crate::models::{Source, Transaction, TxnKind};

const SELECT_COLUMNS: &str = "SELECT id, user_id, filing_id, date, amount, kind, category, description, \
     notes, receipt, source FROM transactions";

/// Fields a user supplies for a new entry.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub date: String,
    pub amount: f64,
    pub kind: TxnKind,
    pub category: Option<String>,
    pub description: Option<String>,
    pub receipt: Option<String>,
}

/// In-place edits. `None` leaves a field untouched.
#[derive(Debug, Default, Clone)]
pub struct TransactionUpdate {
    pub category: Option<String>,
    pub amount: Option<f64>,
    pub kind: Option<TxnKind>,
    pub description: Option<String>,
}

impl TransactionUpdate {
    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.amount.is_none() && self.kind.is_none() && self.description.is_none()
    }
}

fn parse_naive_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| TaxmateError::Validation(format!("Invalid date '{raw}' (expected YYYY-MM-DD)")))
}

/// Normalise a user-entered date to YYYY-MM-DD.
pub fn parse_date(raw: &str) -> Result<String> {
    parse_naive_date(raw).map(|d| d.format("%Y-%m-%d").to_string())
}

fn validate_amount(amount: f64) -> Result<f64> {
    if !amount.is_finite() {
        return Err(TaxmateError::Validation(format!("Amount must be a number, got {amount}")));
    }
    if amount < 0.0 {
        return Err(TaxmateError::Validation(
            "Amount must not be negative; use --type to record income or expense".to_string(),
        ));
    }
    Ok(amount)
}

fn map_row(row: &Row) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: row.get(0)?,
        user_id: row.get(1)?,
        filing_id: row.get(2)?,
        date: row.get(3)?,
        amount: row.get(4)?,
        kind: row.get(5)?,
        category: row.get(6)?,
        description: row.get(7)?,
        notes: row.get(8)?,
        receipt: row.get(9)?,
        source: row.get(10)?,
    })
}

pub fn insert_transaction(
    conn: &Connection,
    user_id: &str,
    filing_id: Option<i64>,
    txn: &NewTransaction,
    source: Source,
) -> Result<i64> {
    let amount = validate_amount(txn.amount)?;
    conn.execute(
        "INSERT INTO transactions (user_id, filing_id, date, amount, kind, category, description, receipt, source) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        rusqlite::params![
            user_id,
            filing_id,
            txn.date,
            amount,
            txn.kind,
            txn.category,
            txn.description,
            txn.receipt,
            source,
        ],
    )?;
    let id = conn.last_insert_rowid();
    log::debug!("inserted transaction {id} for {user_id}");
    Ok(id)
}

/// Manual entry. Attaches to the open filing for the entry's year, creating it if needed.
pub fn add_transaction(conn: &Connection, user_id: &str, txn: &NewTransaction) -> Result<(i64, i64)> {
    let date = parse_naive_date(&txn.date)?;
    validate_amount(txn.amount)?;
    let txn = NewTransaction {
        date: date.format("%Y-%m-%d").to_string(),
        ..txn.clone()
    };

    let tx = conn.unchecked_transaction()?;
    let filing = get_or_create_open_filing(&tx, user_id, date.year())?;
    let id = insert_transaction(&tx, user_id, Some(filing.id), &txn, Source::Manual)?;
    tx.commit()?;
    Ok((id, filing.id))
}

pub fn get_transaction(conn: &Connection, user_id: &str, id: i64) -> Result<Transaction> {
    conn.query_row(
        &format!("{SELECT_COLUMNS} WHERE id = ?1 AND user_id = ?2"),
        rusqlite::params![id, user_id],
        map_row,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => TaxmateError::UnknownTransaction(id),
        other => other.into(),
    })
}

pub fn list_transactions(conn: &Connection, user_id: &str) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} WHERE user_id = ?1 ORDER BY date, id"))?;
    let rows = stmt
        .query_map([user_id], map_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn list_for_filing(conn: &Connection, user_id: &str, filing_id: i64) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(&format!(
        "{SELECT_COLUMNS} WHERE filing_id = ?1 AND user_id = ?2 ORDER BY date, id"
    ))?;
    let rows = stmt
        .query_map(rusqlite::params![filing_id, user_id], map_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn update_transaction(conn: &Connection, user_id: &str, id: i64, update: &TransactionUpdate) -> Result<()> {
    let current = get_transaction(conn, user_id, id)?;
    let amount = match update.amount {
        Some(a) => validate_amount(a)?,
        None => current.amount,
    };
    conn.execute(
        "UPDATE transactions SET category = ?1, amount = ?2, kind = ?3, description = ?4 \
         WHERE id = ?5 AND user_id = ?6",
        rusqlite::params![
            update.category.clone().or(current.category),
            amount,
            update.kind.unwrap_or(current.kind),
            update.description.clone().or(current.description),
            id,
            user_id,
        ],
    )?;
    Ok(())
}

pub fn set_notes(conn: &Connection, user_id: &str, id: i64, notes: Option<&str>) -> Result<()> {
    let notes = notes.map(str::trim).filter(|n| !n.is_empty());
    let changed = conn.execute(
        "UPDATE transactions SET notes = ?1 WHERE id = ?2 AND user_id = ?3",
        rusqlite::params![notes, id, user_id],
    )?;
    if changed == 0 {
        return Err(TaxmateError::UnknownTransaction(id));
    }
    Ok(())
}

pub fn delete_transaction(conn: &Connection, user_id: &str, id: i64) -> Result<()> {
    let changed = conn.execute(
        "DELETE FROM transactions WHERE id = ?1 AND user_id = ?2",
        rusqlite::params![id, user_id],
    )?;
    if changed == 0 {
        return Err(TaxmateError::UnknownTransaction(id));
    }
    Ok(())
}
