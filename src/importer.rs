use std::path::Path;

use rusqlite::Connection;
use sha2::{Digest, Sha256};

use crate::error::{Result, TaxmateError};
use crate::models::{ParsedTransaction, Source, TxnKind};
use crate::transactions::{insert_transaction, parse_date, NewTransaction};

pub const DEFAULT_CATEGORY: &str = "Uncategorized";

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a finite amount from the longest numeric prefix, so `12.99 GBP` reads as 12.99.
/// `None` marks a row needing manual correction.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    (1..=raw.len())
        .rev()
        .filter(|&end| raw.is_char_boundary(end))
        .find_map(|end| raw[..end].parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Parse `date,amount,vendor,category` text.
///
/// The first non-empty line is a header and is skipped without inspection.
/// Fields are split on bare commas (no quoting), so a vendor containing a
/// comma shifts the remaining columns. Rows with an empty date, amount or
/// vendor field are dropped without error.
pub fn parse_csv(text: &str) -> Vec<ParsedTransaction> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .quoting(false)
        .from_reader(text.as_bytes());

    let mut parsed = Vec::new();
    for result in rdr.records() {
        let Ok(record) = result else { continue };
        let field = |i: usize| record.get(i).filter(|f| !f.is_empty());
        let (Some(date), Some(amount), Some(vendor)) = (field(0), field(1), field(2)) else {
            log::debug!("skipping incomplete row: {:?}", record);
            continue;
        };

        let amount = parse_amount(amount);
        let category = record
            .get(3)
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CATEGORY);

        parsed.push(ParsedTransaction {
            date: date.trim().to_string(),
            amount: amount.unwrap_or(0.0),
            vendor: vendor.trim().to_string(),
            category: category.to_string(),
            amount_valid: amount.is_some(),
        });
    }
    parsed
}

pub fn is_csv_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(".csv"))
}

pub fn parse_csv_file(path: &Path) -> Result<Vec<ParsedTransaction>> {
    let text = std::fs::read_to_string(path)?;
    let rows = parse_csv(&text);
    log::info!("{} rows parsed from {}", rows.len(), path.display());
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Upload bookkeeping
// ---------------------------------------------------------------------------

pub fn compute_checksum(file_path: &Path) -> Result<String> {
    let data = std::fs::read(file_path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

/// Whether every row of this file has already been imported.
pub fn is_known_upload(conn: &Connection, user_id: &str, checksum: &str) -> Result<bool> {
    let mut stmt = conn.prepare("SELECT 1 FROM imports WHERE checksum = ?1 AND user_id = ?2")?;
    Ok(stmt.exists(rusqlite::params![checksum, user_id])?)
}

pub fn record_upload(
    conn: &Connection,
    user_id: &str,
    file_path: &Path,
    record_count: usize,
    checksum: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO imports (filename, user_id, record_count, checksum) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![
            file_path.file_name().and_then(|n| n.to_str()).unwrap_or(""),
            user_id,
            record_count as i64,
            checksum,
        ],
    )?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Review batch
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone)]
pub struct RowEdit {
    pub date: Option<String>,
    pub amount: Option<String>,
    pub vendor: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum AcceptOutcome {
    Accepted(i64),
    AlreadyAccepted,
}

/// Parsed rows held in memory while the user accepts them one at a time.
pub struct ImportBatch {
    rows: Vec<ParsedTransaction>,
    accepted: Vec<bool>,
    checksum: Option<String>,
}

impl ImportBatch {
    pub fn new(rows: Vec<ParsedTransaction>) -> Self {
        let accepted = vec![false; rows.len()];
        Self {
            rows,
            accepted,
            checksum: None,
        }
    }

    /// A batch for an uploaded file. Rows accepted on an earlier upload of the
    /// same file start out accepted, and each new acceptance is remembered.
    pub fn resume(conn: &Connection, user_id: &str, checksum: &str, rows: Vec<ParsedTransaction>) -> Result<Self> {
        let mut batch = Self::new(rows);
        let mut stmt = conn.prepare("SELECT row_index FROM imported_rows WHERE user_id = ?1 AND checksum = ?2")?;
        let done = stmt
            .query_map(rusqlite::params![user_id, checksum], |row| row.get::<_, i64>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        for index in done {
            if let Some(flag) = usize::try_from(index).ok().and_then(|i| batch.accepted.get_mut(i)) {
                *flag = true;
            }
        }
        batch.checksum = Some(checksum.to_string());
        Ok(batch)
    }

    pub fn rows(&self) -> &[ParsedTransaction] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn is_accepted(&self, index: usize) -> bool {
        self.accepted.get(index).copied().unwrap_or(false)
    }

    pub fn accepted_count(&self) -> usize {
        self.accepted.iter().filter(|a| **a).count()
    }

    pub fn edit(&mut self, index: usize, edit: RowEdit) -> Result<()> {
        let row = self
            .rows
            .get_mut(index)
            .ok_or(TaxmateError::UnknownRow(index + 1))?;
        if let Some(date) = edit.date {
            row.date = date.trim().to_string();
        }
        if let Some(raw) = edit.amount {
            let amount = parse_amount(&raw);
            row.amount = amount.unwrap_or(0.0);
            row.amount_valid = amount.is_some();
        }
        if let Some(vendor) = edit.vendor {
            row.vendor = vendor.trim().to_string();
        }
        if let Some(category) = edit.category {
            let category = category.trim();
            row.category = if category.is_empty() {
                DEFAULT_CATEGORY.to_string()
            } else {
                category.to_string()
            };
        }
        Ok(())
    }

    /// Save one row as an imported expense. Other rows are unaffected by a failure here.
    pub fn accept(
        &mut self,
        conn: &Connection,
        user_id: &str,
        index: usize,
        filing_id: Option<i64>,
    ) -> Result<AcceptOutcome> {
        let row = self.rows.get(index).ok_or(TaxmateError::UnknownRow(index + 1))?;
        if self.accepted[index] {
            return Ok(AcceptOutcome::AlreadyAccepted);
        }
        if !row.amount_valid || !row.amount.is_finite() {
            return Err(TaxmateError::InvalidAmount(index + 1));
        }
        let date = parse_date(&row.date)?;

        let new = NewTransaction {
            date,
            amount: row.amount,
            kind: TxnKind::Expense,
            category: Some(row.category.clone()),
            description: Some(row.vendor.clone()),
            receipt: None,
        };
        let tx = conn.unchecked_transaction()?;
        let id = insert_transaction(&tx, user_id, filing_id, &new, Source::Import)?;
        if let Some(checksum) = &self.checksum {
            tx.execute(
                "INSERT INTO imported_rows (user_id, checksum, row_index, transaction_id) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![user_id, checksum, index as i64, id],
            )?;
        }
        tx.commit()?;
        self.accepted[index] = true;
        Ok(AcceptOutcome::Accepted(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{add_user, test_db};

    const HEADER: &str = "date,amount,vendor,category\n";

    #[test]
    fn test_parse_single_row() {
        let rows = parse_csv("date,amount,vendor,category\n2025-08-01,12.99,Tesco,Groceries\n");
        assert_eq!(
            rows,
            vec![ParsedTransaction {
                date: "2025-08-01".to_string(),
                amount: 12.99,
                vendor: "Tesco".to_string(),
                category: "Groceries".to_string(),
                amount_valid: true,
            }]
        );
    }

    #[test]
    fn test_missing_amount_skips_row() {
        let rows = parse_csv(&format!("{HEADER}2025-08-01,,Tesco,Groceries\n"));
        assert!(rows.is_empty());
        let rows = parse_csv(&format!("{HEADER}2025-08-01\n"));
        assert!(rows.is_empty());
    }

    #[test]
    fn test_missing_vendor_skips_row() {
        let rows = parse_csv(&format!("{HEADER}2025-08-01,5.00\n2025-08-02,6.00,Shell\n"));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].vendor, "Shell");
    }

    #[test]
    fn test_header_always_discarded() {
        let rows = parse_csv("2025-08-01,12.99,Tesco,Groceries\n2025-08-02,3.50,Costa,Coffee\n");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].vendor, "Costa");
    }

    #[test]
    fn test_blank_lines_ignored() {
        let rows = parse_csv(&format!("\n{HEADER}\n2025-08-01,1.00,A,B\n\n\n2025-08-02,2.00,C,D\n"));
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_category_defaults() {
        let rows = parse_csv(&format!("{HEADER}2025-08-01,1.00,Uber\n2025-08-02,2.00,Tesco,  \n"));
        assert_eq!(rows[0].category, "Uncategorized");
        assert_eq!(rows[1].category, "Uncategorized");
    }

    #[test]
    fn test_non_numeric_amount_is_placeholder() {
        let rows = parse_csv(&format!("{HEADER}2025-08-01,abc,Tesco,Groceries\n"));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].amount, 0.0);
        assert!(!rows[0].amount_valid);
    }

    #[test]
    fn test_whitespace_amount_is_placeholder_not_skipped() {
        let rows = parse_csv(&format!("{HEADER}2025-08-01, ,Tesco,Groceries\n"));
        assert_eq!(rows.len(), 1);
        assert!(!rows[0].amount_valid);
    }

    #[test]
    fn test_non_finite_amount_is_invalid() {
        let rows = parse_csv(&format!("{HEADER}2025-08-01,inf,Tesco,Groceries\n"));
        assert!(!rows[0].amount_valid);
    }

    #[test]
    fn test_amount_reads_numeric_prefix() {
        assert_eq!(parse_amount("12.99 GBP"), Some(12.99));
        assert_eq!(parse_amount(" 40"), Some(40.0));
        assert_eq!(parse_amount("1e3x"), Some(1000.0));
        assert_eq!(parse_amount("\u{a3}12"), None);
        assert_eq!(parse_amount("abc"), None);
    }

    #[test]
    fn test_no_quote_handling() {
        let rows = parse_csv(&format!("{HEADER}2025-08-01,9.99,\"Smith, J\",Books\n"));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].vendor, "\"Smith");
        assert_eq!(rows[0].category, "J\"");
    }

    #[test]
    fn test_fields_trimmed_and_crlf() {
        let rows = parse_csv("date,amount,vendor,category\r\n 2025-08-01 , 4.20 , Pret , Food \r\n");
        assert_eq!(rows[0].date, "2025-08-01");
        assert_eq!(rows[0].amount, 4.2);
        assert_eq!(rows[0].vendor, "Pret");
        assert_eq!(rows[0].category, "Food");
    }

    #[test]
    fn test_is_csv_file() {
        assert!(is_csv_file(Path::new("/tmp/bank.csv")));
        assert!(!is_csv_file(Path::new("/tmp/receipt.pdf")));
    }

    #[test]
    fn test_accept_inserts_import_expense() {
        let (_dir, conn) = test_db();
        add_user(&conn, "alice");
        let mut batch = ImportBatch::new(parse_csv(&format!("{HEADER}2025-08-01,12.99,Tesco,Groceries\n")));
        let outcome = batch.accept(&conn, "alice", 0, None).unwrap();
        assert!(matches!(outcome, AcceptOutcome::Accepted(_)));
        let (kind, source, desc): (String, String, String) = conn
            .query_row("SELECT kind, source, description FROM transactions", [], |r| {
                Ok((r.get(0)?, r.get(1)?, r.get(2)?))
            })
            .unwrap();
        assert_eq!(kind, "expense");
        assert_eq!(source, "import");
        assert_eq!(desc, "Tesco");
    }

    #[test]
    fn test_accept_twice_is_noop() {
        let (_dir, conn) = test_db();
        add_user(&conn, "alice");
        let mut batch = ImportBatch::new(parse_csv(&format!("{HEADER}2025-08-01,12.99,Tesco,Groceries\n")));
        batch.accept(&conn, "alice", 0, None).unwrap();
        assert_eq!(batch.accept(&conn, "alice", 0, None).unwrap(), AcceptOutcome::AlreadyAccepted);
        let count: i64 = conn.query_row("SELECT count(*) FROM transactions", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_invalid_amount_blocks_only_that_row() {
        let (_dir, conn) = test_db();
        add_user(&conn, "alice");
        let mut batch = ImportBatch::new(parse_csv(&format!(
            "{HEADER}2025-08-01,oops,Tesco,Groceries\n2025-08-02,5.00,Shell,Fuel\n"
        )));
        let err = batch.accept(&conn, "alice", 0, None).unwrap_err();
        assert!(matches!(err, TaxmateError::InvalidAmount(1)));
        assert!(batch.accept(&conn, "alice", 1, None).is_ok());
        assert_eq!(batch.accepted_count(), 1);
    }

    #[test]
    fn test_edit_fixes_invalid_amount() {
        let (_dir, conn) = test_db();
        add_user(&conn, "alice");
        let mut batch = ImportBatch::new(parse_csv(&format!("{HEADER}2025-08-01,oops,Tesco,\n")));
        batch
            .edit(0, RowEdit { amount: Some("7.50".to_string()), category: Some("Food".to_string()), ..Default::default() })
            .unwrap();
        assert!(batch.rows()[0].amount_valid);
        assert_eq!(batch.rows()[0].category, "Food");
        assert!(batch.accept(&conn, "alice", 0, None).is_ok());
    }

    #[test]
    fn test_accept_rejects_bad_date() {
        let (_dir, conn) = test_db();
        add_user(&conn, "alice");
        let mut batch = ImportBatch::new(parse_csv(&format!("{HEADER}yesterday,5.00,Shell,Fuel\n")));
        assert!(matches!(
            batch.accept(&conn, "alice", 0, None),
            Err(TaxmateError::Validation(_))
        ));
        assert!(!batch.is_accepted(0));
    }

    #[test]
    fn test_upload_checksum_tracking() {
        let (dir, conn) = test_db();
        add_user(&conn, "alice");
        let path = dir.path().join("bank.csv");
        std::fs::write(&path, format!("{HEADER}2025-08-01,1.00,A,B\n")).unwrap();
        let checksum = compute_checksum(&path).unwrap();
        assert!(!is_known_upload(&conn, "alice", &checksum).unwrap());
        record_upload(&conn, "alice", &path, 1, &checksum).unwrap();
        assert!(is_known_upload(&conn, "alice", &checksum).unwrap());
    }

    #[test]
    fn test_resume_skips_rows_accepted_earlier() {
        let (_dir, conn) = test_db();
        add_user(&conn, "alice");
        let text = format!("{HEADER}2025-08-01,12.99,Tesco,\n2025-08-02,abc,Shell,Fuel\n");

        let mut first = ImportBatch::resume(&conn, "alice", "abc123", parse_csv(&text)).unwrap();
        first.accept(&conn, "alice", 0, None).unwrap();
        assert!(first.accept(&conn, "alice", 1, None).is_err());

        let mut second = ImportBatch::resume(&conn, "alice", "abc123", parse_csv(&text)).unwrap();
        assert!(second.is_accepted(0));
        assert!(!second.is_accepted(1));
        assert_eq!(second.accept(&conn, "alice", 0, None).unwrap(), AcceptOutcome::AlreadyAccepted);
        second
            .edit(1, RowEdit { amount: Some("30".to_string()), ..Default::default() })
            .unwrap();
        assert!(matches!(second.accept(&conn, "alice", 1, None).unwrap(), AcceptOutcome::Accepted(_)));
        assert_eq!(second.accepted_count(), 2);
        assert_eq!(crate::transactions::list_transactions(&conn, "alice").unwrap().len(), 2);
    }

    #[test]
    fn test_deleted_import_can_be_accepted_again() {
        let (_dir, conn) = test_db();
        add_user(&conn, "alice");
        let rows = parse_csv(&format!("{HEADER}2025-08-01,12.99,Tesco,\n"));
        let mut batch = ImportBatch::resume(&conn, "alice", "abc123", rows.clone()).unwrap();
        let AcceptOutcome::Accepted(id) = batch.accept(&conn, "alice", 0, None).unwrap() else {
            panic!("row should be accepted");
        };
        crate::transactions::delete_transaction(&conn, "alice", id).unwrap();
        let batch = ImportBatch::resume(&conn, "alice", "abc123", rows).unwrap();
        assert!(!batch.is_accepted(0));
    }
}
