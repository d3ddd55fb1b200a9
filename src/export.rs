use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::error::Result;
use crate::summary::{Enriched, MonthKey, MonthlyBreakdown};

pub const REGISTER_HEADER: [&str; 5] = ["Date", "Type", "Amount", "Category", "Description"];
pub const TAX_SUMMARY_HEADER: [&str; 5] = ["Month", "Income", "Expenses", "Net", "Estimated Tax"];

/// Plain comma-joined rows. Fields are written as-is, without quoting.
fn writer() -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Never)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new())
}

/// Rows are newline-separated; the last one has no terminator.
fn finish<W: Write>(mut out: W, wtr: csv::Writer<Vec<u8>>) -> Result<()> {
    let mut buf = wtr.into_inner().map_err(|e| e.into_error())?;
    if buf.last() == Some(&b'\n') {
        buf.pop();
    }
    out.write_all(&buf)?;
    out.flush()?;
    Ok(())
}

pub fn write_register<W: Write>(out: W, rows: &[&Enriched]) -> Result<()> {
    let mut wtr = writer();
    wtr.write_record(REGISTER_HEADER)?;
    for e in rows {
        wtr.write_record([
            e.txn.date.as_str(),
            e.txn.kind.as_str(),
            e.txn.amount.to_string().as_str(),
            e.category.as_str(),
            e.txn.description.as_deref().unwrap_or(""),
        ])?;
    }
    finish(out, wtr)
}

pub fn write_tax_summary<W: Write>(out: W, breakdown: &[MonthlyBreakdown]) -> Result<()> {
    let mut wtr = writer();
    wtr.write_record(TAX_SUMMARY_HEADER)?;
    for row in breakdown {
        wtr.write_record([
            row.month.clone(),
            format!("{:.2}", row.income),
            format!("{:.2}", row.expenses),
            format!("{:.2}", row.net),
            format!("{:.2}", row.estimated_tax),
        ])?;
    }
    finish(out, wtr)
}

/// `<data_dir>/exports/August 2025-summary.csv`
pub fn register_path(data_dir: &Path, month: MonthKey) -> PathBuf {
    data_dir.join("exports").join(format!("{}-summary.csv", month.label()))
}

/// `<data_dir>/exports/tax-summary-2025-08-01.csv`
pub fn tax_summary_path(data_dir: &Path, today: NaiveDate) -> PathBuf {
    data_dir
        .join("exports")
        .join(format!("tax-summary-{}.csv", today.format("%Y-%m-%d")))
}

/// Create parent directories and hand a file to `write`.
pub fn to_file<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(std::fs::File) -> Result<()>,
{
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    write(std::fs::File::create(path)?)?;
    log::info!("wrote {}", path.display());
    Ok(())
}
