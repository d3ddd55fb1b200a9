use std::path::PathBuf;

use crate::cli::{parse_month_opt, portal};
use crate::error::{Result, TaxmateError};
use crate::export::{register_path, tax_summary_path, to_file, write_register, write_tax_summary};
use crate::settings::{get_data_dir, shellexpand_path};
use crate::summary::{enrich, tax_data, Enriched};
use crate::transactions::list_transactions;

fn output_path(output: Option<String>, default: impl FnOnce() -> PathBuf) -> PathBuf {
    output
        .map(|o| PathBuf::from(shellexpand_path(&o)))
        .unwrap_or_else(default)
}

pub fn transactions(month: Option<String>, output: Option<String>) -> Result<()> {
    let p = portal()?;
    let txns = list_transactions(&p.conn, p.user_id())?;
    let enriched = enrich(&txns);

    let month = match parse_month_opt(&month)? {
        Some(m) => m,
        None => enriched
            .iter()
            .map(|e| e.month)
            .max()
            .ok_or_else(|| TaxmateError::Other("No transactions to export.".to_string()))?,
    };
    let rows: Vec<&Enriched> = enriched.iter().filter(|e| e.month == month).collect();

    let path = output_path(output, || register_path(&get_data_dir(), month));
    to_file(&path, |f| write_register(f, &rows))?;
    println!("Wrote {} ({} rows)", path.display(), rows.len());
    Ok(())
}

pub fn tax(output: Option<String>) -> Result<()> {
    let p = portal()?;
    let txns = list_transactions(&p.conn, p.user_id())?;
    let data = tax_data(&txns);

    let today = chrono::Local::now().date_naive();
    let path = output_path(output, || tax_summary_path(&get_data_dir(), today));
    to_file(&path, |f| write_tax_summary(f, &data.monthly_breakdown))?;
    println!("Wrote {}", path.display());
    Ok(())
}
