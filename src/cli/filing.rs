use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::portal;
use crate::cli::txn::transactions_table;
use crate::error::Result;
use crate::filings::{get_filing, list_filings, new_filing, submit_filing, NewFiling, SubmitOutcome};
use crate::transactions::list_for_filing;

pub fn new(year: i32, month: Option<u32>, income: f64, expenses: f64) -> Result<()> {
    let p = portal()?;
    let form = NewFiling {
        tax_year: year,
        month,
        income,
        expenses,
    };
    let filing = new_filing(&p.conn, p.user_id(), &form)?;
    println!(
        "{}",
        format!("Draft filing {} created for {}.", filing.id, filing.period_label()).green()
    );
    println!("Submit it with `taxmate filing submit {}`.", filing.id);
    Ok(())
}

pub fn list() -> Result<()> {
    let p = portal()?;
    let filings = list_filings(&p.conn, p.user_id())?;
    if filings.is_empty() {
        println!("No filings yet. Start one with `taxmate filing new --year <YEAR>`.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Period", "Status", "Created"]);
    for f in &filings {
        table.add_row(vec![
            Cell::new(f.id),
            Cell::new(f.period_label()),
            Cell::new(f.status),
            Cell::new(&f.created_at),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub fn show(id: i64) -> Result<()> {
    let p = portal()?;
    let filing = get_filing(&p.conn, p.user_id(), id)?;
    println!("Filing {}: {} ({})", filing.id, filing.period_label(), filing.status);
    let txns = list_for_filing(&p.conn, p.user_id(), id)?;
    if txns.is_empty() {
        println!("No transactions attached.");
    } else {
        println!("{}", transactions_table(&txns));
    }
    Ok(())
}

pub fn submit(id: i64) -> Result<()> {
    let p = portal()?;
    match submit_filing(&p.conn, p.user_id(), id)? {
        SubmitOutcome::Submitted => println!("{}", format!("Filing {id} submitted.").green()),
        SubmitOutcome::AlreadySubmitted => println!("{}", format!("Filing {id} was already submitted.").yellow()),
    }
    Ok(())
}
