use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::portal;
use crate::error::Result;
use crate::filings::filing_totals;
use crate::fmt::money;
use crate::profiles::mask_ni;

pub fn run() -> Result<()> {
    let p = portal()?;
    let Some(profile) = &p.ctx.profile else {
        println!("{}", "No profile found.".yellow());
        return Ok(());
    };

    println!("{}", format!("Welcome back, {}!", profile.full_name).bold());
    println!();
    println!("Country:    {}", profile.country);
    println!("NI number:  {}", mask_ni(&profile.ni_number));
    println!("Born:       {}", profile.dob);
    println!();

    let filings = filing_totals(&p.conn, p.user_id())?;
    let income: f64 = filings.iter().map(|f| f.income).sum();
    let expenses: f64 = filings.iter().map(|f| f.expenses).sum();
    let net = income - expenses;

    println!("Total income:    {}", money(income));
    println!("Total expenses:  {}", money(expenses));
    let net_str = if net < 0.0 { money(net).red() } else { money(net).green() };
    println!("Net profit:      {net_str}");
    println!();

    if filings.is_empty() {
        println!("No filings found.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Period", "Income", "Expenses", "Status"]);
    for f in &filings {
        let status = if f.filing.status.is_submitted() {
            "submitted".green().to_string()
        } else {
            f.filing.status.to_string()
        };
        table.add_row(vec![
            Cell::new(f.filing.id),
            Cell::new(f.filing.period_label()),
            Cell::new(money(f.income)),
            Cell::new(money(f.expenses)),
            Cell::new(status),
        ]);
    }
    println!("{table}");
    Ok(())
}
