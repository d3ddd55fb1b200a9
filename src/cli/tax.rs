use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{portal, watch, Portal};
use crate::error::Result;
use crate::fmt::money;
use crate::summary::{tax_data, TAX_RATE};
use crate::transactions::list_transactions;

fn render(p: &Portal) -> Result<()> {
    let txns = list_transactions(&p.conn, p.user_id())?;
    let data = tax_data(&txns);
    if data.monthly_breakdown.is_empty() {
        println!("No transactions to summarise yet.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Month", "Income", "Expenses", "Net", "Estimated Tax"]);
    for row in &data.monthly_breakdown {
        table.add_row(vec![
            Cell::new(&row.month),
            Cell::new(money(row.income)),
            Cell::new(money(row.expenses)),
            Cell::new(money(row.net)),
            Cell::new(money(row.estimated_tax)),
        ]);
    }
    println!("{table}");

    let s = &data.summary;
    println!();
    println!("Total income:    {}", money(s.income));
    println!("Total expenses:  {}", money(s.expenses));
    println!("Net:             {}", money(s.net));
    println!("Estimated tax:   {}", money(s.estimated_tax).bold());
    println!(
        "{}",
        format!("Flat {:.0}% of positive net profit. Not a tax calculation.", TAX_RATE * 100.0).dimmed()
    );
    Ok(())
}

pub fn run(watch_changes: bool) -> Result<()> {
    let p = portal()?;
    if watch_changes {
        watch(&p, render)
    } else {
        render(&p)
    }
}
