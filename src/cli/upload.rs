use std::path::PathBuf;

use colored::Colorize;
use comfy_table::{Cell, Table};
use dialoguer::{Input, Select};
use rusqlite::Connection;

use crate::cli::portal;
use crate::error::{Result, TaxmateError};
use crate::filings::get_filing;
use crate::fmt::money;
use crate::importer::{
    compute_checksum, is_csv_file, is_known_upload, parse_csv_file, record_upload, AcceptOutcome, ImportBatch,
    RowEdit,
};
use crate::models::ParsedTransaction;

fn rows_table(batch: &ImportBatch) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["#", "Date", "Amount", "Vendor", "Category", ""]);
    for (i, row) in batch.rows().iter().enumerate() {
        let amount = if row.amount_valid {
            money(row.amount)
        } else {
            "invalid".red().to_string()
        };
        let state = if batch.is_accepted(i) { "accepted".green().to_string() } else { String::new() };
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&row.date),
            Cell::new(amount),
            Cell::new(&row.vendor),
            Cell::new(&row.category),
            Cell::new(state),
        ]);
    }
    table
}

fn prompt_edit(row: &ParsedTransaction) -> RowEdit {
    let ask = |prompt: &str, current: String| -> Option<String> {
        Input::<String>::new()
            .with_prompt(prompt)
            .default(current.clone())
            .interact_text()
            .ok()
            .filter(|v| *v != current)
    };
    let amount = if row.amount_valid { row.amount.to_string() } else { String::new() };
    RowEdit {
        date: ask("Date (YYYY-MM-DD)", row.date.clone()),
        amount: ask("Amount", amount),
        vendor: ask("Vendor", row.vendor.clone()),
        category: ask("Category", row.category.clone()),
    }
}

fn accept_row(batch: &mut ImportBatch, conn: &Connection, user_id: &str, index: usize, filing: Option<i64>) {
    match batch.accept(conn, user_id, index, filing) {
        Ok(AcceptOutcome::Accepted(id)) => println!("{}", format!("Row {} saved as transaction {id}.", index + 1).green()),
        Ok(AcceptOutcome::AlreadyAccepted) => println!("Row {} was already accepted.", index + 1),
        Err(e) => println!("{}", e.to_string().red()),
    }
}

fn review(batch: &mut ImportBatch, conn: &Connection, user_id: &str, filing: Option<i64>) -> Result<()> {
    let actions = ["Accept", "Edit", "Skip", "Quit"];
    let mut index = 0;
    while index < batch.len() {
        if batch.is_accepted(index) {
            index += 1;
            continue;
        }
        let row = &batch.rows()[index];
        println!("{}", "\u{2500}".repeat(60));
        println!("  Row:       {} of {}", index + 1, batch.len());
        println!("  Date:      {}", row.date);
        if row.amount_valid {
            println!("  Amount:    {}", money(row.amount));
        } else {
            println!("  Amount:    {}", "invalid, edit before accepting".red());
        }
        println!("  Vendor:    {}", row.vendor);
        println!("  Category:  {}", row.category);

        let choice = Select::new()
            .with_prompt("Action")
            .items(&actions)
            .default(0)
            .interact()
            .unwrap_or(3);
        match choice {
            0 => {
                accept_row(batch, conn, user_id, index, filing);
                index += 1;
            }
            1 => {
                let edit = prompt_edit(row);
                batch.edit(index, edit)?;
            }
            2 => index += 1,
            _ => {
                println!("{}", "Review paused.".yellow());
                break;
            }
        }
    }
    Ok(())
}

pub fn run(files: &[String], filing: Option<i64>, accept_all: bool) -> Result<()> {
    let p = portal()?;
    if let Some(id) = filing {
        let f = get_filing(&p.conn, p.user_id(), id)?;
        if f.status.is_submitted() {
            return Err(TaxmateError::Validation(format!("Filing {id} is already submitted.")));
        }
    }

    for file in files {
        let path = PathBuf::from(file);
        println!("{}", path.display().to_string().bold());

        if !is_csv_file(&path) {
            log::info!("{} stored for future processing", path.display());
            println!("Not a CSV. Stored for future processing.");
            continue;
        }

        let checksum = compute_checksum(&path)?;
        if is_known_upload(&p.conn, p.user_id(), &checksum)? {
            println!("{}", "This file has already been uploaded (duplicate checksum).".yellow());
            continue;
        }

        let mut batch = ImportBatch::resume(&p.conn, p.user_id(), &checksum, parse_csv_file(&path)?)?;
        if batch.is_empty() {
            println!("No rows found.");
            continue;
        }
        let earlier = batch.accepted_count();
        if earlier > 0 {
            println!(
                "{}",
                format!("Resuming: {earlier} of {} rows were accepted on an earlier upload.", batch.len()).yellow()
            );
        }
        println!("{}", rows_table(&batch));

        if accept_all {
            for index in 0..batch.len() {
                accept_row(&mut batch, &p.conn, p.user_id(), index, filing);
            }
        } else {
            review(&mut batch, &p.conn, p.user_id(), filing)?;
        }

        let accepted = batch.accepted_count();
        if accepted == batch.len() {
            record_upload(&p.conn, p.user_id(), &path, accepted, &checksum)?;
        }
        println!("{accepted} of {} rows accepted.", batch.len());
    }
    Ok(())
}
