use colored::Colorize;
use comfy_table::{Cell, Table};
use dialoguer::Input;

use crate::categorizer::effective_category;
use crate::cli::portal;
use crate::error::Result;
use crate::fmt::money;
use crate::models::{Transaction, TxnKind};
use crate::transactions::{
    add_transaction, delete_transaction, get_transaction, list_for_filing, list_transactions, set_notes,
    update_transaction, NewTransaction, TransactionUpdate,
};

const DELETE_WORD: &str = "delete";

pub(crate) fn transactions_table(txns: &[Transaction]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Type", "Amount", "Category", "Description", "Notes", "Receipt"]);
    for t in txns {
        let amount = match t.kind {
            TxnKind::Income => money(t.amount).green().to_string(),
            TxnKind::Expense => money(t.amount).red().to_string(),
        };
        table.add_row(vec![
            Cell::new(t.id),
            Cell::new(&t.date),
            Cell::new(t.kind),
            Cell::new(amount),
            Cell::new(effective_category(t)),
            Cell::new(t.description.as_deref().unwrap_or("")),
            Cell::new(t.notes.as_deref().unwrap_or("")),
            Cell::new(t.receipt.as_deref().unwrap_or("")),
        ]);
    }
    table
}

/// Deletion goes ahead only when the user types the word exactly.
pub(crate) fn confirms_delete(typed: &str) -> bool {
    typed.trim() == DELETE_WORD
}

pub fn add(
    amount: f64,
    kind: &str,
    date: Option<String>,
    category: Option<String>,
    description: Option<String>,
    receipt: Option<String>,
) -> Result<()> {
    let p = portal()?;
    let txn = NewTransaction {
        date: date.unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string()),
        amount,
        kind: kind.parse()?,
        category,
        description,
        receipt,
    };
    let (id, filing_id) = add_transaction(&p.conn, p.user_id(), &txn)?;
    println!(
        "{}",
        format!("Added {} {} as transaction {id} (filing {filing_id}).", txn.kind, money(amount)).green()
    );
    Ok(())
}

pub fn list(filing: Option<i64>) -> Result<()> {
    let p = portal()?;
    let txns = match filing {
        Some(id) => list_for_filing(&p.conn, p.user_id(), id)?,
        None => list_transactions(&p.conn, p.user_id())?,
    };
    if txns.is_empty() {
        println!("No transactions yet.");
        return Ok(());
    }
    println!("{}", transactions_table(&txns));
    Ok(())
}

pub fn edit(
    id: i64,
    category: Option<String>,
    amount: Option<f64>,
    kind: Option<String>,
    description: Option<String>,
) -> Result<()> {
    let p = portal()?;
    let update = TransactionUpdate {
        category,
        amount,
        kind: kind.as_deref().map(str::parse::<TxnKind>).transpose()?,
        description,
    };
    if update.is_empty() {
        println!("Nothing to change. Pass --category, --amount, --type or --description.");
        return Ok(());
    }
    update_transaction(&p.conn, p.user_id(), id, &update)?;
    let txn = get_transaction(&p.conn, p.user_id(), id)?;
    println!("{}", "Transaction updated.".green());
    println!("{}", transactions_table(std::slice::from_ref(&txn)));
    Ok(())
}

pub fn notes(id: i64, text: Option<String>, clear: bool) -> Result<()> {
    let p = portal()?;
    if clear {
        set_notes(&p.conn, p.user_id(), id, None)?;
        println!("Notes cleared.");
        return Ok(());
    }
    match text {
        Some(text) => {
            set_notes(&p.conn, p.user_id(), id, Some(&text))?;
            println!("{}", "Notes saved.".green());
        }
        None => {
            let txn = get_transaction(&p.conn, p.user_id(), id)?;
            println!("{}", txn.notes.as_deref().unwrap_or("(no notes)"));
        }
    }
    Ok(())
}

pub fn delete(id: i64, yes: bool) -> Result<()> {
    let p = portal()?;
    let txn = get_transaction(&p.conn, p.user_id(), id)?;

    if !yes {
        println!("{}", transactions_table(std::slice::from_ref(&txn)));
        let typed: String = Input::new()
            .with_prompt(format!("Type '{DELETE_WORD}' to confirm"))
            .allow_empty(true)
            .interact_text()
            .unwrap_or_default();
        if !confirms_delete(&typed) {
            println!("{}", "Delete cancelled.".yellow());
            return Ok(());
        }
    }

    delete_transaction(&p.conn, p.user_id(), id)?;
    println!("{}", format!("Transaction {id} deleted.").green());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Source;

    #[test]
    fn test_confirms_delete_needs_exact_word() {
        assert!(confirms_delete("delete"));
        assert!(confirms_delete(" delete\n"));
        assert!(!confirms_delete("Delete"));
        assert!(!confirms_delete("y"));
        assert!(!confirms_delete(""));
    }

    #[test]
    fn test_table_shows_resolved_category() {
        let txn = Transaction {
            id: 3,
            user_id: "u".to_string(),
            filing_id: None,
            date: "2025-08-01".to_string(),
            amount: 9.5,
            kind: TxnKind::Expense,
            category: None,
            description: Some("Uber to station".to_string()),
            notes: None,
            receipt: None,
            source: Source::Manual,
        };
        let rendered = transactions_table(&[txn]).to_string();
        assert!(rendered.contains("Transport"));
        assert!(rendered.contains("Uber to station"));
    }
}
