use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{parse_month_opt, portal, watch, Portal};
use crate::error::Result;
use crate::fmt::money;
use crate::summary::{enrich, generate_summary, month_cards, recent_months, unique_categories, Enriched, Filter};
use crate::transactions::list_transactions;

fn signed(value: f64) -> String {
    if value < 0.0 {
        money(value).red().to_string()
    } else {
        money(value).green().to_string()
    }
}

fn render(p: &Portal, filter: &Filter) -> Result<()> {
    let txns = list_transactions(&p.conn, p.user_id())?;
    if txns.is_empty() {
        println!("No transactions yet. Add one with `taxmate txn add` or `taxmate upload`.");
        return Ok(());
    }

    let summary = generate_summary(&txns);
    if let (Some(latest), Some(previous), Some(trend)) = (summary.latest, summary.previous, summary.trend) {
        let direction = if trend > 0.0 {
            format!("up {}", money(trend)).red()
        } else if trend < 0.0 {
            format!("down {}", money(-trend)).green()
        } else {
            "unchanged".normal()
        };
        println!("Spending in {} is {direction} on {}.", latest.label(), previous.label());
    }

    let enriched = enrich(&txns);
    let recent: Vec<String> = recent_months(&enriched, 3).iter().map(|m| m.label()).collect();
    println!("Recent months: {}", recent.join(", "));
    println!("Categories:    {}", unique_categories(&enriched).join(", "));
    println!();

    if !filter.is_empty() {
        let mut parts = Vec::new();
        if let Some(m) = filter.month {
            parts.push(m.label());
        }
        if let Some(c) = &filter.category {
            parts.push(c.clone());
        }
        println!("Showing: {}", parts.join(" / "));
    }

    let visible: Vec<&Enriched> = enriched.iter().filter(|e| filter.matches(e)).collect();
    if visible.is_empty() {
        println!("{}", "No transactions match the filter.".yellow());
        return Ok(());
    }

    let today = chrono::Local::now().date_naive();
    for card in month_cards(&visible, today) {
        let title = if card.is_current {
            format!("{} (this month)", card.month.label())
        } else {
            card.month.label()
        };
        println!("{}", title.bold());

        let mut table = Table::new();
        table.set_header(vec!["Income", "Expenses", "Net", "Previous net", "Entries"]);
        table.add_row(vec![
            Cell::new(money(card.income)),
            Cell::new(money(card.expenses)),
            Cell::new(signed(card.net())),
            Cell::new(card.previous_net.map(signed).unwrap_or_else(|| "-".to_string())),
            Cell::new(card.count),
        ]);
        println!("{table}");

        if !card.top_categories.is_empty() {
            let top: Vec<String> = card
                .top_categories
                .iter()
                .map(|(name, total)| format!("{name} {}", money(*total)))
                .collect();
            println!("Top spending: {}", top.join(", "));
        }
        println!();
    }
    Ok(())
}

pub fn run(month: Option<String>, category: Option<String>, watch_changes: bool) -> Result<()> {
    let filter = Filter {
        month: parse_month_opt(&month)?,
        category,
    };
    let p = portal()?;
    if watch_changes {
        watch(&p, |p| render(p, &filter))
    } else {
        render(&p, &filter)
    }
}
