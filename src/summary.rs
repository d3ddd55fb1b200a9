use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};

use crate::categorizer::effective_category;
use crate::models::{month_name, Transaction, TxnKind};

/// Flat estimate applied to positive net profit. Not a banded calculation.
pub const TAX_RATE: f64 = 0.2;

pub fn estimated_tax(net: f64) -> f64 {
    if net > 0.0 {
        net * TAX_RATE
    } else {
        0.0
    }
}

// ---------------------------------------------------------------------------
// Month keys
// ---------------------------------------------------------------------------

/// Calendar month used as the grouping key. Orders chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn from_date(date: &str) -> Option<Self> {
        let day = NaiveDate::parse_from_str(date.get(..10)?, "%Y-%m-%d").ok()?;
        Some(Self::of(day))
    }

    pub fn of(day: NaiveDate) -> Self {
        Self {
            year: day.year(),
            month: day.month(),
        }
    }

    /// Accepts "August 2025", "aug 2025" or "2025-08".
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Some((y, m)) = raw.split_once('-') {
            let year = y.parse().ok()?;
            let month: u32 = m.parse().ok()?;
            month_name(month)?;
            return Some(Self { year, month });
        }
        let (name, year) = raw.rsplit_once(' ')?;
        let month = name.trim().parse::<chrono::Month>().ok()?.number_from_month();
        Some(Self {
            year: year.parse().ok()?,
            month,
        })
    }

    /// "August 2025"
    pub fn label(&self) -> String {
        format!("{} {}", month_name(self.month).unwrap_or("?"), self.year)
    }
}

// ---------------------------------------------------------------------------
// Monthly summary
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct MonthlyTotals {
    pub income: f64,
    pub expense: f64,
}

impl MonthlyTotals {
    fn add(&mut self, txn: &Transaction) {
        match txn.kind {
            TxnKind::Income => self.income += txn.amount,
            TxnKind::Expense => self.expense += txn.amount,
        }
    }

    pub fn net(&self) -> f64 {
        self.income - self.expense
    }
}

#[derive(Debug, Clone)]
pub struct Summary {
    /// Chronological.
    pub months: Vec<(MonthKey, MonthlyTotals)>,
    pub latest: Option<MonthKey>,
    pub previous: Option<MonthKey>,
    /// Latest month's expenses minus the previous month's. `None` with fewer than two months.
    pub trend: Option<f64>,
}

fn group_by_month<'a>(txns: impl IntoIterator<Item = &'a Transaction>) -> BTreeMap<MonthKey, MonthlyTotals> {
    let mut grouped: BTreeMap<MonthKey, MonthlyTotals> = BTreeMap::new();
    for txn in txns {
        let Some(key) = MonthKey::from_date(&txn.date) else {
            log::debug!("transaction {} has unparseable date {:?}", txn.id, txn.date);
            continue;
        };
        grouped.entry(key).or_default().add(txn);
    }
    grouped
}

pub fn generate_summary(txns: &[Transaction]) -> Summary {
    let months: Vec<(MonthKey, MonthlyTotals)> = group_by_month(txns).into_iter().collect();

    let latest = months.last().map(|(k, _)| *k);
    let previous = months.len().checked_sub(2).map(|i| months[i].0);
    let trend = match months.as_slice() {
        [.., (_, prev), (_, last)] => Some(last.expense - prev.expense),
        _ => None,
    };

    Summary {
        months,
        latest,
        previous,
        trend,
    }
}

// ---------------------------------------------------------------------------
// Tax summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyBreakdown {
    pub month: String,
    pub income: f64,
    pub expenses: f64,
    pub net: f64,
    pub estimated_tax: f64,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct TaxSummary {
    pub income: f64,
    pub expenses: f64,
    pub net: f64,
    pub estimated_tax: f64,
}

#[derive(Debug, Default, Clone)]
pub struct TaxData {
    pub summary: TaxSummary,
    pub monthly_breakdown: Vec<MonthlyBreakdown>,
}

/// Totals and per-month breakdown. Zero-amount entries are left out entirely.
pub fn tax_data(txns: &[Transaction]) -> TaxData {
    let grouped = group_by_month(txns.iter().filter(|t| t.amount != 0.0));

    let monthly_breakdown: Vec<MonthlyBreakdown> = grouped
        .iter()
        .map(|(key, totals)| {
            let net = totals.net();
            MonthlyBreakdown {
                month: key.label(),
                income: totals.income,
                expenses: totals.expense,
                net,
                estimated_tax: estimated_tax(net),
            }
        })
        .collect();

    let income: f64 = monthly_breakdown.iter().map(|m| m.income).sum();
    let expenses: f64 = monthly_breakdown.iter().map(|m| m.expenses).sum();
    let net = income - expenses;

    TaxData {
        summary: TaxSummary {
            income,
            expenses,
            net,
            estimated_tax: estimated_tax(net),
        },
        monthly_breakdown,
    }
}

// ---------------------------------------------------------------------------
// Monthly summary screen
// ---------------------------------------------------------------------------

/// A transaction with its month and resolved category.
pub struct Enriched<'a> {
    pub txn: &'a Transaction,
    pub month: MonthKey,
    pub category: String,
}

pub fn enrich(txns: &[Transaction]) -> Vec<Enriched<'_>> {
    txns.iter()
        .filter_map(|txn| {
            Some(Enriched {
                month: MonthKey::from_date(&txn.date)?,
                category: effective_category(txn),
                txn,
            })
        })
        .collect()
}

#[derive(Debug, Default, Clone)]
pub struct Filter {
    pub month: Option<MonthKey>,
    pub category: Option<String>,
}

impl Filter {
    pub fn matches(&self, e: &Enriched) -> bool {
        self.month.map_or(true, |m| e.month == m)
            && self
                .category
                .as_deref()
                .map_or(true, |c| e.category == c)
    }

    pub fn is_empty(&self) -> bool {
        self.month.is_none() && self.category.is_none()
    }
}

/// The last `n` months with data, oldest first.
pub fn recent_months(enriched: &[Enriched], n: usize) -> Vec<MonthKey> {
    let mut months: Vec<MonthKey> = enriched.iter().map(|e| e.month).collect();
    months.sort();
    months.dedup();
    let skip = months.len().saturating_sub(n);
    months.split_off(skip)
}

/// Distinct categories in first-seen order.
pub fn unique_categories(enriched: &[Enriched]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for e in enriched {
        if !seen.contains(&e.category) {
            seen.push(e.category.clone());
        }
    }
    seen
}

#[derive(Debug, Clone)]
pub struct MonthCard {
    pub month: MonthKey,
    pub income: f64,
    pub expenses: f64,
    pub count: usize,
    /// Up to three expense categories, largest first.
    pub top_categories: Vec<(String, f64)>,
    pub previous_net: Option<f64>,
    pub is_current: bool,
}

impl MonthCard {
    pub fn net(&self) -> f64 {
        self.income - self.expenses
    }
}

pub fn month_cards(enriched: &[&Enriched], today: NaiveDate) -> Vec<MonthCard> {
    let mut by_month: BTreeMap<MonthKey, Vec<&Enriched>> = BTreeMap::new();
    for e in enriched {
        by_month.entry(e.month).or_default().push(e);
    }

    let current = MonthKey::of(today);
    let mut cards: Vec<MonthCard> = Vec::with_capacity(by_month.len());
    for (month, items) in by_month {
        let mut totals = MonthlyTotals::default();
        let mut categories: Vec<(String, f64)> = Vec::new();
        for e in &items {
            totals.add(e.txn);
            if e.txn.kind == TxnKind::Expense {
                match categories.iter_mut().find(|(c, _)| *c == e.category) {
                    Some((_, total)) => *total += e.txn.amount,
                    None => categories.push((e.category.clone(), e.txn.amount)),
                }
            }
        }
        categories.sort_by(|a, b| b.1.total_cmp(&a.1));
        categories.truncate(3);

        let previous_net = cards.last().map(MonthCard::net);
        cards.push(MonthCard {
            month,
            income: totals.income,
            expenses: totals.expense,
            count: items.len(),
            top_categories: categories,
            previous_net,
            is_current: month == current,
        });
    }
    cards
}
