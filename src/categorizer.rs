use crate::models::Transaction;

/// Ordered keyword table. The first rule with a matching keyword wins.
const RULES: &[(&[&str], &str)] = &[
    (&["uber", "train"], "Transport"),
    (&["tesco", "sainsbury"], "Groceries"),
    (&["stripe", "client"], "Income"),
    (&["rent", "mortgage"], "Housing"),
];

pub const FALLBACK_CATEGORY: &str = "Other";

pub fn auto_categorize(description: &str) -> &'static str {
    let desc = description.to_lowercase();
    RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| desc.contains(k)))
        .map(|(_, category)| *category)
        .unwrap_or(FALLBACK_CATEGORY)
}

/// The stored category, or the keyword guess when none was recorded.
pub fn effective_category(txn: &Transaction) -> String {
    match txn.category.as_deref().map(str::trim) {
        Some(c) if !c.is_empty() => c.to_string(),
        _ => auto_categorize(txn.description.as_deref().unwrap_or("")).to_string(),
    }
}
