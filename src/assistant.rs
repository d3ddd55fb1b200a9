use serde::Deserialize;

use crate::error::{Result, TaxmateError};

/// Canned questions answered without a network call.
pub const QUICK_PROMPTS: &[(&str, &str)] = &[
    (
        "How do I start a new filing?",
        "To start a new filing, click 'New Filing' in the top navigation. \
         We'll guide you step-by-step from there.",
    ),
    (
        "Where can I see my monthly summary?",
        "Your monthly summary is available under 'Monthly Summary'. \
         It shows categorized transactions and trends.",
    ),
    (
        "How do I correct a category?",
        "Click 'Edit' next to any transaction to manually adjust its category. \
         This helps improve auto-categorization over time.",
    ),
];

#[derive(Debug, Deserialize)]
struct ChatResponse {
    reply: String,
}

pub fn quick_answer(prompt: &str) -> Option<&'static str> {
    let prompt = prompt.trim();
    QUICK_PROMPTS
        .iter()
        .find(|(q, _)| q.eq_ignore_ascii_case(prompt))
        .map(|(_, a)| *a)
}

/// Send one user message to the chat endpoint and return its reply.
pub fn ask(endpoint: &str, message: &str) -> Result<String> {
    let message = message.trim();
    if message.is_empty() {
        return Err(TaxmateError::Validation("Type a question first.".to_string()));
    }

    log::debug!("posting {} chars to {endpoint}", message.len());
    let response = ureq::post(endpoint).send_json(ureq::json!({
        "messages": [{ "role": "user", "content": message }],
    }))?;

    let chat: ChatResponse = response.into_json()?;
    log::info!("assistant replied with {} chars", chat.reply.len());
    Ok(chat.reply)
}

/// A quick prompt's canned answer, otherwise the remote reply.
pub fn answer(endpoint: &str, message: &str) -> Result<String> {
    match quick_answer(message) {
        Some(canned) => Ok(canned.to_string()),
        None => ask(endpoint, message),
    }
}
