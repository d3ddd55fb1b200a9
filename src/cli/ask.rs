use colored::Colorize;

use crate::assistant::{answer, QUICK_PROMPTS};
use crate::error::Result;
use crate::settings::load_settings;

const WRAP_WIDTH: usize = 78;

pub fn run(message: &[String], prompts: bool) -> Result<()> {
    if prompts || message.is_empty() {
        println!("Quick prompts:");
        for (i, (question, _)) in QUICK_PROMPTS.iter().enumerate() {
            println!("  {}. {question}", i + 1);
        }
        println!();
        println!("Ask with `taxmate ask <question>`, or `taxmate ask 1` for a quick prompt.");
        return Ok(());
    }

    let message = message.join(" ");
    let question = match message.trim().parse::<usize>() {
        Ok(n) if (1..=QUICK_PROMPTS.len()).contains(&n) => QUICK_PROMPTS[n - 1].0.to_string(),
        _ => message,
    };

    let reply = answer(&load_settings().assistant_url, &question)?;
    println!("{}", question.bold());
    println!();
    for line in textwrap::wrap(&reply, WRAP_WIDTH) {
        println!("{line}");
    }
    Ok(())
}
