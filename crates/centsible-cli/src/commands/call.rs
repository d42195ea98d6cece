//! Natural-language budget actions

use anyhow::{Context, Result};
use centsible_core::{
    FunctionReply, FunctionResult, FunctionRouter, JsonlStore, ProviderConfig,
};

/// Identify and run the budget action described by a message
pub async fn cmd_call(message: &str, owner: &str, json: bool) -> Result<()> {
    let router = FunctionRouter::new(ProviderConfig::from_env());
    let store = JsonlStore::default_location()
        .context("Could not determine the local data directory")?;

    let reply = router.handle(message, owner, &store).await?;
    print_reply(&reply, json)
}

fn print_reply(reply: &FunctionReply, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(reply)?);
        return Ok(());
    }

    println!("{}", reply.message);
    match &reply.result {
        FunctionResult::ExpenseAdded { record } => {
            println!("  {} | {} | ${:.2}", record.date, record.category, record.amount);
        }
        FunctionResult::BudgetSet { limit } => {
            println!(
                "  {} | {} | ${:.2}/month",
                limit.month,
                limit.category.map(|c| c.as_str()).unwrap_or("total"),
                limit.monthly_limit
            );
        }
        FunctionResult::Expenses {
            expenses, total, ..
        } => {
            for expense in expenses {
                println!(
                    "  {} | {:<14} | ${:>8.2} | {}",
                    expense.date, expense.category, expense.amount, expense.description
                );
            }
            println!("  Total: ${:.2}", total);
        }
        FunctionResult::BudgetStatus { statuses } => {
            for status in statuses {
                println!(
                    "  {:<14} | limit ${:>8.2} | spent ${:>8.2} | remaining ${:>8.2}",
                    status.category.map(|c| c.as_str()).unwrap_or("total"),
                    status.monthly_limit,
                    status.spent,
                    status.remaining
                );
            }
        }
    }
    Ok(())
}
