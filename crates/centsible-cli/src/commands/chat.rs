//! Chat and insight commands

use anyhow::{Context, Result};
use centsible_core::{
    BudgetChat, ExpenseStore, JsonlStore, PetKind, ProviderConfig, UserContext,
};

/// Ask the companion pet a budgeting question
pub async fn cmd_chat(
    message: &str,
    pet: &str,
    budget: f64,
    spent: f64,
    friendship: u8,
) -> Result<()> {
    let selected_pet: PetKind = pet
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))
        .context("Valid pets: penguin, dragon, cat, fox")?;

    let context = UserContext {
        selected_pet,
        friendship_level: friendship.clamp(1, 10),
        budget,
        total_spent: spent,
        ..UserContext::default()
    };

    let chat = BudgetChat::new(ProviderConfig::from_env());
    let reply = chat.chat_response(message, &context, None).await;
    println!("{} says:\n\n{}", selected_pet.name(), reply);
    Ok(())
}

/// Generate spending insights from the saved ledger
pub async fn cmd_insights(budget: f64, spent: f64, owner: &str) -> Result<()> {
    let store = JsonlStore::default_location()
        .context("Could not determine the local data directory")?;
    let expenses = store.list_expenses(owner).await?;

    let mut category_totals = std::collections::BTreeMap::new();
    for record in &expenses {
        *category_totals
            .entry(record.category.to_string())
            .or_insert(0.0) += record.amount;
    }
    let recent_expenses = expenses.iter().rev().take(5).cloned().collect();

    let context = UserContext {
        budget,
        total_spent: spent,
        recent_expenses,
        category_totals,
        ..UserContext::default()
    };

    let chat = BudgetChat::new(ProviderConfig::from_env());
    let insights = chat.generate_insights(&context).await;

    println!("Spending insights:\n");
    for insight in insights {
        println!("  - {}", insight);
    }
    Ok(())
}
