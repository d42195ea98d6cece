//! Expense parsing commands

use std::path::Path;

use anyhow::{Context, Result};
use centsible_core::{
    ExpensePipeline, ExpenseRecord, ExpenseStore, JsonlStore, ProviderConfig,
};

/// Parse a free-text expense and optionally save it
pub async fn cmd_parse_text(text: &str, save: bool, owner: &str, json: bool) -> Result<()> {
    let pipeline = ExpensePipeline::new(ProviderConfig::from_env());
    let record = pipeline.parse_text(text).await?;

    print_record(&record, json)?;
    if save {
        save_record(owner, &record).await?;
    }
    Ok(())
}

/// Parse a receipt image and optionally save it
pub async fn cmd_parse_receipt(file: &Path, save: bool, owner: &str, json: bool) -> Result<()> {
    let image = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let pipeline = ExpensePipeline::new(ProviderConfig::from_env());
    let record = pipeline.parse_receipt(&image).await?;

    print_record(&record, json)?;
    if save {
        save_record(owner, &record).await?;
    }
    Ok(())
}

fn print_record(record: &ExpenseRecord, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(record)?);
        return Ok(());
    }

    println!("Amount:      ${:.2}", record.amount);
    println!("Category:    {}", record.category);
    println!("Description: {}", record.description);
    println!("Date:        {}", record.date);
    if let Some(ref merchant) = record.merchant {
        println!("Merchant:    {}", merchant);
    }
    Ok(())
}

async fn save_record(owner: &str, record: &ExpenseRecord) -> Result<()> {
    let store = JsonlStore::default_location()
        .context("Could not determine the local data directory")?;
    store.create_expense(owner, record).await?;
    println!("Saved to ledger for '{}'", owner);
    Ok(())
}
