//! Centsible CLI - expense parsing and budgeting assistant
//!
//! Usage:
//!   centsible parse-text "Lunch at Chipotle for $15"   Parse a text expense
//!   centsible parse-receipt receipt.jpg                Parse a receipt image
//!   centsible call "Set my budget to $2000"            Run a budget action
//!   centsible chat "How am I doing?"                   Ask the companion pet
//!   centsible status                                   Show provider health

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::ParseText { text, save, owner } => {
            commands::cmd_parse_text(&text, save, &owner, cli.json).await
        }
        Commands::ParseReceipt { file, save, owner } => {
            commands::cmd_parse_receipt(&file, save, &owner, cli.json).await
        }
        Commands::Call { message, owner } => commands::cmd_call(&message, &owner, cli.json).await,
        Commands::Chat {
            message,
            pet,
            budget,
            spent,
            friendship,
        } => commands::cmd_chat(&message, &pet, budget, spent, friendship).await,
        Commands::Insights { budget, spent, owner } => {
            commands::cmd_insights(budget, spent, &owner).await
        }
        Commands::Status => commands::cmd_status(cli.json).await,
        Commands::Prompts { action } => match action {
            None => commands::cmd_prompts_list(),
            Some(PromptsAction::Show { id }) => commands::cmd_prompts_show(&id),
            Some(PromptsAction::Path) => commands::cmd_prompts_path(),
        },
    }
}
