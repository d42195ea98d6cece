//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI
//! arguments. The actual command implementations are in the `commands`
//! module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Centsible - Turn plain text and receipts into budget entries
#[derive(Parser)]
#[command(name = "centsible")]
#[command(about = "Expense parsing and budgeting assistant", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit machine-readable JSON instead of formatted text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse a free-text expense description
    ParseText {
        /// The expense text, e.g. "Lunch at Chipotle for $15"
        text: String,

        /// Save the parsed record to the local ledger
        #[arg(long)]
        save: bool,

        /// Ledger owner key to save under
        #[arg(long, default_value = "default")]
        owner: String,
    },

    /// Parse a receipt image (OCR first, vision model fallback)
    ParseReceipt {
        /// Path to the receipt image (png, jpg, gif, webp)
        file: PathBuf,

        /// Save the parsed record to the local ledger
        #[arg(long)]
        save: bool,

        /// Ledger owner key to save under
        #[arg(long, default_value = "default")]
        owner: String,
    },

    /// Run a budget action described in natural language
    Call {
        /// What to do, e.g. "Add a $25 expense for dinner"
        message: String,

        /// Ledger owner key
        #[arg(long, default_value = "default")]
        owner: String,
    },

    /// Ask the companion pet a budgeting question
    Chat {
        /// Your question or message
        message: String,

        /// Companion pet: penguin, dragon, cat, fox
        #[arg(long, default_value = "penguin")]
        pet: String,

        /// Monthly budget in dollars
        #[arg(long, default_value = "0")]
        budget: f64,

        /// Amount spent so far this month
        #[arg(long, default_value = "0")]
        spent: f64,

        /// Friendship level (1-10), adjusts tone
        #[arg(long, default_value = "1")]
        friendship: u8,
    },

    /// Generate spending insights from the local ledger
    Insights {
        /// Monthly budget in dollars
        #[arg(long, default_value = "0")]
        budget: f64,

        /// Amount spent so far this month
        #[arg(long, default_value = "0")]
        spent: f64,

        /// Ledger owner key to read
        #[arg(long, default_value = "default")]
        owner: String,
    },

    /// Show provider and OCR availability
    Status,

    /// Inspect and customize prompts
    Prompts {
        #[command(subcommand)]
        action: Option<PromptsAction>,
    },
}

#[derive(Subcommand)]
pub enum PromptsAction {
    /// Show the content of a specific prompt
    Show {
        /// Prompt ID (see `centsible prompts`)
        id: String,
    },
    /// Show the prompt override directory path
    Path,
}
