//! Centsible Core Library
//!
//! Shared functionality for the Centsible budgeting assistant:
//! - Multi-stage expense parsing pipeline (extract, normalize, validate & repair)
//! - Receipt parsing with an OCR-first, vision-fallback provider chain
//! - Pluggable model providers (Gemini, Groq)
//! - Keyword-based category inference
//! - Companion pet chat and spending insights
//! - Structured function calling (natural language to budget actions)
//! - Prompt library for customizable model prompts
//! - Expense and budget persistence (JSON-lines and in-memory stores)

pub mod category;
pub mod chat;
pub mod error;
pub mod functions;
pub mod image;
pub mod models;
pub mod parsing;
pub mod pipeline;
pub mod prompts;
pub mod providers;
pub mod schema;
pub mod store;

/// Test utilities including the mock model server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use category::infer_category;
pub use chat::BudgetChat;
pub use error::{Error, Result};
pub use functions::{FunctionCall, FunctionReply, FunctionResult, FunctionRouter};
pub use image::{sniff_format, ImageFormat};
pub use models::{
    BudgetLimit, BudgetStatus, Category, CityCostData, ExpenseDraft, ExpenseRecord, PetKind,
    UserContext,
};
pub use pipeline::{ExpensePipeline, MAX_TEXT_INPUT_CHARS, MIN_OCR_TEXT_CHARS};
pub use prompts::{Prompt, PromptId, PromptInfo, PromptLibrary};
pub use providers::{
    Capability, ChainLink, GeminiBackend, GroqBackend, HealthReport, MockProvider, OcrEngine,
    Provider, ProviderClient, ProviderConfig, TesseractOcr,
};
pub use schema::{validate_expense, SchemaViolation, MAX_DESCRIPTION_LEN};
pub use store::{ExpenseStore, JsonlStore, MemoryStore};
