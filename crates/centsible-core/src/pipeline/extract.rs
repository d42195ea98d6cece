//! Extraction stage
//!
//! First model call: turn free text (or OCR output) into an untrusted
//! draft. Anything that goes wrong here, including unusable replies,
//! surfaces as `Error::Extraction`.

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::debug;

use crate::error::{Error, Result};
use crate::models::ExpenseDraft;
use crate::parsing::extract_json_object;
use crate::prompts::{PromptId, PromptLibrary};
use crate::providers::{Provider, ProviderClient};

/// Run the extraction stage against the text provider
pub async fn extract_expense(
    provider: &ProviderClient,
    prompts: &RwLock<PromptLibrary>,
    text: &str,
    today: &str,
) -> Result<ExpenseDraft> {
    let prompt = {
        let mut prompts = prompts
            .write()
            .map_err(|_| Error::InvalidData("Failed to acquire prompt library lock".into()))?;
        let template = prompts.get(PromptId::ExtractExpense)?;
        let mut vars = HashMap::new();
        vars.insert("text", text);
        vars.insert("today", today);
        template.render_user(&vars)
    };

    let reply = provider
        .generate(&prompt, None)
        .await
        .map_err(|e| Error::Extraction(e.to_string()))?;
    debug!(model = %provider.model(), "Extraction reply: {}", reply);

    let json = extract_json_object(&reply).map_err(|e| Error::Extraction(e.to_string()))?;
    let draft: ExpenseDraft =
        serde_json::from_str(json).map_err(|e| Error::Extraction(e.to_string()))?;
    Ok(draft)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockProvider;

    #[tokio::test]
    async fn test_extracts_draft_from_reply() {
        let mock = MockProvider::new();
        mock.push_reply(r#"Sure! {"amount": 15.5, "category": "Food", "description": "Lunch at Chipotle", "date": "2026-02-17"}"#);
        let provider = ProviderClient::Mock(mock);
        let prompts = RwLock::new(PromptLibrary::embedded_only());

        let draft = extract_expense(&provider, &prompts, "Lunch at Chipotle for $15.50", "2026-02-17")
            .await
            .unwrap();
        assert_eq!(draft.category.as_deref(), Some("Food"));
        assert_eq!(draft.date.as_deref(), Some("2026-02-17"));
    }

    #[tokio::test]
    async fn test_no_json_is_extraction_error() {
        let mock = MockProvider::new();
        mock.push_reply("I couldn't find an expense in that.");
        let provider = ProviderClient::Mock(mock);
        let prompts = RwLock::new(PromptLibrary::embedded_only());

        let err = extract_expense(&provider, &prompts, "hello", "2026-02-17")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Extraction(_)));
    }

    #[tokio::test]
    async fn test_provider_failure_is_extraction_error() {
        let mock = MockProvider::new();
        mock.push_error("rate limited");
        let provider = ProviderClient::Mock(mock);
        let prompts = RwLock::new(PromptLibrary::embedded_only());

        let err = extract_expense(&provider, &prompts, "Gas $40", "2026-02-17")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Extraction(_)));
    }
}
