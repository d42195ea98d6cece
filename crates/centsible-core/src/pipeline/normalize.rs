//! Normalization stage
//!
//! Second model call: clean a draft against the closed category set and
//! formatting rules, with the original text available for context. The
//! result is still untrusted; validation & repair runs afterward.

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::debug;

use crate::error::{Error, Result};
use crate::models::ExpenseDraft;
use crate::parsing::extract_json_object;
use crate::prompts::{PromptId, PromptLibrary};
use crate::providers::{Provider, ProviderClient};

/// Run the normalization stage against the text provider
pub async fn normalize_expense(
    provider: &ProviderClient,
    prompts: &RwLock<PromptLibrary>,
    draft: &ExpenseDraft,
    original_text: &str,
) -> Result<ExpenseDraft> {
    let draft_json = serde_json::to_string(draft)?;
    let prompt = {
        let mut prompts = prompts
            .write()
            .map_err(|_| Error::InvalidData("Failed to acquire prompt library lock".into()))?;
        let template = prompts.get(PromptId::NormalizeExpense)?;
        let mut vars = HashMap::new();
        vars.insert("original_text", original_text);
        vars.insert("draft_json", draft_json.as_str());
        template.render_user(&vars)
    };

    let reply = provider
        .generate(&prompt, None)
        .await
        .map_err(|e| Error::Normalization(e.to_string()))?;
    debug!(model = %provider.model(), "Normalization reply: {}", reply);

    let json = extract_json_object(&reply).map_err(|e| Error::Normalization(e.to_string()))?;
    let normalized: ExpenseDraft =
        serde_json::from_str(json).map_err(|e| Error::Normalization(e.to_string()))?;
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockProvider;

    #[tokio::test]
    async fn test_normalizes_draft() {
        let mock = MockProvider::new();
        mock.push_reply(
            r#"{"amount": 40.0, "category": "Transportation", "description": "Gas", "date": "2026-02-16"}"#,
        );
        let provider = ProviderClient::Mock(mock);
        let prompts = RwLock::new(PromptLibrary::embedded_only());

        let draft = ExpenseDraft {
            amount: Some(serde_json::json!("$40")),
            category: Some("gas".into()),
            description: Some("Gas".into()),
            date: Some("yesterday".into()),
            merchant: None,
        };
        let normalized = normalize_expense(&provider, &prompts, &draft, "Gas $40 yesterday")
            .await
            .unwrap();
        assert_eq!(normalized.category.as_deref(), Some("Transportation"));
        assert_eq!(normalized.amount, Some(serde_json::json!(40.0)));
    }

    #[tokio::test]
    async fn test_unusable_reply_is_normalization_error() {
        let mock = MockProvider::new();
        mock.push_reply("all clean!");
        let provider = ProviderClient::Mock(mock);
        let prompts = RwLock::new(PromptLibrary::embedded_only());

        let err = normalize_expense(&provider, &prompts, &ExpenseDraft::default(), "text")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Normalization(_)));
    }
}
