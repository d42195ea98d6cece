//! Companion chat and spending insights
//!
//! Periphery around the pipeline core: a personality-flavored chat
//! reply and a short list of spending insights. Both degrade to static
//! output when the model misbehaves rather than surfacing an error to
//! the user.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::warn;

use crate::error::{Error, Result};
use crate::models::{CityCostData, UserContext};
use crate::parsing::extract_json_array;
use crate::prompts::{PromptId, PromptLibrary};
use crate::providers::{Provider, ProviderClient, ProviderConfig};

const CHAT_FALLBACK: &str = "Sorry, I'm having trouble thinking right now. Please try again!";

const INSIGHT_FALLBACKS: [&str; 3] = [
    "Track your spending regularly to stay on budget",
    "Consider setting category-specific budgets",
    "Review your largest expenses for potential savings",
];

/// Chat and insights over the configured text provider
#[derive(Clone)]
pub struct BudgetChat {
    config: ProviderConfig,
    prompts: Arc<RwLock<PromptLibrary>>,
}

impl BudgetChat {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            config,
            prompts: Arc::new(RwLock::new(PromptLibrary::new())),
        }
    }

    /// Build with an embedded-only prompt library (no override dir)
    pub fn with_embedded_prompts(config: ProviderConfig) -> Self {
        Self {
            config,
            prompts: Arc::new(RwLock::new(PromptLibrary::embedded_only())),
        }
    }

    /// Produce a pet-personality reply to a budgeting question
    ///
    /// Never fails: provider errors come back as a static apology.
    pub async fn chat_response(
        &self,
        message: &str,
        context: &UserContext,
        city: Option<&CityCostData>,
    ) -> String {
        match self.try_chat(message, context, city).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "Chat reply failed, using fallback");
                CHAT_FALLBACK.to_string()
            }
        }
    }

    async fn try_chat(
        &self,
        message: &str,
        context: &UserContext,
        city: Option<&CityCostData>,
    ) -> Result<String> {
        let provider = self.text_provider()?;
        let pet = context.selected_pet;
        let remaining = context.budget - context.total_spent;
        let status = if remaining < 0.0 {
            "Over budget"
        } else if remaining > context.budget * 0.2 {
            "On track"
        } else {
            "Running low"
        };
        let tone = match context.friendship_level {
            7.. => "like a close friend - warm, personal, and supportive",
            4..=6 => "like a friendly companion - helpful and encouraging",
            _ => "like a helpful assistant - polite and informative",
        };

        let friendship = context.friendship_level.to_string();
        let budget = format!("{:.2}", context.budget);
        let spent = format!("{:.2}", context.total_spent);
        let remaining = format!("{:.2}", remaining);
        let city_block = city.map(format_city_block).unwrap_or_default();

        let prompt = {
            let mut prompts = self.lock_prompts()?;
            let template = prompts.get(PromptId::ChatReply)?;
            let mut vars = HashMap::new();
            vars.insert("pet_name", pet.name());
            vars.insert("pet_kind", pet.as_str());
            vars.insert("pet_traits", pet.traits());
            vars.insert("friendship_level", friendship.as_str());
            vars.insert("tone", tone);
            vars.insert("budget", budget.as_str());
            vars.insert("total_spent", spent.as_str());
            vars.insert("remaining", remaining.as_str());
            vars.insert("budget_status", status);
            if !city_block.is_empty() {
                vars.insert("city_block", city_block.as_str());
            }
            vars.insert("message", message);
            template.render_user(&vars)
        };

        let reply = provider.generate(&prompt, None).await?;
        Ok(reply.trim().to_string())
    }

    /// Generate 3-5 short spending insights
    ///
    /// Never fails: a broken reply or provider error yields the static
    /// fallback list.
    pub async fn generate_insights(&self, context: &UserContext) -> Vec<String> {
        match self.try_insights(context).await {
            Ok(insights) if !insights.is_empty() => insights,
            Ok(_) => fallback_insights(),
            Err(e) => {
                warn!(error = %e, "Insight generation failed, using fallback");
                fallback_insights()
            }
        }
    }

    async fn try_insights(&self, context: &UserContext) -> Result<Vec<String>> {
        let provider = self.text_provider()?;

        let budget = format!("{:.2}", context.budget);
        let spent = format!("{:.2}", context.total_spent);
        let remaining = format!("{:.2}", context.budget - context.total_spent);
        let category_totals = serde_json::to_string_pretty(&context.category_totals)?;
        let recent: Vec<_> = context.recent_expenses.iter().take(5).collect();
        let recent_expenses = serde_json::to_string_pretty(&recent)?;

        let prompt = {
            let mut prompts = self.lock_prompts()?;
            let template = prompts.get(PromptId::SpendingInsights)?;
            let mut vars = HashMap::new();
            vars.insert("budget", budget.as_str());
            vars.insert("total_spent", spent.as_str());
            vars.insert("remaining", remaining.as_str());
            vars.insert("category_totals", category_totals.as_str());
            vars.insert("recent_expenses", recent_expenses.as_str());
            template.render_user(&vars)
        };

        let reply = provider.generate(&prompt, None).await?;
        let json = extract_json_array(&reply)?;
        let insights: Vec<String> = serde_json::from_str(json)?;
        Ok(insights)
    }

    fn text_provider(&self) -> Result<&ProviderClient> {
        self.config
            .text
            .as_ref()
            .ok_or_else(|| Error::InvalidData("No text provider configured".into()))
    }

    fn lock_prompts(&self) -> Result<std::sync::RwLockWriteGuard<'_, PromptLibrary>> {
        self.prompts
            .write()
            .map_err(|_| Error::InvalidData("Failed to acquire prompt library lock".into()))
    }
}

fn format_city_block(city: &CityCostData) -> String {
    let fmt = |v: Option<f64>| {
        v.map(|n| format!("{:.1}", n))
            .unwrap_or_else(|| "N/A".to_string())
    };
    format!(
        "Cost of living data for {}:\n- Cost of Living Index: {}\n- Rent Index: {}\n- Groceries Index: {}",
        city.city,
        fmt(city.cost_index),
        fmt(city.rent_index),
        fmt(city.groceries_index)
    )
}

fn fallback_insights() -> Vec<String> {
    INSIGHT_FALLBACKS.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockProvider;

    fn chat_with(text: MockProvider) -> BudgetChat {
        BudgetChat::with_embedded_prompts(ProviderConfig {
            text: Some(ProviderClient::Mock(text)),
            vision: None,
            ocr: None,
        })
    }

    fn context() -> UserContext {
        UserContext {
            friendship_level: 5,
            budget: 2000.0,
            total_spent: 1200.0,
            ..UserContext::default()
        }
    }

    #[tokio::test]
    async fn test_chat_returns_model_reply() {
        let mock = MockProvider::new();
        mock.push_reply("Waddle on! You have $800 left this month.");
        let reply = chat_with(mock)
            .chat_response("How am I doing?", &context(), None)
            .await;
        assert!(reply.contains("$800"));
    }

    #[tokio::test]
    async fn test_chat_degrades_on_provider_error() {
        let mock = MockProvider::new();
        mock.push_error("model offline");
        let reply = chat_with(mock)
            .chat_response("How am I doing?", &context(), None)
            .await;
        assert_eq!(reply, CHAT_FALLBACK);
    }

    #[tokio::test]
    async fn test_chat_without_provider_degrades() {
        let chat = BudgetChat::with_embedded_prompts(ProviderConfig {
            text: None,
            vision: None,
            ocr: None,
        });
        assert_eq!(
            chat.chat_response("hi", &context(), None).await,
            CHAT_FALLBACK
        );
    }

    #[tokio::test]
    async fn test_insights_parsed_from_array() {
        let mock = MockProvider::new();
        mock.push_reply(r#"Here you go: ["Food is your top category", "You're on track"]"#);
        let insights = chat_with(mock).generate_insights(&context()).await;
        assert_eq!(insights.len(), 2);
        assert!(insights[0].contains("Food"));
    }

    #[tokio::test]
    async fn test_insights_fall_back_on_bad_reply() {
        let mock = MockProvider::new();
        mock.push_reply("no array here");
        let insights = chat_with(mock).generate_insights(&context()).await;
        assert_eq!(insights, fallback_insights());
    }

    #[test]
    fn test_city_block_formatting() {
        let block = format_city_block(&CityCostData {
            city: "Seattle".into(),
            cost_index: Some(172.0),
            rent_index: None,
            groceries_index: Some(81.5),
        });
        assert!(block.contains("Seattle"));
        assert!(block.contains("172.0"));
        assert!(block.contains("N/A"));
    }
}
