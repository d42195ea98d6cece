//! Multi-stage expense parsing pipeline
//!
//! Free text runs extraction, then normalization, then validation &
//! repair. Receipt images run a fixed fallback chain: local OCR plus
//! the text pipeline first, then a single vision call. Attempts report
//! a tagged outcome rather than bubbling errors, so the coordinator
//! advances the chain on failure and only gives up after every link
//! has been tried.

mod extract;
mod normalize;
mod validate;

pub use extract::extract_expense;
pub use normalize::normalize_expense;
pub use validate::validate_and_repair;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::models::{ExpenseDraft, ExpenseRecord};
use crate::parsing::extract_json_object;
use crate::prompts::{PromptId, PromptLibrary};
use crate::providers::{Capability, Provider, ProviderClient, ProviderConfig};

/// Free-text input cap, in characters
pub const MAX_TEXT_INPUT_CHARS: usize = 500;

/// Minimum OCR output length before the text pipeline is attempted
pub const MIN_OCR_TEXT_CHARS: usize = 10;

/// Outcome of one link of the receipt fallback chain
#[derive(Debug)]
enum AttemptOutcome {
    Success(ExpenseRecord),
    Failure(String),
}

/// The expense parsing pipeline
///
/// Owns a provider configuration built once at startup and a prompt
/// library. Cheap to clone and share across tasks.
#[derive(Clone)]
pub struct ExpensePipeline {
    config: ProviderConfig,
    prompts: Arc<RwLock<PromptLibrary>>,
}

impl ExpensePipeline {
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

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Parse a free-text expense description into a validated record
    pub async fn parse_text(&self, text: &str) -> Result<ExpenseRecord> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::InvalidData("Input text is empty".into()));
        }
        if text.chars().count() > MAX_TEXT_INPUT_CHARS {
            return Err(Error::InvalidData(format!(
                "Input text exceeds {} characters",
                MAX_TEXT_INPUT_CHARS
            )));
        }

        let provider = self
            .config
            .text
            .as_ref()
            .ok_or_else(|| Error::Extraction("No text provider configured".into()))?;
        let today = today_string();

        let record = self.run_text_stages(provider, text, &today).await?;
        info!(amount = record.amount, category = %record.category, "Parsed text expense");
        Ok(record)
    }

    /// Parse a receipt image, walking the fallback chain
    ///
    /// Attempt order and gating come from `ProviderConfig::chain()`:
    /// OCR + text pipeline, then vision. Each link runs at most once;
    /// the second schema failure inside a link fails that link, not the
    /// whole call. When every link has failed the joined reasons come
    /// back as `Error::Exhausted`.
    pub async fn parse_receipt(&self, image: &[u8]) -> Result<ExpenseRecord> {
        if image.is_empty() {
            return Err(Error::InvalidData("Image data is empty".into()));
        }

        let mut failures: Vec<String> = Vec::new();

        for link in self.config.chain() {
            let outcome = if link.available {
                match link.capability {
                    Capability::TextAndOcr => self.primary_attempt(image).await,
                    Capability::Vision => self.fallback_attempt(image).await,
                }
            } else {
                AttemptOutcome::Failure("required providers not configured".into())
            };

            match outcome {
                AttemptOutcome::Success(record) => {
                    info!(
                        amount = record.amount,
                        category = %record.category,
                        via = link.capability.as_str(),
                        "Parsed receipt"
                    );
                    return Ok(record);
                }
                AttemptOutcome::Failure(reason) => {
                    warn!(link = link.capability.as_str(), reason = %reason, "Receipt chain link failed");
                    failures.push(format!("{}: {}", link.capability.as_str(), reason));
                }
            }
        }

        Err(Error::Exhausted(failures.join("; ")))
    }

    /// OCR the image and run the full text pipeline over the result
    async fn primary_attempt(&self, image: &[u8]) -> AttemptOutcome {
        let ocr = match &self.config.ocr {
            Some(ocr) => ocr,
            None => return AttemptOutcome::Failure("OCR engine not available".into()),
        };
        let provider = match &self.config.text {
            Some(p) => p,
            None => return AttemptOutcome::Failure("No text provider configured".into()),
        };

        let text = match ocr.extract_text(image).await {
            Ok(t) => t,
            Err(e) => return AttemptOutcome::Failure(e.to_string()),
        };
        if text.chars().count() < MIN_OCR_TEXT_CHARS {
            return AttemptOutcome::Failure(format!(
                "OCR produced only {} characters",
                text.chars().count()
            ));
        }
        debug!(chars = text.len(), "OCR text feeding the text pipeline");

        let today = today_string();
        match self.run_text_stages(provider, &text, &today).await {
            Ok(record) => AttemptOutcome::Success(record),
            Err(e) => AttemptOutcome::Failure(e.to_string()),
        }
    }

    /// Single vision call with the combined prompt, then repair only
    async fn fallback_attempt(&self, image: &[u8]) -> AttemptOutcome {
        let provider = match &self.config.vision {
            Some(p) if p.supports_vision() => p,
            Some(_) => return AttemptOutcome::Failure("Configured provider lacks vision".into()),
            None => return AttemptOutcome::Failure("No vision provider configured".into()),
        };

        let today = today_string();
        let prompt = match self.render(PromptId::ParseReceiptVision, &[("today", &today)]) {
            Ok(p) => p,
            Err(e) => return AttemptOutcome::Failure(e.to_string()),
        };

        let reply = match provider.generate(&prompt, Some(image)).await {
            Ok(r) => r,
            Err(e) => return AttemptOutcome::Failure(e.to_string()),
        };
        debug!(model = %provider.model(), "Vision reply: {}", reply);

        let draft = match extract_json_object(&reply)
            .and_then(|json| serde_json::from_str::<ExpenseDraft>(json).map_err(Error::Json))
        {
            Ok(d) => d,
            Err(e) => return AttemptOutcome::Failure(e.to_string()),
        };

        match validate_and_repair(&draft, today_date()) {
            Ok(record) => AttemptOutcome::Success(record),
            Err(e) => AttemptOutcome::Failure(e.to_string()),
        }
    }

    /// Extraction, normalization, then validation & repair
    async fn run_text_stages(
        &self,
        provider: &ProviderClient,
        text: &str,
        today: &str,
    ) -> Result<ExpenseRecord> {
        let draft = extract_expense(provider, &self.prompts, text, today).await?;
        let normalized = normalize_expense(provider, &self.prompts, &draft, text).await?;
        validate_and_repair(&normalized, today_date())
    }

    fn render(&self, id: PromptId, vars: &[(&str, &str)]) -> Result<String> {
        let mut prompts = self
            .prompts
            .write()
            .map_err(|_| Error::InvalidData("Failed to acquire prompt library lock".into()))?;
        let template = prompts.get(id)?;
        let vars: HashMap<&str, &str> = vars.iter().copied().collect();
        Ok(template.render_user(&vars))
    }
}

fn today_date() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn today_string() -> String {
    today_date().format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ocr::{MockOcr, OcrEngine};
    use crate::providers::MockProvider;

    fn config(
        text: Option<MockProvider>,
        vision: Option<MockProvider>,
        ocr: Option<MockOcr>,
    ) -> ProviderConfig {
        ProviderConfig {
            text: text.map(ProviderClient::Mock),
            vision: vision.map(ProviderClient::Mock),
            ocr: ocr.map(OcrEngine::Mock),
        }
    }

    const EXTRACT_REPLY: &str =
        r#"{"amount": 15.5, "category": "Food", "description": "Lunch at Chipotle", "date": "2026-02-17"}"#;
    const NORMALIZE_REPLY: &str =
        r#"{"amount": 15.5, "category": "Food", "description": "Lunch at Chipotle", "date": "2026-02-17"}"#;

    #[tokio::test]
    async fn test_parse_text_happy_path() {
        let text = MockProvider::new();
        text.push_reply(EXTRACT_REPLY);
        text.push_reply(NORMALIZE_REPLY);
        let pipeline = ExpensePipeline::with_embedded_prompts(config(Some(text), None, None));

        let record = pipeline
            .parse_text("Lunch at Chipotle for $15.50")
            .await
            .unwrap();
        assert_eq!(record.amount, 15.5);
        assert_eq!(record.category.as_str(), "Food");
    }

    #[tokio::test]
    async fn test_parse_text_rejects_over_limit() {
        let pipeline =
            ExpensePipeline::with_embedded_prompts(config(Some(MockProvider::new()), None, None));
        let long = "a".repeat(MAX_TEXT_INPUT_CHARS + 1);
        assert!(matches!(
            pipeline.parse_text(&long).await,
            Err(Error::InvalidData(_))
        ));
    }

    #[tokio::test]
    async fn test_parse_text_rejects_empty() {
        let pipeline =
            ExpensePipeline::with_embedded_prompts(config(Some(MockProvider::new()), None, None));
        assert!(pipeline.parse_text("   ").await.is_err());
    }

    #[tokio::test]
    async fn test_receipt_primary_path() {
        let text = MockProvider::new();
        text.push_reply(
            r#"{"amount": 13.32, "category": "Healthcare", "description": "CVS Pharmacy", "date": "2026-02-17", "merchant": "CVS"}"#,
        );
        text.push_reply(
            r#"{"amount": 13.32, "category": "Healthcare", "description": "CVS Pharmacy", "date": "2026-02-17", "merchant": "CVS"}"#,
        );
        let ocr = MockOcr::returning("CVS PHARMACY\nIBUPROFEN 12.25\nTAX 1.07\nTOTAL 13.32");
        let pipeline =
            ExpensePipeline::with_embedded_prompts(config(Some(text), None, Some(ocr)));

        let record = pipeline.parse_receipt(b"\xff\xd8fake").await.unwrap();
        assert_eq!(record.amount, 13.32);
        assert_eq!(record.category.as_str(), "Healthcare");
    }

    #[tokio::test]
    async fn test_short_ocr_falls_back_to_vision() {
        // Text provider scripted with nothing: if the primary attempt
        // ran a model call the test would fail on script exhaustion.
        let vision = MockProvider::with_vision();
        vision.push_reply(
            r#"{"amount": 8.0, "category": "Food", "description": "Coffee", "date": "2026-02-17"}"#,
        );
        let ocr = MockOcr::returning("::: :::");
        let pipeline = ExpensePipeline::with_embedded_prompts(config(
            Some(MockProvider::new()),
            Some(vision),
            Some(ocr),
        ));

        let record = pipeline.parse_receipt(b"img").await.unwrap();
        assert_eq!(record.amount, 8.0);
    }

    #[tokio::test]
    async fn test_missing_ocr_falls_back_to_vision() {
        let vision = MockProvider::with_vision();
        vision.push_reply(
            r#"{"amount": 20.0, "category": "Shopping", "description": "Socks", "date": "2026-02-17"}"#,
        );
        let pipeline = ExpensePipeline::with_embedded_prompts(config(
            Some(MockProvider::new()),
            Some(vision),
            None,
        ));

        let record = pipeline.parse_receipt(b"img").await.unwrap();
        assert_eq!(record.category.as_str(), "Shopping");
    }

    #[tokio::test]
    async fn test_all_links_failing_is_exhausted() {
        let ocr = MockOcr::failing();
        let vision = MockProvider::with_vision();
        vision.push_error("vision model unavailable");
        let pipeline = ExpensePipeline::with_embedded_prompts(config(
            Some(MockProvider::new()),
            Some(vision),
            Some(ocr),
        ));

        let err = pipeline.parse_receipt(b"img").await.unwrap_err();
        match err {
            Error::Exhausted(reasons) => {
                assert!(reasons.contains("ocr:"));
                assert!(reasons.contains("vision:"));
            }
            other => panic!("expected Exhausted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_vision_failure_after_primary_failure_reports_both() {
        // Primary fails late (bad schema out of normalization), vision
        // also fails; both reasons appear in the final error.
        let text = MockProvider::new();
        text.push_reply(r#"{"amount": "not a number"}"#);
        text.push_reply(r#"{"amount": "still not"}"#);
        let ocr = MockOcr::returning("TOTAL $13.32 THANK YOU");
        let pipeline =
            ExpensePipeline::with_embedded_prompts(config(Some(text), None, Some(ocr)));

        let err = pipeline.parse_receipt(b"img").await.unwrap_err();
        assert!(matches!(err, Error::Exhausted(_)));
    }

    #[tokio::test]
    async fn test_text_only_provider_in_vision_slot_is_skipped() {
        // The vision link reports unavailable for a text-only provider,
        // so the coordinator never sends it an image. An empty script
        // would fail the test if a model call slipped through.
        let pipeline = ExpensePipeline::with_embedded_prompts(config(
            None,
            Some(MockProvider::new()),
            None,
        ));
        assert!(!pipeline.config().chain()[1].available);

        let err = pipeline.parse_receipt(b"img").await.unwrap_err();
        match err {
            Error::Exhausted(reasons) => {
                assert!(reasons.contains("vision: required providers not configured"));
            }
            other => panic!("expected Exhausted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_image_rejected() {
        let pipeline = ExpensePipeline::with_embedded_prompts(config(None, None, None));
        assert!(matches!(
            pipeline.parse_receipt(b"").await,
            Err(Error::InvalidData(_))
        ));
    }
}
