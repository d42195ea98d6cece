//! Provider chain configuration
//!
//! Built once at startup from the environment and passed to the
//! pipeline by value; no globals. The receipt fallback chain has a
//! fixed shape: local OCR + text model first, then the vision model.

use tracing::info;

use super::ocr::{OcrEngine, TesseractOcr};
use super::{GeminiBackend, GroqBackend, Provider, ProviderClient};

/// What a chain link needs to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Local OCR plus a text model
    TextAndOcr,
    /// A vision-capable model
    Vision,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TextAndOcr => "text+ocr",
            Self::Vision => "vision",
        }
    }
}

/// One link of the receipt fallback chain
#[derive(Debug, Clone, Copy)]
pub struct ChainLink {
    pub capability: Capability,
    pub available: bool,
}

/// Startup health snapshot, for a status command or endpoint
#[derive(Debug, Clone)]
pub struct HealthReport {
    pub text_provider: Option<(String, bool)>,
    pub vision_provider: Option<(String, bool)>,
    pub ocr_available: bool,
}

/// Immutable provider configuration
///
/// `text` handles extraction/normalization/chat prompts; `vision` is
/// the receipt fallback; `ocr` feeds the primary receipt attempt.
/// Any slot may be empty, in which case the chain links that need it
/// report unavailable.
#[derive(Clone)]
pub struct ProviderConfig {
    pub text: Option<ProviderClient>,
    pub vision: Option<ProviderClient>,
    pub ocr: Option<OcrEngine>,
}

impl ProviderConfig {
    /// Build from environment variables
    ///
    /// `CENTSIBLE_TEXT_PROVIDER` selects the text slot (`groq` default,
    /// or `gemini`). Gemini fills the vision slot whenever its key is
    /// present, independent of the text selection.
    pub fn from_env() -> Self {
        let choice = std::env::var("CENTSIBLE_TEXT_PROVIDER").unwrap_or_else(|_| "groq".into());
        let text = match choice.to_lowercase().as_str() {
            "gemini" => GeminiBackend::from_env().map(ProviderClient::Gemini),
            _ => GroqBackend::from_env()
                .map(ProviderClient::Groq)
                .or_else(|| GeminiBackend::from_env().map(ProviderClient::Gemini)),
        };
        let vision = GeminiBackend::from_env().map(ProviderClient::Gemini);
        let ocr = TesseractOcr::from_env().map(OcrEngine::Tesseract);

        if let Some(ref p) = text {
            info!(model = %p.model(), host = %p.host(), "Text provider configured");
        }
        if let Some(ref p) = vision {
            info!(model = %p.model(), "Vision provider configured");
        }
        info!(ocr = ocr.is_some(), "OCR availability checked");

        Self { text, vision, ocr }
    }

    /// The fixed receipt fallback chain, in attempt order
    ///
    /// The coordinator walks this same array, so the reported chain and
    /// the attempt gating cannot disagree.
    pub fn chain(&self) -> [ChainLink; 2] {
        [Capability::TextAndOcr, Capability::Vision].map(|capability| ChainLink {
            capability,
            available: self.link_available(capability),
        })
    }

    /// Whether a chain link has everything it needs to run
    pub fn link_available(&self, capability: Capability) -> bool {
        match capability {
            Capability::TextAndOcr => self.text.is_some() && self.ocr.is_some(),
            Capability::Vision => self.vision.as_ref().is_some_and(|p| p.supports_vision()),
        }
    }

    /// Whether the OCR-first receipt path can run at all
    pub fn primary_available(&self) -> bool {
        self.link_available(Capability::TextAndOcr)
    }

    /// Probe provider health for a status report
    pub async fn health_report(&self) -> HealthReport {
        let text_provider = match &self.text {
            Some(p) => Some((p.model().to_string(), p.health_check().await)),
            None => None,
        };
        let vision_provider = match &self.vision {
            Some(p) => Some((p.model().to_string(), p.health_check().await)),
            None => None,
        };
        HealthReport {
            text_provider,
            vision_provider,
            ocr_available: self.ocr.is_some(),
        }
    }
}
