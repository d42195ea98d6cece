//! Provider status command

use anyhow::Result;
use centsible_core::ProviderConfig;

/// Show provider and OCR availability
pub async fn cmd_status(json: bool) -> Result<()> {
    let config = ProviderConfig::from_env();
    let report = config.health_report().await;

    if json {
        let value = serde_json::json!({
            "text_provider": report.text_provider.as_ref().map(|(model, healthy)| {
                serde_json::json!({"model": model, "healthy": healthy})
            }),
            "vision_provider": report.vision_provider.as_ref().map(|(model, healthy)| {
                serde_json::json!({"model": model, "healthy": healthy})
            }),
            "ocr_available": report.ocr_available,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Provider status:\n");
    match report.text_provider {
        Some((model, healthy)) => {
            println!(
                "  Text:   {} ({})",
                model,
                if healthy { "healthy" } else { "unreachable" }
            );
        }
        None => println!("  Text:   not configured (set GROQ_API_KEY or GEMINI_API_KEY)"),
    }
    match report.vision_provider {
        Some((model, healthy)) => {
            println!(
                "  Vision: {} ({})",
                model,
                if healthy { "healthy" } else { "unreachable" }
            );
        }
        None => println!("  Vision: not configured (set GEMINI_API_KEY)"),
    }
    println!(
        "  OCR:    {}",
        if report.ocr_available {
            "tesseract found"
        } else {
            "tesseract not found on PATH"
        }
    );

    let chain = config.chain();
    println!("\nReceipt fallback chain:");
    for (i, link) in chain.iter().enumerate() {
        println!(
            "  {}. {} ({})",
            i + 1,
            link.capability.as_str(),
            if link.available { "available" } else { "unavailable" }
        );
    }
    Ok(())
}
