//! Test utilities for centsible-core
//!
//! Provides a mock model server speaking both supported wire formats
//! (Groq-style chat completions and Gemini generateContent) with
//! deterministic, prompt-pattern-matched replies. Used by integration
//! tests and available to downstream crates via the `test-utils`
//! feature.

use axum::{
    extract::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use tokio::sync::oneshot;

/// Mock model server for testing and development
pub struct MockModelServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockModelServer {
    /// Start the mock server on an available port
    pub async fn start() -> Self {
        let app = Router::new()
            .route("/openai/v1/models", get(handle_models))
            .route("/openai/v1/chat/completions", post(handle_chat_completions))
            .route("/v1beta/models", get(handle_models))
            .route("/v1beta/models/:model_call", post(handle_generate_content));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockModelServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Model listing, used by health checks on both APIs
async fn handle_models() -> Json<Value> {
    Json(json!({
        "object": "list",
        "data": [{"id": "mock-model", "object": "model"}],
        "models": [{"name": "mock-model"}]
    }))
}

#[derive(Debug, Deserialize)]
struct ChatCompletionsRequest {
    model: String,
    messages: Vec<ChatCompletionsMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionsMessage {
    content: String,
}

/// Groq-style chat completions endpoint
async fn handle_chat_completions(Json(request): Json<ChatCompletionsRequest>) -> Json<Value> {
    let prompt = request
        .messages
        .last()
        .map(|m| m.content.as_str())
        .unwrap_or("");
    let reply = reply_for_prompt(prompt, false);

    Json(json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion",
        "model": request.model,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": reply},
            "finish_reason": "stop"
        }]
    }))
}

/// Gemini-style generateContent endpoint
async fn handle_generate_content(Json(request): Json<Value>) -> Json<Value> {
    let parts = request
        .pointer("/contents/0/parts")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let prompt = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("");
    let has_image = parts.iter().any(|p| p.get("inline_data").is_some());
    let reply = reply_for_prompt(&prompt, has_image);

    Json(json!({
        "candidates": [{
            "content": {"parts": [{"text": reply}], "role": "model"}
        }]
    }))
}

/// Route a prompt to a deterministic canned reply
///
/// Pattern strings match the prompt files in prompts/*.md.
fn reply_for_prompt(prompt: &str, has_image: bool) -> String {
    if has_image || prompt.contains("receipt parsing assistant") {
        handle_receipt_mock()
    } else if prompt.contains("expense extraction assistant") {
        handle_extract_mock(prompt)
    } else if prompt.contains("data normalization assistant") {
        handle_normalize_mock(prompt)
    } else if prompt.contains("function calling assistant") {
        handle_function_call_mock(prompt)
    } else if prompt.contains("actionable insights") {
        r#"["Food is your top spending category", "You're within budget this month", "Try a weekly grocery cap"]"#.to_string()
    } else {
        // Chat fallthrough
        "Great question! You still have room in your budget this month.".to_string()
    }
}

/// Extraction: pull the quoted text out of the prompt and fake a draft
fn handle_extract_mock(prompt: &str) -> String {
    let text = extract_quoted(prompt, "Text: \"").unwrap_or_default();
    let lower = text.to_lowercase();

    let amount = extract_dollar_amount(&text).unwrap_or(10.0);

    let category = if lower.contains("lunch") || lower.contains("chipotle") {
        "Food"
    } else if lower.contains("gas") || lower.contains("uber") {
        "Transportation"
    } else if lower.contains("movie") {
        "Entertainment"
    } else if lower.contains("pharmacy") || lower.contains("cvs") {
        "Healthcare"
    } else {
        "Other"
    };

    // Only emit a date when the text actually carries a date cue, the
    // way a faithful model would; otherwise leave it null.
    let today = chrono::Local::now().date_naive();
    let date = if lower.contains("yesterday") {
        format!(r#""{}""#, today - chrono::Duration::days(1))
    } else if lower.contains("today") {
        format!(r#""{}""#, today)
    } else {
        "null".to_string()
    };

    format!(
        r#"{{"amount": {}, "category": "{}", "description": "{}", "date": {}}}"#,
        amount, category, text, date
    )
}

/// Normalization: echo back the extracted data, cleaned
fn handle_normalize_mock(prompt: &str) -> String {
    let draft_json = prompt
        .find("Extracted data: ")
        .map(|i| {
            let rest = &prompt[i + 16..];
            let end = rest.find('\n').unwrap_or(rest.len());
            &rest[..end]
        })
        .unwrap_or("{}");

    let mut draft: Value = serde_json::from_str(draft_json).unwrap_or_else(|_| json!({}));

    // Coerce string amounts the way a well-behaved model would
    if let Some(s) = draft.get("amount").and_then(Value::as_str) {
        let cleaned: String = s.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
        if let Ok(n) = cleaned.parse::<f64>() {
            draft["amount"] = json!(n);
        }
    }

    serde_json::to_string(&draft).unwrap_or_else(|_| "{}".to_string())
}

/// Function calling: route the quoted message onto a canned call
fn handle_function_call_mock(prompt: &str) -> String {
    let message = extract_quoted(prompt, "User message: \"").unwrap_or_default();
    let lower = message.to_lowercase();
    let today = chrono::Local::now().date_naive();

    if lower.contains("set") && lower.contains("budget") {
        let amount = extract_dollar_amount(&message).unwrap_or(1000.0);
        format!(
            r#"{{"function": "set_budget", "arguments": {{"amount": {}}}}}"#,
            amount
        )
    } else if lower.contains("add") || lower.contains("spent") {
        let amount = extract_dollar_amount(&message).unwrap_or(10.0);
        let category = if lower.contains("dinner") || lower.contains("lunch") || lower.contains("restaurant") {
            "Food"
        } else {
            "Other"
        };
        format!(
            r#"{{"function": "add_expense", "arguments": {{"amount": {}, "category": "{}", "description": "{}", "date": "{}"}}}}"#,
            amount, category, message, today
        )
    } else if lower.contains("show") || lower.contains("list") {
        r#"{"function": "query_expenses", "arguments": {"limit": 10}}"#.to_string()
    } else {
        r#"{"function": "get_budget_status", "arguments": {}}"#.to_string()
    }
}

/// Canned pharmacy receipt
fn handle_receipt_mock() -> String {
    let today = chrono::Local::now().date_naive();
    format!(
        r#"{{"amount": 13.32, "category": "Healthcare", "description": "CVS Pharmacy purchase", "date": "{}", "merchant": "CVS Pharmacy"}}"#,
        today
    )
}

fn extract_quoted<'a>(prompt: &'a str, marker: &str) -> Option<String> {
    let start = prompt.find(marker)? + marker.len();
    let rest = &prompt[start..];
    let end = rest.find('"')?;
    Some(rest[..end].to_string())
}

fn extract_dollar_amount(text: &str) -> Option<f64> {
    let start = text.find('$')? + 1;
    let rest = &text[start..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(rest.len());
    rest[..end].parse().ok()
}
