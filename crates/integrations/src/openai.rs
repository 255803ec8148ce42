//! OpenAI chat-completions client for FairPrice and SnapFix.
//!
//! Both features ask the model for a JSON object and hand the parsed value
//! back to `servicematch_core`, which validates it and falls back to the
//! static tables when the answer is unusable.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum OpenAiError {
    #[error("OpenAI request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("OpenAI API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The model answered, but not with a JSON object.
    #[error("Unusable model response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub api_base: String,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    config: OpenAiConfig,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Inputs for a FairPrice estimate.
#[derive(Debug, Clone)]
pub struct PricePrompt<'a> {
    pub category: &'a str,
    pub region: &'a str,
    pub description: &'a str,
    pub month: u32,
}

/// Inputs for a SnapFix diagnosis.
#[derive(Debug, Clone)]
pub struct DiagnosisPrompt<'a> {
    pub description: &'a str,
    pub category_hint: Option<&'a str>,
    pub image_url: Option<&'a str>,
}

const PRICE_SYSTEM_PROMPT: &str = "You estimate fair UK prices for home repair and \
maintenance jobs. Answer with a JSON object: {\"low\": number, \"typical\": number, \
\"high\": number, \"rationale\": string}. Amounts are in pounds sterling including \
labour and typical materials.";

const DIAGNOSIS_SYSTEM_PROMPT: &str = "You diagnose household problems for UK \
homeowners. Answer with a JSON object: {\"likely_issue\": string, \"category\": string, \
\"urgency\": \"LOW\"|\"MEDIUM\"|\"HIGH\"|\"EMERGENCY\", \"diy_possible\": boolean, \
\"estimated_low\": number, \"estimated_high\": number, \"advice\": string}. Costs are in \
pounds sterling. Category must be one of: ";

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self, OpenAiError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Ask for a FairPrice estimate. Returns the raw JSON object.
    pub async fn estimate_price(&self, prompt: &PricePrompt<'_>) -> Result<Value, OpenAiError> {
        let messages = json!([
            {"role": "system", "content": PRICE_SYSTEM_PROMPT},
            {"role": "user", "content": price_user_message(prompt)},
        ]);
        self.chat_json(messages).await
    }

    /// Ask for a SnapFix diagnosis, attaching the photo when one is given.
    pub async fn diagnose(&self, prompt: &DiagnosisPrompt<'_>) -> Result<Value, OpenAiError> {
        let system = format!(
            "{DIAGNOSIS_SYSTEM_PROMPT}{}.",
            servicematch_core::categories::VALID_CATEGORIES.join(", ")
        );
        let messages = json!([
            {"role": "system", "content": system},
            {"role": "user", "content": diagnosis_user_content(prompt)},
        ]);
        self.chat_json(messages).await
    }

    async fn chat_json(&self, messages: Value) -> Result<Value, OpenAiError> {
        let body = json!({
            "model": self.config.model,
            "messages": messages,
            "response_format": {"type": "json_object"},
            "temperature": 0.2,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.api_base))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(OpenAiError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let chat: ChatResponse = response.json().await?;
        extract_json_content(chat)
    }
}

fn price_user_message(prompt: &PricePrompt<'_>) -> String {
    format!(
        "Category: {}\nRegion: {}\nMonth: {}\nJob: {}",
        prompt.category,
        prompt.region.replace('_', " "),
        prompt.month,
        prompt.description.trim()
    )
}

fn diagnosis_user_content(prompt: &DiagnosisPrompt<'_>) -> Value {
    let mut text = format!("Problem: {}", prompt.description.trim());
    if let Some(hint) = prompt.category_hint {
        text.push_str(&format!("\nThe homeowner thinks this is a {hint} job."));
    }
    match prompt.image_url {
        Some(url) => json!([
            {"type": "text", "text": text},
            {"type": "image_url", "image_url": {"url": url}},
        ]),
        None => Value::String(text),
    }
}

fn extract_json_content(chat: ChatResponse) -> Result<Value, OpenAiError> {
    let content = chat
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| OpenAiError::InvalidResponse("no content".into()))?;
    let value: Value = serde_json::from_str(content.trim())
        .map_err(|e| OpenAiError::InvalidResponse(e.to_string()))?;
    if value.is_object() {
        Ok(value)
    } else {
        Err(OpenAiError::InvalidResponse("expected a JSON object".into()))
    }
}
