use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result};

const MAX_ATTEMPTS: usize = 2;

/// Ask the extraction LLM for a JSON object. The chat-completions call is
/// retried once when the content fails to parse; transport errors are
/// returned immediately so the caller can degrade.
pub async fn extract(cfg: &sift_config::LlmProviderConfig, messages: &[Value]) -> Result<Value> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);

	let mut last_error = None;
	for _ in 0..MAX_ATTEMPTS {
		let body = serde_json::json!({
			"model": cfg.model,
			"temperature": cfg.temperature,
			"messages": messages,
		});
		let res = client
			.post(&url)
			.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
			.json(&body)
			.send()
			.await?;
		let json: Value = res.error_for_status()?.json().await?;
		match parse_extractor_json(json) {
			Ok(parsed) => return Ok(parsed),
			Err(err) => last_error = Some(err),
		}
	}

	Err(last_error.unwrap_or(Error::InvalidResponse {
		message: "Extractor returned no parsable JSON.".to_string(),
	}))
}

/// Pull the assistant message out of a chat-completions response and
/// parse it as JSON, tolerating markdown code fences.
fn parse_extractor_json(json: Value) -> Result<Value> {
	if let Some(content) = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
	{
		let parsed: Value =
			serde_json::from_str(strip_code_fences(content)).map_err(|_| Error::InvalidResponse {
				message: "Extractor content is not valid JSON.".to_string(),
			})?;
		return Ok(parsed);
	}

	if json.is_object() {
		return Ok(json);
	}

	Err(Error::InvalidResponse { message: "Extractor response is missing JSON content.".to_string() })
}

fn strip_code_fences(content: &str) -> &str {
	let trimmed = content.trim();
	let without_open = trimmed
		.strip_prefix("```json")
		.or_else(|| trimmed.strip_prefix("```"))
		.unwrap_or(trimmed);
	without_open.strip_suffix("```").unwrap_or(without_open).trim()
}
