use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result};

/// Cross-encoder scores for `(query, document)` pairs:
/// `POST {api_base}{path} { query, documents, top_k } ->
/// { results: [{ index, score }] }`. Scores come back aligned to the
/// input order; documents the provider omitted score 0.0.
pub async fn rerank(
	cfg: &sift_config::ProviderConfig,
	query: &str,
	docs: &[String],
	top_k: usize,
) -> Result<Vec<f32>> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({ "query": query, "documents": docs, "top_k": top_k });
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_rerank_response(json, docs.len())
}

fn parse_rerank_response(json: Value, doc_count: usize) -> Result<Vec<f32>> {
	let results = json.get("results").and_then(|v| v.as_array()).ok_or_else(|| {
		Error::InvalidResponse { message: "Rerank response is missing results array.".to_string() }
	})?;

	let mut scores = vec![0.0f32; doc_count];
	for item in results {
		let index = item.get("index").and_then(|v| v.as_u64()).ok_or_else(|| {
			Error::InvalidResponse { message: "Rerank result missing index.".to_string() }
		})? as usize;
		let score = item.get("score").and_then(|v| v.as_f64()).ok_or_else(|| {
			Error::InvalidResponse { message: "Rerank result missing score.".to_string() }
		})? as f32;

		if index < scores.len() {
			scores[index] = score.clamp(0.0, 1.0);
		}
	}

	Ok(scores)
}
