use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result};

/// `POST {api_base}{path} { texts } -> { embeddings: [[f32]] }`, one
/// vector per input text in input order.
pub async fn embed(
	cfg: &sift_config::EmbeddingProviderConfig,
	texts: &[String],
) -> Result<Vec<Vec<f32>>> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({ "texts": texts });
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_embedding_response(json, texts.len(), cfg.dimensions as usize)
}

fn parse_embedding_response(
	json: Value,
	expected_count: usize,
	expected_dim: usize,
) -> Result<Vec<Vec<f32>>> {
	let data = json.get("embeddings").and_then(|v| v.as_array()).ok_or_else(|| {
		Error::InvalidResponse {
			message: "Embedding response is missing the embeddings array.".to_string(),
		}
	})?;
	if data.len() != expected_count {
		return Err(Error::InvalidResponse {
			message: format!(
				"Embedding response returned {} vectors for {} texts.",
				data.len(),
				expected_count
			),
		});
	}

	let mut out = Vec::with_capacity(data.len());
	for item in data {
		let values = item.as_array().ok_or_else(|| Error::InvalidResponse {
			message: "Embedding entry is not an array.".to_string(),
		})?;
		let mut vec = Vec::with_capacity(values.len());
		for value in values {
			let number = value.as_f64().ok_or_else(|| Error::InvalidResponse {
				message: "Embedding value must be numeric.".to_string(),
			})?;
			vec.push(number as f32);
		}
		if vec.len() != expected_dim {
			return Err(Error::InvalidResponse {
				message: format!(
					"Embedding vector dimension {} does not match configured {}.",
					vec.len(),
					expected_dim
				),
			});
		}
		out.push(vec);
	}

	Ok(out)
}
