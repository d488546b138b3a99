//! Batch ingestion runner: reads a JSON or JSONL file of structured
//! resume documents and feeds each one through the service write path.

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use sift_service::SiftService;
use sift_storage::Db;

#[derive(Debug, Parser)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// Input file: a JSON array of resumes, or one JSON object per line.
	#[arg(value_name = "INPUT")]
	pub input: PathBuf,
	/// Only ingest the first N resumes.
	#[arg(long)]
	pub limit: Option<usize>,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = sift_config::load(&args.config)?;
	let filter = EnvFilter::try_new(&config.service.log_level)
		.unwrap_or_else(|_| EnvFilter::new("info"));
	tracing_subscriber::fmt().with_env_filter(filter).init();

	let db = Db::connect(&config.storage.sqlite).await?;
	db.ensure_schema().await?;
	let service = SiftService::new(config, db);

	let mut resumes = read_resumes(&args.input)?;
	if let Some(limit) = args.limit {
		resumes.truncate(limit);
	}
	info!(count = resumes.len(), input = %args.input.display(), "Starting ingestion.");

	let mut ingested = 0usize;
	let mut chunk_count = 0usize;
	let mut skill_count = 0usize;
	let mut errors = 0usize;
	for (idx, resume) in resumes.iter().enumerate() {
		match service.ingest_resume(resume).await {
			Ok(outcome) => {
				ingested += 1;
				chunk_count += outcome.chunk_count;
				skill_count += outcome.skill_count;
			},
			Err(err) => {
				errors += 1;
				error!(index = idx, error = %err, "Failed to ingest resume.");
			},
		}
		if (idx + 1) % 100 == 0 {
			info!(processed = idx + 1, total = resumes.len(), "Ingestion progress.");
		}
	}

	info!(ingested, chunk_count, skill_count, errors, "Ingestion complete.");
	if ingested == 0 && errors > 0 {
		return Err(color_eyre::eyre::eyre!("Every resume failed to ingest."));
	}
	Ok(())
}

/// Accepts a whole-file JSON document (object or arbitrarily nested
/// arrays of objects) and falls back to JSONL, skipping unparsable
/// lines.
fn read_resumes(path: &std::path::Path) -> color_eyre::Result<Vec<serde_json::Value>> {
	let raw = std::fs::read_to_string(path)?;

	if let Ok(document) = serde_json::from_str::<serde_json::Value>(&raw) {
		let mut out = Vec::new();
		flatten_into(document, &mut out);
		return Ok(out);
	}

	let mut out = Vec::new();
	for line in raw.lines() {
		let trimmed = line.trim();
		if trimmed.is_empty() {
			continue;
		}
		if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
			flatten_into(value, &mut out);
		}
	}
	Ok(out)
}

fn flatten_into(value: serde_json::Value, out: &mut Vec<serde_json::Value>) {
	match value {
		serde_json::Value::Array(items) => {
			for item in items {
				flatten_into(item, out);
			}
		},
		serde_json::Value::Object(_) => out.push(value),
		_ => {},
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn flatten_descends_nested_arrays() {
		let mut out = Vec::new();
		flatten_into(serde_json::json!([[{ "a": 1 }], { "b": 2 }, "junk"]), &mut out);
		assert_eq!(out.len(), 2);
	}
}
