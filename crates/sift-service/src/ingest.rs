//! Ingestion write path: one structured resume document in, all four
//! stores updated in one transaction. The retrieval core never writes;
//! this module is the only producer of what it reads.

use std::hash::{Hash, Hasher};

use serde_json::Value;
use time::OffsetDateTime;
use tracing::debug;

use sift_chunking::{chunk_resume, extract_skills, total_yoe};
use sift_domain::vector::vec_to_blob;
use sift_storage::{
	models::{NewChunk, NewResume, NewSkill},
	resumes,
};

use crate::{ServiceError, ServiceResult, SiftService};

const EMBEDDING_BATCH_SIZE: usize = 64;

#[derive(Clone, Debug)]
pub struct IngestOutcome {
	pub resume_id: String,
	pub chunk_count: usize,
	pub skill_count: usize,
}

impl SiftService {
	/// Ingest one resume document: derive the id, decompose into chunks
	/// and ledger entries, embed the chunk texts, and replace whatever
	/// was stored for that id before.
	pub async fn ingest_resume(&self, resume: &Value) -> ServiceResult<IngestOutcome> {
		if !resume.is_object() {
			return Err(ServiceError::InvalidQuery {
				message: "A resume document must be a JSON object.".to_string(),
			});
		}

		let resume_id = resume_id_for(resume);
		let now = OffsetDateTime::now_utc();

		let chunks = chunk_resume(resume, &resume_id);
		let ledger = extract_skills(resume);

		let texts: Vec<String> = chunks.iter().map(|chunk| chunk.chunk_text.clone()).collect();
		let embeddings = self.embed_batched(&texts).await?;

		let experience = resume.get("experience").cloned().unwrap_or(Value::Array(Vec::new()));
		let new_resume = NewResume {
			resume_id: resume_id.clone(),
			summary: resume
				.pointer("/personal_info/summary")
				.and_then(|v| v.as_str())
				.unwrap_or("")
				.trim()
				.to_string(),
			location_country: location_field(resume, "country"),
			location_city: location_field(resume, "city"),
			total_yoe: i64::from(total_yoe(&experience, now.date())),
			experience,
			projects: resume.get("projects").cloned().unwrap_or(Value::Array(Vec::new())),
			education: resume.get("education").cloned().unwrap_or(Value::Array(Vec::new())),
			pii_payload: resume
				.get("personal_info")
				.cloned()
				.unwrap_or(Value::Object(serde_json::Map::new())),
			skills: ledger
				.into_iter()
				.map(|entry| NewSkill {
					skill_canonical: entry.skill_canonical,
					confidence: entry.confidence,
					evidence_count: entry.evidence_count,
					evidence_sources: entry.evidence_sources,
				})
				.collect(),
			chunks: chunks
				.into_iter()
				.zip(embeddings)
				.map(|(chunk, embedding)| NewChunk {
					chunk_id: chunk.chunk_id,
					section_type: chunk.section_type.to_string(),
					section_ordinal: chunk.section_ordinal,
					chunk_text: chunk.chunk_text,
					embedding: vec_to_blob(&embedding),
					skills_in_chunk: chunk.skills_in_chunk,
				})
				.collect(),
		};

		let outcome = IngestOutcome {
			resume_id: resume_id.clone(),
			chunk_count: new_resume.chunks.len(),
			skill_count: new_resume.skills.len(),
		};
		resumes::replace_resume(&self.db.pool, &new_resume, now).await?;
		debug!(
			resume_id = %outcome.resume_id,
			chunks = outcome.chunk_count,
			skills = outcome.skill_count,
			"Resume ingested."
		);
		Ok(outcome)
	}

	async fn embed_batched(&self, texts: &[String]) -> ServiceResult<Vec<Vec<f32>>> {
		let mut out = Vec::with_capacity(texts.len());
		for batch in texts.chunks(EMBEDDING_BATCH_SIZE) {
			let embedded =
				self.providers.embedding.embed(&self.cfg.providers.embedding, batch).await?;
			if embedded.len() != batch.len() {
				return Err(ServiceError::UpstreamUnavailable {
					message: "Embedding provider returned a mismatched vector count.".to_string(),
				});
			}
			out.extend(embedded);
		}
		Ok(out)
	}
}

/// Stable id for a resume document: an explicit id field wins, then the
/// email address, then the whole document content.
fn resume_id_for(resume: &Value) -> String {
	for key in ["resume_id", "resumeId"] {
		if let Some(id) = resume.get(key).and_then(|v| v.as_str()) {
			let trimmed = id.trim();
			if !trimmed.is_empty() {
				return trimmed.to_string();
			}
		}
	}

	if let Some(email) = resume.pointer("/personal_info/email").and_then(|v| v.as_str()) {
		let trimmed = email.trim().to_lowercase();
		if !trimmed.is_empty() {
			return format!("r-{}", stable_hash(&trimmed));
		}
	}

	format!("r-{}", stable_hash(&resume.to_string()))
}

fn stable_hash(input: &str) -> String {
	let mut hasher = std::collections::hash_map::DefaultHasher::new();
	input.hash(&mut hasher);
	format!("{:016x}", hasher.finish())
}

fn location_field(resume: &Value, key: &str) -> String {
	let pointers = [
		format!("/personal_info/location/{key}"),
		format!("/location/{key}"),
		format!("/location_{key}"),
	];
	for pointer in &pointers {
		if let Some(value) = resume.pointer(pointer).and_then(|v| v.as_str()) {
			let trimmed = value.trim();
			if !trimmed.is_empty() {
				return trimmed.to_string();
			}
		}
	}
	String::new()
}
