//! Single-resume operations: the full profile view and the atomic
//! delete that keeps readers from ever seeing a half-removed resume.

use serde::{Deserialize, Serialize};

use sift_domain::headline::headline_from_experience;
use sift_storage::{chunks, resumes};

use crate::{ServiceError, ServiceResult, SiftService};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SkillOut {
	pub skill_canonical: String,
	pub confidence: f32,
	pub evidence_count: i64,
	pub evidence_sources: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkOut {
	pub chunk_id: String,
	pub section_type: String,
	pub section_ordinal: i64,
	pub chunk_text: String,
	pub skills_in_chunk: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResumeProfile {
	pub resume_id: String,
	pub headline: Option<String>,
	pub summary: String,
	pub total_yoe: i64,
	pub location_country: String,
	pub location_city: String,
	pub experience: serde_json::Value,
	pub projects: serde_json::Value,
	pub education: serde_json::Value,
	pub skills: Vec<SkillOut>,
	pub chunks: Vec<ChunkOut>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
	pub resume_id: String,
	pub deleted: bool,
}

impl SiftService {
	/// Core profile plus the full canonical skill list and text chunks.
	/// Embeddings never leave the store.
	pub async fn resume_profile(&self, resume_id: &str) -> ServiceResult<ResumeProfile> {
		let core = resumes::fetch_core(&self.db.pool, resume_id).await?.ok_or_else(|| {
			ServiceError::NotFound { message: format!("Resume {resume_id} does not exist.") }
		})?;
		let skills = resumes::skills_for_resume(&self.db.pool, resume_id).await?;
		let chunk_rows = chunks::chunks_for_resume(&self.db.pool, resume_id).await?;

		let experience = core.experience_json();
		let projects = core.projects_json();
		let education = core.education_json();
		Ok(ResumeProfile {
			headline: headline_from_experience(&experience),
			resume_id: core.resume_id,
			summary: core.summary,
			total_yoe: core.total_yoe,
			location_country: core.location_country,
			location_city: core.location_city,
			experience,
			projects,
			education,
			skills: skills
				.into_iter()
				.map(|row| SkillOut {
					evidence_sources: row.evidence_sources_list(),
					skill_canonical: row.skill_canonical,
					confidence: row.confidence,
					evidence_count: row.evidence_count,
				})
				.collect(),
			chunks: chunk_rows
				.into_iter()
				.map(|row| ChunkOut {
					skills_in_chunk: row.skills_in_chunk_list(),
					chunk_id: row.chunk_id,
					section_type: row.section_type,
					section_ordinal: row.section_ordinal,
					chunk_text: row.chunk_text,
				})
				.collect(),
		})
	}

	/// Remove all traces of a resume: core, PII, ledger rows, chunks.
	pub async fn delete_resume(&self, resume_id: &str) -> ServiceResult<DeleteResponse> {
		let deleted = resumes::delete_resume(&self.db.pool, resume_id).await?;
		if !deleted {
			return Err(ServiceError::NotFound {
				message: format!("Resume {resume_id} does not exist."),
			});
		}
		Ok(DeleteResponse { resume_id: resume_id.to_string(), deleted })
	}
}
