use time::OffsetDateTime;

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct ResumeCoreRow {
	pub resume_id: String,
	pub summary: String,
	pub location_country: String,
	pub location_city: String,
	pub total_yoe: i64,
	pub experience: String,
	pub projects: String,
	pub education: String,
	pub ingested_at: OffsetDateTime,
}

impl ResumeCoreRow {
	/// JSON columns are stored as text; a row that fails to parse yields
	/// an empty array rather than poisoning the whole response.
	pub fn experience_json(&self) -> serde_json::Value {
		parse_json_array(&self.experience)
	}

	pub fn projects_json(&self) -> serde_json::Value {
		parse_json_array(&self.projects)
	}

	pub fn education_json(&self) -> serde_json::Value {
		parse_json_array(&self.education)
	}
}

fn parse_json_array(raw: &str) -> serde_json::Value {
	serde_json::from_str(raw).unwrap_or(serde_json::Value::Array(Vec::new()))
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct SkillRow {
	pub resume_id: String,
	pub skill_canonical: String,
	pub confidence: f32,
	pub evidence_count: i64,
	pub evidence_sources: String,
}

impl SkillRow {
	pub fn evidence_sources_list(&self) -> Vec<String> {
		serde_json::from_str(&self.evidence_sources).unwrap_or_default()
	}
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct ChunkRow {
	pub chunk_id: String,
	pub resume_id: String,
	pub section_type: String,
	pub section_ordinal: i64,
	pub chunk_text: String,
	pub embedding: Vec<u8>,
	pub skills_in_chunk: String,
}

impl ChunkRow {
	pub fn skills_in_chunk_list(&self) -> Vec<String> {
		serde_json::from_str(&self.skills_in_chunk).unwrap_or_default()
	}
}

/// Everything ingestion writes for one resume, applied in one transaction.
#[derive(Clone, Debug)]
pub struct NewResume {
	pub resume_id: String,
	pub summary: String,
	pub location_country: String,
	pub location_city: String,
	pub total_yoe: i64,
	pub experience: serde_json::Value,
	pub projects: serde_json::Value,
	pub education: serde_json::Value,
	pub pii_payload: serde_json::Value,
	pub skills: Vec<NewSkill>,
	pub chunks: Vec<NewChunk>,
}

#[derive(Clone, Debug)]
pub struct NewSkill {
	pub skill_canonical: String,
	pub confidence: f32,
	pub evidence_count: i64,
	pub evidence_sources: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct NewChunk {
	pub chunk_id: String,
	pub section_type: String,
	pub section_ordinal: i64,
	pub chunk_text: String,
	pub embedding: Vec<u8>,
	pub skills_in_chunk: Vec<String>,
}
