use sqlx::{QueryBuilder, SqlitePool};
use time::OffsetDateTime;

use crate::{
	Result,
	models::{NewResume, ResumeCoreRow, SkillRow},
};

pub async fn fetch_core(pool: &SqlitePool, resume_id: &str) -> Result<Option<ResumeCoreRow>> {
	let row = sqlx::query_as(
		"SELECT resume_id, summary, location_country, location_city, total_yoe, experience, \
		 projects, education, ingested_at FROM resumes_core WHERE resume_id = $1",
	)
	.bind(resume_id)
	.fetch_optional(pool)
	.await?;
	Ok(row)
}

pub async fn fetch_cores(pool: &SqlitePool, resume_ids: &[String]) -> Result<Vec<ResumeCoreRow>> {
	if resume_ids.is_empty() {
		return Ok(Vec::new());
	}

	let mut builder = QueryBuilder::new(
		"SELECT resume_id, summary, location_country, location_city, total_yoe, experience, \
		 projects, education, ingested_at FROM resumes_core WHERE resume_id IN (",
	);
	{
		let mut separated = builder.separated(", ");
		for id in resume_ids {
			separated.push_bind(id);
		}
	}
	builder.push(") ORDER BY resume_id ASC");

	Ok(builder.build_query_as().fetch_all(pool).await?)
}

/// Core-profile predicates applied between gating and retrieval: minimum
/// years of experience and a case-insensitive country substring.
pub async fn filter_candidates(
	pool: &SqlitePool,
	resume_ids: &[String],
	min_yoe: Option<i64>,
	location_country: Option<&str>,
) -> Result<Vec<String>> {
	if resume_ids.is_empty() {
		return Ok(Vec::new());
	}

	let mut builder = QueryBuilder::new("SELECT resume_id FROM resumes_core WHERE resume_id IN (");
	{
		let mut separated = builder.separated(", ");
		for id in resume_ids {
			separated.push_bind(id);
		}
	}
	builder.push(")");
	if let Some(min_yoe) = min_yoe {
		builder.push(" AND total_yoe >= ");
		builder.push_bind(min_yoe);
	}
	if let Some(country) = location_country.map(str::trim).filter(|c| !c.is_empty()) {
		builder.push(" AND instr(lower(location_country), lower(");
		builder.push_bind(country);
		builder.push(")) > 0");
	}
	builder.push(" ORDER BY resume_id ASC");

	Ok(builder.build_query_scalar().fetch_all(pool).await?)
}

pub async fn skills_for_resume(pool: &SqlitePool, resume_id: &str) -> Result<Vec<SkillRow>> {
	let rows = sqlx::query_as(
		"SELECT resume_id, skill_canonical, confidence, evidence_count, evidence_sources \
		 FROM resume_skills WHERE resume_id = $1 ORDER BY skill_canonical ASC",
	)
	.bind(resume_id)
	.fetch_all(pool)
	.await?;
	Ok(rows)
}

/// Replace every trace of a resume in one transaction: core, PII, ledger
/// rows, chunks. Readers see the old resume or the new one, never a mix.
pub async fn replace_resume(
	pool: &SqlitePool,
	resume: &NewResume,
	now: OffsetDateTime,
) -> Result<()> {
	let mut tx = pool.begin().await?;

	sqlx::query("DELETE FROM resume_skills WHERE resume_id = $1")
		.bind(&resume.resume_id)
		.execute(&mut *tx)
		.await?;
	sqlx::query("DELETE FROM resume_chunks WHERE resume_id = $1")
		.bind(&resume.resume_id)
		.execute(&mut *tx)
		.await?;

	sqlx::query(
		"INSERT INTO resumes_core \
		 (resume_id, summary, location_country, location_city, total_yoe, experience, projects, \
		 education, ingested_at) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9) \
		 ON CONFLICT (resume_id) DO UPDATE SET summary = excluded.summary, \
		 location_country = excluded.location_country, location_city = excluded.location_city, \
		 total_yoe = excluded.total_yoe, experience = excluded.experience, \
		 projects = excluded.projects, education = excluded.education, \
		 ingested_at = excluded.ingested_at",
	)
	.bind(&resume.resume_id)
	.bind(&resume.summary)
	.bind(&resume.location_country)
	.bind(&resume.location_city)
	.bind(resume.total_yoe)
	.bind(resume.experience.to_string())
	.bind(resume.projects.to_string())
	.bind(resume.education.to_string())
	.bind(now)
	.execute(&mut *tx)
	.await?;

	sqlx::query(
		"INSERT INTO resumes_pii (resume_id, payload) VALUES ($1,$2) \
		 ON CONFLICT (resume_id) DO UPDATE SET payload = excluded.payload",
	)
	.bind(&resume.resume_id)
	.bind(resume.pii_payload.to_string())
	.execute(&mut *tx)
	.await?;

	for skill in &resume.skills {
		sqlx::query(
			"INSERT INTO resume_skills \
			 (resume_id, skill_canonical, confidence, evidence_count, evidence_sources) \
			 VALUES ($1,$2,$3,$4,$5)",
		)
		.bind(&resume.resume_id)
		.bind(&skill.skill_canonical)
		.bind(skill.confidence)
		.bind(skill.evidence_count)
		.bind(serde_json::to_string(&skill.evidence_sources)?)
		.execute(&mut *tx)
		.await?;
	}

	for chunk in &resume.chunks {
		sqlx::query(
			"INSERT INTO resume_chunks \
			 (chunk_id, resume_id, section_type, section_ordinal, chunk_text, embedding, \
			 skills_in_chunk) VALUES ($1,$2,$3,$4,$5,$6,$7)",
		)
		.bind(&chunk.chunk_id)
		.bind(&resume.resume_id)
		.bind(&chunk.section_type)
		.bind(chunk.section_ordinal)
		.bind(&chunk.chunk_text)
		.bind(&chunk.embedding)
		.bind(serde_json::to_string(&chunk.skills_in_chunk)?)
		.execute(&mut *tx)
		.await?;
	}

	tx.commit().await?;
	Ok(())
}

/// Remove a resume from all four tables atomically. Returns `false` when
/// the resume was never there.
pub async fn delete_resume(pool: &SqlitePool, resume_id: &str) -> Result<bool> {
	let mut tx = pool.begin().await?;

	let deleted = sqlx::query("DELETE FROM resumes_core WHERE resume_id = $1")
		.bind(resume_id)
		.execute(&mut *tx)
		.await?
		.rows_affected();
	sqlx::query("DELETE FROM resumes_pii WHERE resume_id = $1")
		.bind(resume_id)
		.execute(&mut *tx)
		.await?;
	sqlx::query("DELETE FROM resume_skills WHERE resume_id = $1")
		.bind(resume_id)
		.execute(&mut *tx)
		.await?;
	sqlx::query("DELETE FROM resume_chunks WHERE resume_id = $1")
		.bind(resume_id)
		.execute(&mut *tx)
		.await?;

	tx.commit().await?;
	Ok(deleted > 0)
}
