//! Skill-ledger gating: the deterministic pre-filter that excludes
//! resumes lacking the minimum required canonical skills before any
//! retrieval work happens.

use std::collections::BTreeMap;

use sqlx::{QueryBuilder, SqlitePool};

use crate::{Result, models::SkillRow};

#[derive(Clone, Debug, PartialEq)]
pub struct GatedCandidate {
	pub resume_id: String,
	pub matched_skills: Vec<String>,
	pub matched_count: usize,
	pub avg_confidence: f32,
}

/// Resumes whose ledger intersects `skills` in at least `threshold`
/// entries, sorted `(matched_count desc, avg_confidence desc, resume_id
/// asc)`.
///
/// `threshold == 0` disables gating and admits the whole corpus (the
/// agentic weak-match fallback); an empty skill list with a positive
/// threshold matches nothing.
pub async fn gate(
	pool: &SqlitePool,
	skills: &[String],
	threshold: usize,
) -> Result<Vec<GatedCandidate>> {
	if threshold == 0 {
		return all_resumes(pool).await;
	}
	if skills.is_empty() {
		return Ok(Vec::new());
	}

	let mut builder = QueryBuilder::new(
		"SELECT resume_id, skill_canonical, confidence, evidence_count, evidence_sources \
		 FROM resume_skills WHERE skill_canonical IN (",
	);
	{
		let mut separated = builder.separated(", ");
		for skill in skills {
			separated.push_bind(skill);
		}
	}
	builder.push(") ORDER BY resume_id ASC, skill_canonical ASC");

	let rows: Vec<SkillRow> = builder.build_query_as().fetch_all(pool).await?;

	let mut per_resume: BTreeMap<String, Vec<SkillRow>> = BTreeMap::new();
	for row in rows {
		per_resume.entry(row.resume_id.clone()).or_default().push(row);
	}

	let mut candidates: Vec<GatedCandidate> = per_resume
		.into_iter()
		.filter(|(_, rows)| rows.len() >= threshold)
		.map(|(resume_id, rows)| {
			let matched_count = rows.len();
			let avg_confidence =
				rows.iter().map(|row| row.confidence).sum::<f32>() / matched_count as f32;
			let matched_skills = rows.into_iter().map(|row| row.skill_canonical).collect();
			GatedCandidate { resume_id, matched_skills, matched_count, avg_confidence }
		})
		.collect();

	candidates.sort_by(|a, b| {
		b.matched_count
			.cmp(&a.matched_count)
			.then_with(|| {
				b.avg_confidence.partial_cmp(&a.avg_confidence).unwrap_or(std::cmp::Ordering::Equal)
			})
			.then_with(|| a.resume_id.cmp(&b.resume_id))
	});

	Ok(candidates)
}

async fn all_resumes(pool: &SqlitePool) -> Result<Vec<GatedCandidate>> {
	let resume_ids: Vec<String> =
		sqlx::query_scalar("SELECT resume_id FROM resumes_core ORDER BY resume_id ASC")
			.fetch_all(pool)
			.await?;

	Ok(resume_ids
		.into_iter()
		.map(|resume_id| GatedCandidate {
			resume_id,
			matched_skills: Vec::new(),
			matched_count: 0,
			avg_confidence: 0.0,
		})
		.collect())
}

/// Gating threshold for the two classic query modes.
pub fn threshold_for_mode(mode: GateMode, query_skill_count: usize) -> usize {
	match mode {
		GateMode::MatchAll => query_skill_count,
		GateMode::MatchAtLeast(n) => n.max(1).min(query_skill_count),
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateMode {
	MatchAll,
	MatchAtLeast(usize),
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn match_all_requires_every_skill() {
		assert_eq!(threshold_for_mode(GateMode::MatchAll, 3), 3);
	}

	#[test]
	fn match_at_least_is_floored_and_capped() {
		assert_eq!(threshold_for_mode(GateMode::MatchAtLeast(0), 3), 1);
		assert_eq!(threshold_for_mode(GateMode::MatchAtLeast(2), 3), 2);
		assert_eq!(threshold_for_mode(GateMode::MatchAtLeast(5), 3), 3);
	}
}
