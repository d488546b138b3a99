//! Final score composition: a coverage half and a semantic half, each
//! capped at 50 so the sum stays within [0, 100].

use serde::{Deserialize, Serialize};

const SKILL_SCORE_CAP: f32 = 50.0;
const SEMANTIC_SCORE_CAP: f32 = 50.0;
const RRF_SCALE: f32 = 1_500.0;

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ScoreBreakdown {
	pub coverage_ratio: f32,
	pub skill_score: f32,
	pub semantic_score: f32,
	pub rrf_score: f32,
	pub final_score: f32,
}

/// Blend coverage and fused-rank signals into a bounded score.
///
/// `total_query_skills == 0` yields zero coverage rather than a division
/// error; the orchestrators reject empty skill sets before getting here,
/// but the ungated agentic fallback legitimately passes zero.
pub fn score_candidate(
	matched_count: usize,
	total_query_skills: usize,
	rrf_score: f32,
) -> ScoreBreakdown {
	let coverage_ratio = if total_query_skills == 0 {
		0.0
	} else {
		(matched_count.min(total_query_skills) as f32) / (total_query_skills as f32)
	};
	let skill_score = (coverage_ratio * SKILL_SCORE_CAP).clamp(0.0, SKILL_SCORE_CAP);
	let semantic_score = (rrf_score.max(0.0) * RRF_SCALE).min(SEMANTIC_SCORE_CAP);

	ScoreBreakdown {
		coverage_ratio: round2(coverage_ratio),
		skill_score: round1(skill_score),
		semantic_score: round1(semantic_score),
		rrf_score: round4(rrf_score),
		final_score: round1(skill_score + semantic_score),
	}
}

pub fn round1(value: f32) -> f32 {
	(value * 10.0).round() / 10.0
}

pub fn round2(value: f32) -> f32 {
	(value * 100.0).round() / 100.0
}

pub fn round4(value: f32) -> f32 {
	(value * 10_000.0).round() / 10_000.0
}
