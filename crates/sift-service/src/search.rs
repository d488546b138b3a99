//! Classic query orchestrator: an explicit skill list in, a ranked
//! shortlist with evidence out. State-free; everything a query needs
//! travels on the stack.

use std::{
	collections::HashMap,
	time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use sift_domain::{headline::headline_from_experience, scoring, skills};
use sift_storage::{chunks, ledger, ledger::GateMode, resumes};

use crate::{
	ServiceError, ServiceResult, SiftService,
	fusion::{self, EvidenceItem},
};

const RERANK_DOC_MAX_CHARS: usize = 2_000;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchRequest {
	pub skills: Vec<String>,
	#[serde(default)]
	pub mode: MatchMode,
	pub min_match: Option<u32>,
	pub min_yoe: Option<i64>,
	pub location_country: Option<String>,
	pub limit: Option<u32>,
	pub enable_rerank: Option<bool>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
	#[default]
	MatchAll,
	MatchAtLeast,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CandidateOut {
	pub resume_id: String,
	pub headline: Option<String>,
	pub summary: String,
	pub total_yoe: i64,
	pub location_country: String,
	pub location_city: String,
	pub matched_skills: Vec<String>,
	pub matched_count: usize,
	pub avg_confidence: f32,
	pub coverage_ratio: f32,
	pub skill_score: f32,
	pub semantic_score: f32,
	pub rrf_score: f32,
	pub final_score: f32,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub rerank_score: Option<f32>,
	pub evidence: Vec<EvidenceOut>,
}

pub type EvidenceOut = EvidenceItem;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HybridStats {
	pub lexical_hits: usize,
	pub vector_hits: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchMeta {
	pub query: Vec<String>,
	pub total_candidates: usize,
	pub results_returned: usize,
	pub latency_ms: u64,
	pub hybrid_stats: HybridStats,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchResponse {
	pub results: Vec<CandidateOut>,
	pub meta: SearchMeta,
}

/// Scoring inputs shared by both orchestrators: what the gate matched,
/// what fusion scored, and the evidence packs.
pub(crate) struct RankingInputs<'a> {
	pub gated: &'a [ledger::GatedCandidate],
	pub candidate_ids: &'a [String],
	pub fused: &'a [fusion::FusedCandidate],
	pub evidence: &'a HashMap<String, Vec<EvidenceItem>>,
	pub total_query_skills: usize,
}

impl SiftService {
	pub async fn search(&self, req: SearchRequest) -> ServiceResult<SearchResponse> {
		let started = Instant::now();

		// 1. Normalize. An empty canonical set is a caller error.
		let query_skills = skills::normalize_list(&req.skills);
		if query_skills.is_empty() {
			return Err(ServiceError::InvalidQuery {
				message: "At least one non-empty skill is required.".to_string(),
			});
		}

		let mode = match req.mode {
			MatchMode::MatchAll => GateMode::MatchAll,
			MatchMode::MatchAtLeast => {
				GateMode::MatchAtLeast(req.min_match.unwrap_or(1) as usize)
			},
		};
		let threshold = ledger::threshold_for_mode(mode, query_skills.len());

		// 2. Gate on the skill ledger.
		let gated = ledger::gate(&self.db.pool, &query_skills, threshold).await?;
		if gated.is_empty() {
			return Ok(self.empty_response(query_skills, 0, started));
		}

		// 3. Core-profile predicates.
		let gated_ids: Vec<String> = gated.iter().map(|c| c.resume_id.clone()).collect();
		let candidate_ids = resumes::filter_candidates(
			&self.db.pool,
			&gated_ids,
			req.min_yoe,
			req.location_country.as_deref(),
		)
		.await?;
		if candidate_ids.is_empty() {
			return Ok(self.empty_response(query_skills, gated.len(), started));
		}

		// 4. Hybrid retrieval over the gated pool, legs in parallel.
		let pool = chunks::chunks_for(&self.db.pool, Some(&candidate_ids)).await?;
		let lexical_query = query_skills.join(", ");
		let dense_query = format!("Skills: {}.", query_skills.join("; "));
		let hybrid = self.run_hybrid(&pool, &lexical_query, &dense_query).await;
		debug!(
			lexical_hits = hybrid.sparse.len(),
			vector_hits = hybrid.dense.len(),
			candidates = candidate_ids.len(),
			"Hybrid retrieval complete."
		);

		// 5. Fuse, collect evidence, score.
		let rrf_k = self.cfg.search.rrf_k;
		let fused = fusion::fuse(&hybrid.dense, &hybrid.sparse, rrf_k);
		let evidence = fusion::collect_evidence(&hybrid.dense, &hybrid.sparse, rrf_k);
		let mut ranked = rank_candidates(RankingInputs {
			gated: &gated,
			candidate_ids: &candidate_ids,
			fused: &fused,
			evidence: &evidence,
			total_query_skills: query_skills.len(),
		});

		let limit = req.limit.unwrap_or(self.cfg.search.default_limit).max(1) as usize;

		// 6. Optional cross-encoder pass over an expanded pool.
		if req.enable_rerank.unwrap_or(false) {
			let pool_size =
				(limit * 2).min(self.cfg.search.rerank_pool_cap as usize).min(ranked.len());
			self.rerank_candidates(&mut ranked, pool_size, &lexical_query).await;
		}
		ranked.truncate(limit);

		// 7. Join with resume cores for display fields.
		let results = self.enrich_candidates(ranked).await?;

		let meta = SearchMeta {
			query: query_skills,
			total_candidates: gated.len(),
			results_returned: results.len(),
			latency_ms: started.elapsed().as_millis() as u64,
			hybrid_stats: HybridStats {
				lexical_hits: hybrid.sparse.len(),
				vector_hits: hybrid.dense.len(),
			},
		};
		Ok(SearchResponse { results, meta })
	}

	fn empty_response(
		&self,
		query: Vec<String>,
		total_candidates: usize,
		started: Instant,
	) -> SearchResponse {
		SearchResponse {
			results: Vec::new(),
			meta: SearchMeta {
				query,
				total_candidates,
				results_returned: 0,
				latency_ms: started.elapsed().as_millis() as u64,
				hybrid_stats: HybridStats { lexical_hits: 0, vector_hits: 0 },
			},
		}
	}

	/// Rerank the first `pool_size` candidates by cross-encoder score.
	/// Any failure keeps the fused order; reranking is best-effort.
	pub(crate) async fn rerank_candidates(
		&self,
		ranked: &mut Vec<ScoredCandidate>,
		pool_size: usize,
		query: &str,
	) {
		if pool_size == 0 {
			return;
		}

		let docs: Vec<String> =
			ranked[..pool_size].iter().map(|candidate| candidate.rerank_document()).collect();
		let deadline = Duration::from_millis(self.cfg.search.rerank_timeout_ms);
		let scores = match tokio::time::timeout(
			deadline,
			self.providers.rerank.rerank(&self.cfg.providers.rerank, query, &docs, docs.len()),
		)
		.await
		{
			Ok(Ok(scores)) if scores.len() == docs.len() => scores,
			Ok(Ok(_)) => {
				warn!("Rerank provider returned a mismatched score count; keeping fused order.");
				return;
			},
			Ok(Err(err)) => {
				warn!(error = %err, "Rerank failed; keeping fused order.");
				return;
			},
			Err(_) => {
				warn!("Rerank timed out; keeping fused order.");
				return;
			},
		};

		for (candidate, score) in ranked[..pool_size].iter_mut().zip(scores) {
			candidate.rerank_score = Some(score);
		}
		ranked[..pool_size].sort_by(|a, b| {
			b.rerank_score
				.partial_cmp(&a.rerank_score)
				.unwrap_or(std::cmp::Ordering::Equal)
				.then_with(|| {
					b.score.final_score
						.partial_cmp(&a.score.final_score)
						.unwrap_or(std::cmp::Ordering::Equal)
				})
				.then_with(|| a.resume_id.cmp(&b.resume_id))
		});
	}

	pub(crate) async fn enrich_candidates(
		&self,
		ranked: Vec<ScoredCandidate>,
	) -> ServiceResult<Vec<CandidateOut>> {
		let ids: Vec<String> = ranked.iter().map(|c| c.resume_id.clone()).collect();
		let cores = resumes::fetch_cores(&self.db.pool, &ids).await?;
		let core_by_id: HashMap<&str, &sift_storage::models::ResumeCoreRow> =
			cores.iter().map(|core| (core.resume_id.as_str(), core)).collect();

		Ok(ranked
			.into_iter()
			.map(|candidate| {
				let core = core_by_id.get(candidate.resume_id.as_str());
				CandidateOut {
					headline: core
						.and_then(|core| headline_from_experience(&core.experience_json())),
					summary: core.map(|core| core.summary.clone()).unwrap_or_default(),
					total_yoe: core.map(|core| core.total_yoe).unwrap_or_default(),
					location_country: core
						.map(|core| core.location_country.clone())
						.unwrap_or_default(),
					location_city: core
						.map(|core| core.location_city.clone())
						.unwrap_or_default(),
					resume_id: candidate.resume_id,
					matched_skills: candidate.matched_skills,
					matched_count: candidate.matched_count,
					avg_confidence: scoring::round2(candidate.avg_confidence),
					coverage_ratio: candidate.score.coverage_ratio,
					skill_score: candidate.score.skill_score,
					semantic_score: candidate.score.semantic_score,
					rrf_score: candidate.score.rrf_score,
					final_score: candidate.score.final_score,
					rerank_score: candidate.rerank_score.map(scoring::round4),
					evidence: candidate.evidence,
				}
			})
			.collect())
	}
}

#[derive(Clone, Debug)]
pub(crate) struct ScoredCandidate {
	pub resume_id: String,
	pub matched_skills: Vec<String>,
	pub matched_count: usize,
	pub avg_confidence: f32,
	pub score: scoring::ScoreBreakdown,
	pub rerank_score: Option<f32>,
	pub evidence: Vec<EvidenceItem>,
}

impl ScoredCandidate {
	/// Concatenated evidence snippets, bounded, for the cross-encoder.
	pub(crate) fn rerank_document(&self) -> String {
		let joined = self
			.evidence
			.iter()
			.map(|item| item.chunk_text.as_str())
			.collect::<Vec<_>>()
			.join(" | ");
		if joined.is_empty() {
			return format!("Skills: {}", self.matched_skills.join(", "));
		}
		if joined.chars().count() > RERANK_DOC_MAX_CHARS {
			joined.chars().take(RERANK_DOC_MAX_CHARS).collect()
		} else {
			joined
		}
	}
}

/// Score every surviving candidate: coverage from the gate, semantics
/// from fusion. Candidates retrieval never surfaced still rank on
/// coverage alone, which is also the degraded path when both legs come
/// back empty.
pub(crate) fn rank_candidates(inputs: RankingInputs<'_>) -> Vec<ScoredCandidate> {
	let fused_by_id: HashMap<&str, &fusion::FusedCandidate> =
		inputs.fused.iter().map(|fused| (fused.resume_id.as_str(), fused)).collect();
	let gated_by_id: HashMap<&str, &ledger::GatedCandidate> =
		inputs.gated.iter().map(|gated| (gated.resume_id.as_str(), gated)).collect();

	let mut ranked: Vec<ScoredCandidate> = inputs
		.candidate_ids
		.iter()
		.map(|resume_id| {
			let gated = gated_by_id.get(resume_id.as_str());
			let rrf_score =
				fused_by_id.get(resume_id.as_str()).map(|fused| fused.rrf_score).unwrap_or(0.0);
			let matched_skills =
				gated.map(|gated| gated.matched_skills.clone()).unwrap_or_default();
			let matched_count = gated.map(|gated| gated.matched_count).unwrap_or(0);
			let avg_confidence = gated.map(|gated| gated.avg_confidence).unwrap_or(0.0);

			ScoredCandidate {
				score: scoring::score_candidate(
					matched_count,
					inputs.total_query_skills,
					rrf_score,
				),
				evidence: inputs.evidence.get(resume_id).cloned().unwrap_or_default(),
				resume_id: resume_id.clone(),
				matched_skills,
				matched_count,
				avg_confidence,
				rerank_score: None,
			}
		})
		.collect();

	ranked.sort_by(|a, b| {
		b.score
			.final_score
			.partial_cmp(&a.score.final_score)
			.unwrap_or(std::cmp::Ordering::Equal)
			.then_with(|| a.resume_id.cmp(&b.resume_id))
	});
	ranked
}
