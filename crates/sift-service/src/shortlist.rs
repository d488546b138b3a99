//! Agentic pipeline for free-text queries: a straight-line reducer over
//! six stages, each an atomic unit that reports its elapsed time before
//! the next one starts. Consumers watch the run through the event
//! channel; a dropped receiver or a fired cancellation token stops stage
//! work and event emission immediately.

use std::{
	collections::BTreeMap,
	future::Future,
	time::{Duration, Instant},
};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use sift_domain::skills;
use sift_storage::{chunks, ledger, resumes};

use crate::{
	ServiceError, SiftService,
	events::{EventSink, PipelineEvent, Stage, timestamp},
	fusion,
	retrieval::HybridOutcome,
	search::{CandidateOut, RankingInputs, ScoredCandidate, rank_candidates},
};

const SHORTLIST_DEFAULT_LIMIT: usize = 20;
const SHORTLIST_MAX_LIMIT: usize = 50;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShortlistRequest {
	pub query_text: String,
	#[serde(default)]
	pub filters: Option<ShortlistFilters>,
	pub limit: Option<u32>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ShortlistFilters {
	pub min_yoe: Option<i64>,
	pub location_country: Option<String>,
}

/// Structured interpretation of a free-text query. Skill lists are
/// canonical by the time a spec leaves the first stage.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MissionSpec {
	#[serde(default)]
	pub must_have: Vec<String>,
	#[serde(default)]
	pub nice_to_have: Vec<String>,
	#[serde(default)]
	pub negative_constraints: Vec<String>,
	#[serde(default)]
	pub min_years: Option<u32>,
	#[serde(default)]
	pub location: Option<String>,
	#[serde(default)]
	pub core_domain: Option<String>,
	#[serde(default)]
	pub clarifications: Vec<String>,
	#[serde(default)]
	pub raw_query: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchQuality {
	Strong,
	Weak,
	None,
}

#[derive(Clone, Debug, Serialize)]
pub struct ShortlistData {
	pub results: Vec<CandidateOut>,
	pub total_candidates_found: usize,
	pub match_quality: MatchQuality,
	pub mission_spec: MissionSpec,
	pub stage_timings: BTreeMap<String, u64>,
}

enum PipelineAbort {
	Cancelled,
	Failed(ServiceError),
}

impl From<ServiceError> for PipelineAbort {
	fn from(err: ServiceError) -> Self {
		Self::Failed(err)
	}
}

impl From<sift_storage::Error> for PipelineAbort {
	fn from(err: sift_storage::Error) -> Self {
		Self::Failed(err.into())
	}
}

type StageResult<T> = Result<T, PipelineAbort>;

impl SiftService {
	/// Run the agentic pipeline to completion, streaming events into
	/// `tx`. The stream always terminates with `done` unless the
	/// consumer went away first; a pipeline failure emits `error` then
	/// `done`. The hard per-query deadline comes from configuration.
	pub async fn shortlist(
		&self,
		req: ShortlistRequest,
		tx: mpsc::Sender<PipelineEvent>,
		cancel: CancellationToken,
	) {
		let sink = EventSink::new(tx, cancel);
		let deadline = Duration::from_millis(self.cfg.search.pipeline_timeout_ms);
		let run = PipelineRun { service: self, sink: sink.clone() };

		match tokio::time::timeout(deadline, run.execute(&req)).await {
			Ok(Ok(data)) => {
				sink.emit(PipelineEvent::Result { timestamp: timestamp(), data: Box::new(data) })
					.await;
				sink.emit(PipelineEvent::Done { timestamp: timestamp() }).await;
			},
			Ok(Err(PipelineAbort::Cancelled)) => {},
			Ok(Err(PipelineAbort::Failed(err))) => {
				warn!(error = %err, "Shortlist pipeline failed.");
				sink.emit(PipelineEvent::Error {
					timestamp: timestamp(),
					message: err.to_string(),
				})
				.await;
				sink.emit(PipelineEvent::Done { timestamp: timestamp() }).await;
			},
			Err(_) => {
				sink.emit(PipelineEvent::Error {
					timestamp: timestamp(),
					message: "Pipeline deadline exceeded.".to_string(),
				})
				.await;
				sink.emit(PipelineEvent::Done { timestamp: timestamp() }).await;
			},
		}
	}
}

struct PipelineRun<'a> {
	service: &'a SiftService,
	sink: EventSink,
}

/// Everything the retrieval stage hands forward.
struct RetrievalOutput {
	gated: Vec<ledger::GatedCandidate>,
	candidate_ids: Vec<String>,
	hybrid: HybridOutcome,
}

impl PipelineRun<'_> {
	async fn execute(&self, req: &ShortlistRequest) -> StageResult<ShortlistData> {
		let mut timings: BTreeMap<String, u64> = BTreeMap::new();
		let limit = req
			.limit
			.map(|limit| limit as usize)
			.unwrap_or(SHORTLIST_DEFAULT_LIMIT)
			.clamp(1, SHORTLIST_MAX_LIMIT);

		// Stage 1: intent extraction.
		let stage_started = Instant::now();
		let mission = self.jd_understanding(&req.query_text).await?;
		self.complete_stage(Stage::JdUnderstanding, stage_started, &mut timings).await?;

		// Stage 2: gated hybrid retrieval.
		let stage_started = Instant::now();
		let threshold = gate_threshold(&mission.must_have);
		let retrieval = self.retrieve(&mission, req, threshold).await?;
		self.complete_stage(Stage::Retrieval, stage_started, &mut timings).await?;

		// Stage 3: reciprocal rank fusion.
		let stage_started = Instant::now();
		let rrf_k = self.service.cfg.search.rrf_k;
		let fused = fusion::fuse(&retrieval.hybrid.dense, &retrieval.hybrid.sparse, rrf_k);
		self.complete_stage(Stage::Fusion, stage_started, &mut timings).await?;

		// Stage 4: evidence packs.
		let stage_started = Instant::now();
		let evidence =
			fusion::collect_evidence(&retrieval.hybrid.dense, &retrieval.hybrid.sparse, rrf_k);
		self.complete_stage(Stage::EvidenceBuilding, stage_started, &mut timings).await?;

		// Stage 5: scoring + cross-encoder, with the weak-match fallback
		// resolved before the stage closes.
		let stage_started = Instant::now();
		let mut ranked = rank_candidates(RankingInputs {
			gated: &retrieval.gated,
			candidate_ids: &retrieval.candidate_ids,
			fused: &fused,
			evidence: &evidence,
			total_query_skills: mission.must_have.len(),
		});
		self.rerank(&mut ranked, &mission).await?;

		let floor = self.service.cfg.search.min_relevance_score;
		let strong_count =
			ranked.iter().filter(|candidate| candidate.score.final_score > floor).count();
		let match_quality = if strong_count >= self.service.cfg.search.min_strong_matches as usize
		{
			MatchQuality::Strong
		} else {
			self.emit(PipelineEvent::AgentThought {
				timestamp: timestamp(),
				agent: "ranker",
				message: format!(
					"Only {strong_count} candidates above the relevance floor; widening the \
					 search without the skill gate."
				),
			})
			.await?;
			match self.weak_fallback(&mission, req).await? {
				Some(fallback_ranked) => {
					ranked = fallback_ranked;
					MatchQuality::Weak
				},
				None => {
					ranked = Vec::new();
					MatchQuality::None
				},
			}
		};
		self.complete_stage(Stage::Ranking, stage_started, &mut timings).await?;

		// Stage 6: assembly.
		let stage_started = Instant::now();
		let total_candidates_found = ranked.len();
		ranked.truncate(limit);
		self.emit(PipelineEvent::ToolCall {
			timestamp: timestamp(),
			tool: "fetch_candidate_profiles",
			args: serde_json::json!({ "count": ranked.len() }),
		})
		.await?;
		let enrich_started = Instant::now();
		let results = self.guard(self.service.enrich_candidates(ranked)).await??;
		self.emit(PipelineEvent::ToolResult {
			timestamp: timestamp(),
			tool: "fetch_candidate_profiles",
			timing_ms: enrich_started.elapsed().as_millis() as u64,
			summary: format!("Enriched {} candidates with profile data.", results.len()),
		})
		.await?;
		self.complete_stage(Stage::Assembly, stage_started, &mut timings).await?;

		Ok(ShortlistData {
			results,
			total_candidates_found,
			match_quality,
			mission_spec: mission,
			stage_timings: timings,
		})
	}

	async fn jd_understanding(&self, query_text: &str) -> StageResult<MissionSpec> {
		self.emit(PipelineEvent::AgentStart {
			timestamp: timestamp(),
			agent: "jd_understanding",
		})
		.await?;
		self.emit(PipelineEvent::AgentThought {
			timestamp: timestamp(),
			agent: "jd_understanding",
			message: format!("Reading query: \"{}\"", preview(query_text, 100)),
		})
		.await?;

		let mission = if query_text.trim().is_empty() {
			MissionSpec {
				clarifications: vec!["The query was empty; nothing could be extracted.".to_string()],
				..MissionSpec::default()
			}
		} else {
			self.extract_mission_spec(query_text).await?
		};

		self.emit(PipelineEvent::MissionSpec { timestamp: timestamp(), data: mission.clone() })
			.await?;
		Ok(mission)
	}

	async fn extract_mission_spec(&self, query_text: &str) -> StageResult<MissionSpec> {
		let cfg = &self.service.cfg.providers.llm_extractor;
		let messages = extraction_messages(query_text);

		self.emit(PipelineEvent::ToolCall {
			timestamp: timestamp(),
			tool: "extract_mission_spec",
			args: serde_json::json!({ "model": cfg.model }),
		})
		.await?;

		let call_started = Instant::now();
		let extracted = self.guard(self.service.providers.extractor.extract(cfg, &messages)).await?;

		let mission = match extracted {
			Ok(value) => match parse_mission_spec(&value, query_text) {
				Some(mission) => mission,
				None => {
					warn!("Extractor output failed validation; using the keyword fallback.");
					fallback_mission_spec(query_text)
				},
			},
			Err(err) => {
				warn!(error = %err, "Intent extraction failed; using the keyword fallback.");
				fallback_mission_spec(query_text)
			},
		};

		self.emit(PipelineEvent::ToolResult {
			timestamp: timestamp(),
			tool: "extract_mission_spec",
			timing_ms: call_started.elapsed().as_millis() as u64,
			summary: format!(
				"Extracted {} must-have and {} nice-to-have skills.",
				mission.must_have.len(),
				mission.nice_to_have.len()
			),
		})
		.await?;
		Ok(mission)
	}

	async fn retrieve(
		&self,
		mission: &MissionSpec,
		req: &ShortlistRequest,
		threshold: usize,
	) -> StageResult<RetrievalOutput> {
		self.emit(PipelineEvent::ToolCall {
			timestamp: timestamp(),
			tool: "skills_gate",
			args: serde_json::json!({
				"skills": mission.must_have,
				"threshold": threshold,
			}),
		})
		.await?;
		let gate_started = Instant::now();
		let gated =
			self.guard(ledger::gate(&self.service.db.pool, &mission.must_have, threshold)).await??;
		self.emit(PipelineEvent::ToolResult {
			timestamp: timestamp(),
			tool: "skills_gate",
			timing_ms: gate_started.elapsed().as_millis() as u64,
			summary: format!("{} candidates passed the skill gate.", gated.len()),
		})
		.await?;

		let filters = req.filters.clone().unwrap_or_default();
		let min_yoe = filters.min_yoe.or(mission.min_years.map(i64::from));
		let gated_ids: Vec<String> = gated.iter().map(|c| c.resume_id.clone()).collect();
		let candidate_ids = self
			.guard(resumes::filter_candidates(
				&self.service.db.pool,
				&gated_ids,
				min_yoe,
				filters.location_country.as_deref(),
			))
			.await??;

		let pool =
			self.guard(chunks::chunks_for(&self.service.db.pool, Some(&candidate_ids))).await??;

		let skills_query = skills_query_text(mission);
		let dense_query = if mission.raw_query.trim().is_empty() {
			skills_query.clone()
		} else {
			mission.raw_query.clone()
		};

		self.emit(PipelineEvent::ToolCall {
			timestamp: timestamp(),
			tool: "lexical_search_chunks",
			args: serde_json::json!({ "candidates": candidate_ids.len() }),
		})
		.await?;
		self.emit(PipelineEvent::ToolCall {
			timestamp: timestamp(),
			tool: "vector_search_chunks",
			args: serde_json::json!({ "candidates": candidate_ids.len() }),
		})
		.await?;
		let legs_started = Instant::now();
		let hybrid = self.guard(self.service.run_hybrid(&pool, &skills_query, &dense_query)).await?;
		let legs_ms = legs_started.elapsed().as_millis() as u64;
		self.emit(PipelineEvent::ToolResult {
			timestamp: timestamp(),
			tool: "lexical_search_chunks",
			timing_ms: legs_ms,
			summary: format!("Lexical search returned {} chunk hits.", hybrid.sparse.len()),
		})
		.await?;
		self.emit(PipelineEvent::ToolResult {
			timestamp: timestamp(),
			tool: "vector_search_chunks",
			timing_ms: legs_ms,
			summary: if hybrid.dense_degraded {
				"Vector search degraded; lexical results only.".to_string()
			} else {
				format!("Vector search returned {} chunk hits.", hybrid.dense.len())
			},
		})
		.await?;

		Ok(RetrievalOutput { gated, candidate_ids, hybrid })
	}

	async fn rerank(
		&self,
		ranked: &mut Vec<ScoredCandidate>,
		mission: &MissionSpec,
	) -> StageResult<()> {
		if ranked.is_empty() {
			return Ok(());
		}
		let pool_size = ranked.len().min(self.service.cfg.search.rerank_pool_cap as usize);
		let query = if mission.raw_query.trim().is_empty() {
			skills_query_text(mission)
		} else {
			mission.raw_query.clone()
		};

		self.emit(PipelineEvent::ToolCall {
			timestamp: timestamp(),
			tool: "cross_encoder_rerank",
			args: serde_json::json!({ "documents": pool_size }),
		})
		.await?;
		let call_started = Instant::now();
		self.guard(self.service.rerank_candidates(ranked, pool_size, &query)).await?;
		self.emit(PipelineEvent::ToolResult {
			timestamp: timestamp(),
			tool: "cross_encoder_rerank",
			timing_ms: call_started.elapsed().as_millis() as u64,
			summary: format!("Cross-encoder scored {pool_size} candidates."),
		})
		.await?;
		Ok(())
	}

	/// Ungated re-retrieval for queries the skill gate starved: the whole
	/// corpus (minus explicit filters) goes through the same legs, fusion,
	/// and reranking. Returns `None` when even that surfaces nothing.
	async fn weak_fallback(
		&self,
		mission: &MissionSpec,
		req: &ShortlistRequest,
	) -> StageResult<Option<Vec<ScoredCandidate>>> {
		let gated = self.guard(ledger::gate(&self.service.db.pool, &[], 0)).await??;
		let filters = req.filters.clone().unwrap_or_default();
		let gated_ids: Vec<String> = gated.iter().map(|c| c.resume_id.clone()).collect();
		let candidate_ids = self
			.guard(resumes::filter_candidates(
				&self.service.db.pool,
				&gated_ids,
				filters.min_yoe,
				filters.location_country.as_deref(),
			))
			.await??;
		let pool =
			self.guard(chunks::chunks_for(&self.service.db.pool, Some(&candidate_ids))).await??;

		let skills_query = skills_query_text(mission);
		let dense_query = if mission.raw_query.trim().is_empty() {
			skills_query.clone()
		} else {
			mission.raw_query.clone()
		};

		self.emit(PipelineEvent::ToolCall {
			timestamp: timestamp(),
			tool: "ungated_search_chunks",
			args: serde_json::json!({ "candidates": candidate_ids.len() }),
		})
		.await?;
		let legs_started = Instant::now();
		let hybrid = self.guard(self.service.run_hybrid(&pool, &skills_query, &dense_query)).await?;
		self.emit(PipelineEvent::ToolResult {
			timestamp: timestamp(),
			tool: "ungated_search_chunks",
			timing_ms: legs_started.elapsed().as_millis() as u64,
			summary: format!(
				"Ungated retrieval returned {} lexical and {} vector hits.",
				hybrid.sparse.len(),
				hybrid.dense.len()
			),
		})
		.await?;

		let rrf_k = self.service.cfg.search.rrf_k;
		let fused = fusion::fuse(&hybrid.dense, &hybrid.sparse, rrf_k);
		if fused.is_empty() {
			return Ok(None);
		}

		// Only resumes retrieval actually surfaced; coverage is zero by
		// construction with the gate emptied.
		let surfaced: Vec<String> = fused.iter().map(|f| f.resume_id.clone()).collect();
		let evidence = fusion::collect_evidence(&hybrid.dense, &hybrid.sparse, rrf_k);
		let mut ranked = rank_candidates(RankingInputs {
			gated: &gated,
			candidate_ids: &surfaced,
			fused: &fused,
			evidence: &evidence,
			total_query_skills: 0,
		});
		self.rerank(&mut ranked, mission).await?;
		Ok(Some(ranked))
	}

	async fn complete_stage(
		&self,
		stage: Stage,
		started: Instant,
		timings: &mut BTreeMap<String, u64>,
	) -> StageResult<()> {
		let timing_ms = started.elapsed().as_millis() as u64;
		timings.insert(stage.as_str().to_string(), timing_ms);
		self.emit(PipelineEvent::StageComplete { timestamp: timestamp(), stage, timing_ms }).await
	}

	async fn emit(&self, event: PipelineEvent) -> StageResult<()> {
		if self.sink.emit(event).await { Ok(()) } else { Err(PipelineAbort::Cancelled) }
	}

	/// Race a stage future against cancellation. Losing the race drops
	/// the future, which aborts any provider HTTP call it was driving.
	async fn guard<T>(&self, fut: impl Future<Output = T>) -> StageResult<T> {
		if self.sink.is_cancelled() {
			return Err(PipelineAbort::Cancelled);
		}
		tokio::select! {
			_ = self.sink.cancel_token().cancelled() => Err(PipelineAbort::Cancelled),
			value = fut => Ok(value),
		}
	}
}

/// `match_at_least = ceil(|must_have| / 2)` keeps long requirement lists
/// from starving the gate; an empty list disables gating outright.
fn gate_threshold(must_have: &[String]) -> usize {
	if must_have.is_empty() { 0 } else { must_have.len().div_ceil(2).max(1) }
}

fn skills_query_text(mission: &MissionSpec) -> String {
	let all: Vec<&str> = mission
		.must_have
		.iter()
		.chain(mission.nice_to_have.iter())
		.map(String::as_str)
		.collect();
	if all.is_empty() {
		mission.raw_query.clone()
	} else {
		format!("Skills: {}.", all.join("; "))
	}
}

const EXTRACTION_SYSTEM_PROMPT: &str = "You are a recruitment query analyst. Parse the \
recruiter's search query or job description into structured requirements.\n\
Extract:\n\
1. must_have: skills or qualifications explicitly required. Use short canonical names.\n\
2. nice_to_have: skills mentioned as preferred, bonus, or optional.\n\
3. negative_constraints: technologies, roles, or domains explicitly excluded.\n\
4. min_years: minimum years of experience as a bare integer, or null.\n\
5. location: preferred location, or null.\n\
6. core_domain: the role's primary domain (e.g. backend, data, mobile), or null.\n\
7. clarifications: short notes on anything ambiguous or missing.\n\
Rules: keep everything lowercase, extract actual skill names rather than descriptions, \
and respond with a single JSON object matching exactly this schema:\n\
{\"must_have\": [\"skill\"], \"nice_to_have\": [], \"negative_constraints\": [], \
\"min_years\": null, \"location\": null, \"core_domain\": null, \"clarifications\": []}";

fn extraction_messages(query_text: &str) -> Vec<serde_json::Value> {
	vec![
		serde_json::json!({ "role": "system", "content": EXTRACTION_SYSTEM_PROMPT }),
		serde_json::json!({
			"role": "user",
			"content": format!("Parse this recruitment query:\n\n{query_text}"),
		}),
	]
}

/// Validate the extractor's JSON into a MissionSpec. Missing fields
/// default to empty; `min_years` accepts integers only. Returns `None`
/// when the value is not an object at all.
fn parse_mission_spec(value: &serde_json::Value, raw_query: &str) -> Option<MissionSpec> {
	if !value.is_object() {
		return None;
	}

	let string_list = |key: &str| -> Vec<String> {
		value
			.get(key)
			.and_then(|v| v.as_array())
			.map(|items| {
				items
					.iter()
					.filter_map(|item| item.as_str())
					.map(str::to_string)
					.collect::<Vec<_>>()
			})
			.unwrap_or_default()
	};
	let string_field = |key: &str| -> Option<String> {
		value
			.get(key)
			.and_then(|v| v.as_str())
			.map(str::trim)
			.filter(|s| !s.is_empty())
			.map(str::to_string)
	};

	Some(MissionSpec {
		must_have: skills::normalize_list(&string_list("must_have")),
		nice_to_have: skills::normalize_list(&string_list("nice_to_have")),
		negative_constraints: skills::normalize_list(&string_list("negative_constraints")),
		min_years: value.get("min_years").and_then(|v| v.as_u64()).map(|v| v as u32),
		location: string_field("location"),
		core_domain: string_field("core_domain"),
		clarifications: string_list("clarifications"),
		raw_query: raw_query.to_string(),
	})
}

static YEARS_PATTERN: Lazy<Regex> =
	Lazy::new(|| Regex::new(r"(?i)(\d+)\+?\s*(?:years?|yrs?|yoe)").expect("static pattern"));
static STOP_WORDS: Lazy<Regex> = Lazy::new(|| {
	Regex::new(
		r"(?i)\b(with|and|or|experience|in|of|the|a|an|for|to|is|are|we|need|looking|senior|junior|mid|level|developer|engineer|specialist)\b",
	)
	.expect("static pattern")
});

/// Deterministic degradation when the extractor is unreachable or keeps
/// returning junk: every query fragment becomes a must-have skill.
fn fallback_mission_spec(query_text: &str) -> MissionSpec {
	let min_years = YEARS_PATTERN
		.captures(query_text)
		.and_then(|captures| captures.get(1))
		.and_then(|m| m.as_str().parse().ok());

	let mut raw_skills = Vec::new();
	for token in query_text.split(['\n', ',', ';', '.']) {
		let cleaned = STOP_WORDS.replace_all(token, " ");
		let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
		let char_count = cleaned.chars().count();
		if char_count > 1 && char_count < 50 {
			raw_skills.push(cleaned);
		}
	}

	MissionSpec {
		must_have: skills::normalize_list(&raw_skills),
		min_years,
		clarifications: vec![
			"The query was parsed with keyword extraction; provide a more detailed description \
			 for better results."
				.to_string(),
		],
		raw_query: query_text.to_string(),
		..MissionSpec::default()
	}
}

fn preview(text: &str, max_chars: usize) -> String {
	if text.chars().count() <= max_chars {
		return text.to_string();
	}
	let truncated: String = text.chars().take(max_chars).collect();
	format!("{truncated}...")
}
