use std::sync::{Arc, atomic::AtomicUsize};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use sift_service::{
	MatchQuality, PipelineEvent, Providers, ShortlistRequest, SiftService, Stage,
};

use super::{
	FailingExtractor, KeywordEmbedding, SpyExtractor, StubRerank, build_service,
	resume_doc, seed, test_config,
};

fn shortlist_request(query: &str) -> ShortlistRequest {
	ShortlistRequest { query_text: query.to_string(), filters: None, limit: None }
}

fn providers_with_extractor(payload: serde_json::Value) -> Providers {
	Providers::new(
		Arc::new(KeywordEmbedding),
		Arc::new(StubRerank),
		Arc::new(SpyExtractor { calls: Arc::new(AtomicUsize::new(0)), payload }),
	)
}

async fn run_pipeline(service: &SiftService, req: ShortlistRequest) -> Vec<PipelineEvent> {
	let (tx, mut rx) = mpsc::channel(64);
	let cancel = CancellationToken::new();
	service.shortlist(req, tx, cancel).await;

	let mut events = Vec::new();
	while let Some(event) = rx.recv().await {
		events.push(event);
	}
	events
}

fn event_names(events: &[PipelineEvent]) -> Vec<&'static str> {
	events.iter().map(|event| event.name()).collect()
}

fn stage_order(events: &[PipelineEvent]) -> Vec<Stage> {
	events
		.iter()
		.filter_map(|event| match event {
			PipelineEvent::StageComplete { stage, .. } => Some(*stage),
			_ => None,
		})
		.collect()
}

fn final_data(events: &[PipelineEvent]) -> &sift_service::ShortlistData {
	events
		.iter()
		.find_map(|event| match event {
			PipelineEvent::Result { data, .. } => Some(data.as_ref()),
			_ => None,
		})
		.expect("pipeline emitted no result")
}

#[tokio::test]
async fn full_pipeline_emits_ordered_stages_and_a_strong_result() {
	let mut cfg = test_config();
	cfg.search.min_strong_matches = 1;
	let service = build_service(
		cfg,
		providers_with_extractor(serde_json::json!({
			"must_have": ["Python"],
			"nice_to_have": ["Kubernetes"],
		})),
	)
	.await;
	seed(
		&service,
		&[
			resume_doc("resume-a", "Python and Kubernetes services.", "Germany", &["Python", "K8s"]),
			resume_doc("resume-b", "Python scripting.", "Germany", &["Python"]),
		],
	)
	.await;

	let events = run_pipeline(&service, shortlist_request("Python engineer with Kubernetes")).await;
	let names = event_names(&events);

	assert_eq!(names.first(), Some(&"agent_start"));
	assert_eq!(names.last(), Some(&"done"));
	assert!(!names.contains(&"error"));

	// All six stages complete, in pipeline order.
	assert_eq!(
		stage_order(&events),
		vec![
			Stage::JdUnderstanding,
			Stage::Retrieval,
			Stage::Fusion,
			Stage::EvidenceBuilding,
			Stage::Ranking,
			Stage::Assembly,
		]
	);

	// The mission spec precedes the first stage boundary.
	let mission_idx = names.iter().position(|n| *n == "mission_spec").expect("mission_spec");
	let first_stage_idx = names.iter().position(|n| *n == "stage_complete").expect("stage");
	assert!(mission_idx < first_stage_idx);

	// The result arrives after every stage, right before done.
	let result_idx = names.iter().position(|n| *n == "result").expect("result");
	assert!(names[..result_idx].iter().filter(|n| **n == "stage_complete").count() == 6);

	let data = final_data(&events);
	assert_eq!(data.match_quality, MatchQuality::Strong);
	assert_eq!(data.mission_spec.must_have, vec!["python"]);
	assert!(!data.results.is_empty());
	assert_eq!(data.results[0].resume_id, "resume-a");
	assert_eq!(data.stage_timings.len(), 6);
}

#[tokio::test]
async fn stage_complete_follows_its_tool_events() {
	let mut cfg = test_config();
	cfg.search.min_strong_matches = 1;
	let service =
		build_service(cfg, providers_with_extractor(serde_json::json!({ "must_have": ["Python"] })))
			.await;
	seed(&service, &[resume_doc("resume-a", "Python.", "Germany", &["Python"])]).await;

	let events = run_pipeline(&service, shortlist_request("Python")).await;

	let retrieval_complete = events
		.iter()
		.position(|event| {
			matches!(event, PipelineEvent::StageComplete { stage: Stage::Retrieval, .. })
		})
		.expect("retrieval completes");
	for (idx, event) in events.iter().enumerate() {
		if let PipelineEvent::ToolResult { tool, .. } = event {
			if *tool == "lexical_search_chunks" || *tool == "vector_search_chunks" {
				assert!(idx < retrieval_complete, "{tool} result after stage_complete");
			}
		}
	}
}

#[tokio::test]
async fn unmatchable_query_falls_back_and_still_finishes() {
	let service = build_service(
		test_config(),
		providers_with_extractor(serde_json::json!({
			"must_have": ["cobol", "helm"],
		})),
	)
	.await;
	seed(
		&service,
		&[
			resume_doc("resume-a", "Python services.", "Germany", &["Python"]),
			resume_doc("resume-b", "Go services.", "Germany", &["Go"]),
		],
	)
	.await;

	let events =
		run_pipeline(&service, shortlist_request("Senior COBOL on mainframes with Helm")).await;
	let names = event_names(&events);

	assert_eq!(names.last(), Some(&"done"));
	assert!(!names.contains(&"error"));
	assert_eq!(stage_order(&events).len(), 6, "fallback must not skip stages");

	let data = final_data(&events);
	assert!(matches!(data.match_quality, MatchQuality::Weak | MatchQuality::None));
	if data.match_quality == MatchQuality::None {
		assert!(data.results.is_empty());
	}
}

#[tokio::test]
async fn empty_corpus_yields_match_quality_none() {
	let service = build_service(
		test_config(),
		providers_with_extractor(serde_json::json!({ "must_have": ["cobol"] })),
	)
	.await;

	let events = run_pipeline(&service, shortlist_request("COBOL expert")).await;
	let data = final_data(&events);
	assert_eq!(data.match_quality, MatchQuality::None);
	assert!(data.results.is_empty());
	assert_eq!(data.total_candidates_found, 0);
}

#[tokio::test]
async fn extractor_outage_degrades_to_keyword_parsing() {
	let mut cfg = test_config();
	cfg.search.min_strong_matches = 1;
	let service = build_service(
		cfg,
		Providers::new(Arc::new(KeywordEmbedding), Arc::new(StubRerank), Arc::new(FailingExtractor)),
	)
	.await;
	seed(&service, &[resume_doc("resume-a", "Python.", "Germany", &["Python"])]).await;

	let events =
		run_pipeline(&service, shortlist_request("Senior Python developer, 5+ years")).await;
	let names = event_names(&events);
	assert_eq!(names.last(), Some(&"done"));
	assert!(!names.contains(&"error"));

	let mission = events
		.iter()
		.find_map(|event| match event {
			PipelineEvent::MissionSpec { data, .. } => Some(data),
			_ => None,
		})
		.expect("mission spec event");
	assert!(mission.must_have.contains(&"python".to_string()));
	assert_eq!(mission.min_years, Some(5));
	assert!(!mission.clarifications.is_empty());
}

#[tokio::test]
async fn request_filters_narrow_the_shortlist() {
	let mut cfg = test_config();
	cfg.search.min_strong_matches = 1;
	let service =
		build_service(cfg, providers_with_extractor(serde_json::json!({ "must_have": ["Python"] })))
			.await;
	seed(
		&service,
		&[
			resume_doc("resume-a", "Python.", "Germany", &["Python"]),
			resume_doc("resume-b", "Python.", "France", &["Python"]),
		],
	)
	.await;

	let req = ShortlistRequest {
		query_text: "Python engineer".to_string(),
		filters: Some(sift_service::ShortlistFilters {
			min_yoe: None,
			location_country: Some("France".to_string()),
		}),
		limit: None,
	};
	let events = run_pipeline(&service, req).await;
	let data = final_data(&events);

	assert_eq!(data.results.len(), 1);
	assert_eq!(data.results[0].resume_id, "resume-b");
}
