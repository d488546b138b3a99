use std::sync::{Arc, atomic::AtomicUsize};

use sift_service::{MatchMode, SearchRequest, ServiceError};

use super::{
	FailingEmbedding, FailingRerank, KeywordEmbedding, NeedleRerank, SpyExtractor, StubRerank,
	build_service, default_test_providers, resume_doc, seed, service_with_pool, test_config,
};

fn request(skills: &[&str]) -> SearchRequest {
	SearchRequest {
		skills: skills.iter().map(|s| s.to_string()).collect(),
		mode: MatchMode::MatchAll,
		min_match: None,
		min_yoe: None,
		location_country: None,
		limit: None,
		enable_rerank: None,
	}
}

#[tokio::test]
async fn match_all_gate_resolves_aliases() {
	let service = build_service(test_config(), default_test_providers()).await;
	seed(
		&service,
		&[
			resume_doc("resume-a", "Builds ML systems in Python.", "Germany", &["Python", "ML"]),
			resume_doc("resume-b", "Python services.", "Germany", &["Python"]),
		],
	)
	.await;

	let response = service.search(request(&["Python", "ML"])).await.expect("search failed");

	assert_eq!(response.meta.query, vec!["python", "machine learning"]);
	assert_eq!(response.results.len(), 1);
	assert_eq!(response.results[0].resume_id, "resume-a");
	assert_eq!(response.results[0].matched_count, 2);
}

#[tokio::test]
async fn match_at_least_two_of_three() {
	let service = build_service(test_config(), default_test_providers()).await;
	seed(
		&service,
		&[resume_doc("resume-c", "Backend services in Go.", "France", &["Python", "Go"])],
	)
	.await;

	let mut req = request(&["python", "go", "rust"]);
	req.mode = MatchMode::MatchAtLeast;
	req.min_match = Some(2);
	let response = service.search(req).await.expect("search failed");

	assert_eq!(response.results.len(), 1);
	assert_eq!(response.results[0].resume_id, "resume-c");
	assert_eq!(response.results[0].matched_count, 2);
}

#[tokio::test]
async fn empty_skill_list_is_an_invalid_query() {
	let service = build_service(test_config(), default_test_providers()).await;

	let err = service.search(request(&["", "  ", "..."])).await.expect_err("expected an error");
	assert!(matches!(err, ServiceError::InvalidQuery { .. }));
}

#[tokio::test]
async fn unknown_skills_return_empty_with_full_meta() {
	let service = build_service(test_config(), default_test_providers()).await;
	seed(&service, &[resume_doc("resume-a", "Python.", "Germany", &["Python"])]).await;

	let response = service.search(request(&["cobol"])).await.expect("search failed");

	assert!(response.results.is_empty());
	assert_eq!(response.meta.total_candidates, 0);
	assert_eq!(response.meta.results_returned, 0);
	assert_eq!(response.meta.hybrid_stats.lexical_hits, 0);
	assert_eq!(response.meta.hybrid_stats.vector_hits, 0);
}

#[tokio::test]
async fn embedding_outage_degrades_to_coverage_only() {
	let service = build_service(test_config(), default_test_providers()).await;
	seed(
		&service,
		&[
			resume_doc("resume-a", "Python and Kubernetes.", "Germany", &["Python", "K8s"]),
			resume_doc("resume-b", "Python only.", "Germany", &["Python"]),
		],
	)
	.await;

	// Same data, embedding provider now unreachable.
	let degraded = service_with_pool(
		test_config(),
		service.db.pool.clone(),
		sift_service::Providers::new(
			Arc::new(FailingEmbedding),
			Arc::new(StubRerank),
			Arc::new(SpyExtractor {
				calls: Arc::new(AtomicUsize::new(0)),
				payload: serde_json::json!({}),
			}),
		),
	);

	let mut req = request(&["python", "kubernetes"]);
	req.mode = MatchMode::MatchAtLeast;
	req.min_match = Some(1);
	let response = degraded.search(req).await.expect("search must not fail on a dense outage");

	assert_eq!(response.meta.hybrid_stats.vector_hits, 0);
	assert_eq!(response.results.len(), 2);
	// Coverage still ranks resume-a (2/2) over resume-b (1/2).
	assert_eq!(response.results[0].resume_id, "resume-a");
	assert!(response.results[0].final_score >= response.results[1].final_score);
}

#[tokio::test]
async fn profile_filters_apply_between_gate_and_retrieval() {
	let service = build_service(test_config(), default_test_providers()).await;
	seed(
		&service,
		&[
			resume_doc("resume-a", "Python.", "Germany", &["Python"]),
			resume_doc("resume-b", "Python.", "France", &["Python"]),
		],
	)
	.await;

	let mut req = request(&["python"]);
	req.location_country = Some("germ".to_string());
	let response = service.search(req).await.expect("search failed");

	assert_eq!(response.results.len(), 1);
	assert_eq!(response.results[0].resume_id, "resume-a");
	assert_eq!(response.results[0].location_country, "Germany");

	let mut req = request(&["python"]);
	req.min_yoe = Some(10);
	let response = service.search(req).await.expect("search failed");
	assert!(response.results.is_empty());
	assert_eq!(response.meta.total_candidates, 2);
}

#[tokio::test]
async fn scores_stay_bounded_and_evidence_is_capped() {
	let service = build_service(test_config(), default_test_providers()).await;
	seed(
		&service,
		&[
			resume_doc(
				"resume-a",
				"Python, Kubernetes, and machine learning in production.",
				"Germany",
				&["Python", "K8s", "ML"],
			),
			resume_doc("resume-b", "Python work.", "Germany", &["Python"]),
		],
	)
	.await;

	let mut req = request(&["python", "kubernetes", "machine learning"]);
	req.mode = MatchMode::MatchAtLeast;
	req.min_match = Some(1);
	let response = service.search(req).await.expect("search failed");

	for candidate in &response.results {
		assert!((0.0..=100.0).contains(&candidate.final_score));
		assert!((0.0..=50.0).contains(&candidate.skill_score));
		assert!((0.0..=50.0).contains(&candidate.semantic_score));
		assert!(candidate.evidence.len() <= 3);

		let mut keys: Vec<(&str, i64)> = candidate
			.evidence
			.iter()
			.map(|item| (item.section_type.as_str(), item.section_ordinal))
			.collect();
		keys.sort();
		keys.dedup();
		assert_eq!(keys.len(), candidate.evidence.len(), "duplicate evidence section");
	}
}

#[tokio::test]
async fn ranking_is_deterministic_across_runs() {
	let service = build_service(test_config(), default_test_providers()).await;
	seed(
		&service,
		&[
			resume_doc("resume-a", "Python and Go.", "Germany", &["Python", "Go"]),
			resume_doc("resume-b", "Python and Rust.", "Germany", &["Python", "Rust"]),
			resume_doc("resume-c", "Python.", "Germany", &["Python"]),
		],
	)
	.await;

	let mut req = request(&["python", "go", "rust"]);
	req.mode = MatchMode::MatchAtLeast;
	req.min_match = Some(1);

	let first = service.search(req.clone()).await.expect("search failed");
	let second = service.search(req).await.expect("search failed");

	let first_json = serde_json::to_string(&first.results).expect("serialize failed");
	let second_json = serde_json::to_string(&second.results).expect("serialize failed");
	assert_eq!(first_json, second_json);
}

#[tokio::test]
async fn rerank_reorders_and_its_failure_is_non_fatal() {
	let cfg = test_config();
	let service = build_service(cfg, default_test_providers()).await;
	seed(
		&service,
		&[
			resume_doc("resume-a", "Python with React frontends.", "Germany", &["Python"]),
			resume_doc("resume-b", "Python with Rust tooling.", "Germany", &["Python"]),
		],
	)
	.await;

	// A reranker that strongly favors the Rust-flavored evidence.
	let reranking = service_with_pool(
		test_config(),
		service.db.pool.clone(),
		sift_service::Providers::new(
			Arc::new(KeywordEmbedding),
			Arc::new(NeedleRerank { needle: "rust".to_string() }),
			Arc::new(SpyExtractor {
				calls: Arc::new(AtomicUsize::new(0)),
				payload: serde_json::json!({}),
			}),
		),
	);
	let mut req = request(&["python"]);
	req.enable_rerank = Some(true);
	let response = reranking.search(req.clone()).await.expect("search failed");
	assert_eq!(response.results[0].resume_id, "resume-b");
	assert!(response.results[0].rerank_score.is_some());

	// A dead reranker keeps the fused order instead of failing.
	let failing = service_with_pool(
		test_config(),
		service.db.pool.clone(),
		sift_service::Providers::new(
			Arc::new(KeywordEmbedding),
			Arc::new(FailingRerank),
			Arc::new(SpyExtractor {
				calls: Arc::new(AtomicUsize::new(0)),
				payload: serde_json::json!({}),
			}),
		),
	);
	let response = failing.search(req).await.expect("search must not fail on a rerank outage");
	assert_eq!(response.results.len(), 2);
	assert!(response.results[0].rerank_score.is_none());
}
