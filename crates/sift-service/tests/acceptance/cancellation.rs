use std::{
	sync::{
		Arc,
		atomic::{AtomicBool, AtomicUsize, Ordering},
	},
	time::Duration,
};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use sift_service::{PipelineEvent, Providers, ShortlistRequest, SiftService};

use super::{HangingEmbedding, SpyExtractor, StubRerank, build_service, resume_doc, seed, test_config};

#[tokio::test]
async fn aborting_mid_retrieval_stops_events_and_cancels_the_embedding_call() {
	// Long soft timeouts so the hanging call stays in flight until the
	// abort, not until a timer.
	let mut cfg = test_config();
	cfg.search.retrieval_timeout_ms = 30_000;
	cfg.search.pipeline_timeout_ms = 60_000;

	let dropped = Arc::new(AtomicBool::new(false));
	let providers = Providers::new(
		Arc::new(HangingEmbedding { dropped: dropped.clone() }),
		Arc::new(StubRerank),
		Arc::new(SpyExtractor {
			calls: Arc::new(AtomicUsize::new(0)),
			payload: serde_json::json!({ "must_have": ["python"] }),
		}),
	);

	// Seed through a working embedding first, then swap in the hanging one.
	let seeded = build_service(test_config(), super::default_test_providers()).await;
	seed(&seeded, &[resume_doc("resume-a", "Python.", "Germany", &["Python"])]).await;
	let service =
		Arc::new(super::service_with_pool(cfg, seeded.db.pool.clone(), providers));

	let (tx, mut rx) = mpsc::channel(64);
	let cancel = CancellationToken::new();
	let pipeline_cancel = cancel.clone();
	let pipeline_service = service.clone();
	let pipeline = tokio::spawn(async move {
		pipeline_service
			.shortlist(
				ShortlistRequest {
					query_text: "Python engineer".to_string(),
					filters: None,
					limit: None,
				},
				tx,
				pipeline_cancel,
			)
			.await;
	});

	// Consume events until the dense leg is announced, then abort.
	let mut seen_before_abort = Vec::new();
	loop {
		let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
			.await
			.expect("pipeline stalled before the retrieval stage")
			.expect("pipeline closed before the retrieval stage");
		let is_dense_call =
			matches!(&event, PipelineEvent::ToolCall { tool, .. } if *tool == "vector_search_chunks");
		seen_before_abort.push(event);
		if is_dense_call {
			break;
		}
	}
	cancel.cancel();

	tokio::time::timeout(Duration::from_secs(5), pipeline)
		.await
		.expect("pipeline did not wind down after the abort")
		.expect("pipeline task panicked");

	// No events after the abort: no stage_complete for retrieval, no
	// error, no result, no done.
	let mut after_abort = Vec::new();
	while let Ok(Some(event)) = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await {
		after_abort.push(event);
	}
	assert!(
		after_abort.is_empty(),
		"events were emitted after the abort: {:?}",
		after_abort.iter().map(|e| e.name()).collect::<Vec<_>>()
	);
	assert!(!seen_before_abort.iter().any(|e| e.name() == "done"));

	// The in-flight embedding call was dropped with its transport.
	assert!(dropped.load(Ordering::SeqCst), "embedding future was not cancelled");
}
