//! The two retrieval legs. Both operate on a chunk pool the caller has
//! already restricted to gated candidates, and both produce rank-ordered
//! lists the fusion stage can consume without knowing which leg scored
//! what.

use std::time::Duration;

use regex::Regex;
use tracing::warn;

use sift_domain::vector::{blob_to_vec, cosine_similarity};
use sift_storage::models::ChunkRow;

use crate::{ServiceError, ServiceResult, SiftService};

/// One fork-join pass over both legs. A failed or timed-out dense leg
/// degrades to an empty list instead of failing the query; the flag lets
/// callers report `vector_hits = 0` honestly.
pub(crate) struct HybridOutcome {
	pub dense: Vec<RetrievedChunk>,
	pub sparse: Vec<RetrievedChunk>,
	pub dense_degraded: bool,
}

impl SiftService {
	pub(crate) async fn run_hybrid(
		&self,
		pool: &[ChunkRow],
		lexical_query: &str,
		dense_query: &str,
	) -> HybridOutcome {
		let k_sparse = self.cfg.search.k_sparse as usize;
		let k_dense = self.cfg.search.k_dense as usize;

		let (sparse, dense_result) = tokio::join!(
			async { lexical_rank(pool, lexical_query, k_sparse) },
			self.embed_query(dense_query),
		);

		match dense_result {
			Ok(query_embedding) => HybridOutcome {
				dense: dense_rank(pool, &query_embedding, k_dense),
				sparse,
				dense_degraded: false,
			},
			Err(err) => {
				warn!(error = %err, "Dense retrieval degraded; continuing with lexical only.");
				HybridOutcome { dense: Vec::new(), sparse, dense_degraded: true }
			},
		}
	}

	/// Embed a single query under the retrieval soft timeout.
	pub(crate) async fn embed_query(&self, query: &str) -> ServiceResult<Vec<f32>> {
		let texts = vec![query.to_string()];
		let deadline = Duration::from_millis(self.cfg.search.retrieval_timeout_ms);
		let embedded = tokio::time::timeout(
			deadline,
			self.providers.embedding.embed(&self.cfg.providers.embedding, &texts),
		)
		.await
		.map_err(|_| ServiceError::UpstreamUnavailable {
			message: "Embedding provider timed out.".to_string(),
		})??;

		embedded.into_iter().next().ok_or_else(|| ServiceError::UpstreamUnavailable {
			message: "Embedding provider returned no vectors.".to_string(),
		})
	}
}

#[derive(Clone, Debug)]
pub(crate) struct RetrievedChunk {
	pub chunk_id: String,
	pub resume_id: String,
	pub section_type: String,
	pub section_ordinal: i64,
	pub chunk_text: String,
	pub score: f32,
	pub rank: u32,
}

/// Split a query into lexical terms: `,`/`;`/whitespace separated,
/// single-character tokens dropped.
pub(crate) fn query_terms(query_text: &str) -> Vec<String> {
	query_text
		.split([',', ';', ' ', '\t', '\n', '\r'])
		.map(str::trim)
		.filter(|term| term.chars().count() > 1)
		.map(str::to_string)
		.collect()
}

/// Term-frequency scoring: each chunk scores the total occurrence count
/// across all terms, case-insensitively. Zero-scoring chunks are dropped;
/// the sort is stable over the store's deterministic iteration order.
pub(crate) fn lexical_rank(
	pool: &[ChunkRow],
	query_text: &str,
	limit: usize,
) -> Vec<RetrievedChunk> {
	let terms = query_terms(query_text);
	if terms.is_empty() {
		return Vec::new();
	}

	let patterns: Vec<Regex> = terms
		.iter()
		.filter_map(|term| Regex::new(&format!("(?i){}", regex::escape(term))).ok())
		.collect();

	let mut scored: Vec<RetrievedChunk> = pool
		.iter()
		.filter_map(|chunk| {
			let hits: usize =
				patterns.iter().map(|pattern| pattern.find_iter(&chunk.chunk_text).count()).sum();
			if hits == 0 {
				return None;
			}
			Some(retrieved(chunk, hits as f32))
		})
		.collect();

	scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
	scored.truncate(limit);
	assign_ranks(&mut scored);
	scored
}

/// Exact cosine between the query embedding and every chunk that carries
/// one. Zero-norm and missing embeddings never rank.
pub(crate) fn dense_rank(
	pool: &[ChunkRow],
	query_embedding: &[f32],
	limit: usize,
) -> Vec<RetrievedChunk> {
	let mut scored: Vec<RetrievedChunk> = pool
		.iter()
		.filter(|chunk| !chunk.embedding.is_empty())
		.map(|chunk| {
			let similarity = cosine_similarity(query_embedding, &blob_to_vec(&chunk.embedding));
			retrieved(chunk, similarity)
		})
		.collect();

	scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
	scored.truncate(limit);
	assign_ranks(&mut scored);
	scored
}

fn retrieved(chunk: &ChunkRow, score: f32) -> RetrievedChunk {
	RetrievedChunk {
		chunk_id: chunk.chunk_id.clone(),
		resume_id: chunk.resume_id.clone(),
		section_type: chunk.section_type.clone(),
		section_ordinal: chunk.section_ordinal,
		chunk_text: chunk.chunk_text.clone(),
		score,
		rank: 0,
	}
}

fn assign_ranks(scored: &mut [RetrievedChunk]) {
	for (idx, chunk) in scored.iter_mut().enumerate() {
		chunk.rank = (idx + 1) as u32;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use sift_domain::vector::vec_to_blob;

	fn chunk(id: &str, resume: &str, text: &str, embedding: &[f32]) -> ChunkRow {
		ChunkRow {
			chunk_id: id.to_string(),
			resume_id: resume.to_string(),
			section_type: "experience".to_string(),
			section_ordinal: 0,
			chunk_text: text.to_string(),
			embedding: if embedding.is_empty() { Vec::new() } else { vec_to_blob(embedding) },
			skills_in_chunk: "[]".to_string(),
		}
	}

	#[test]
	fn query_terms_drop_short_tokens() {
		assert_eq!(query_terms("python, go; a r"), vec!["python", "go"]);
		assert!(query_terms("a b c").is_empty());
	}

	#[test]
	fn lexical_rank_counts_occurrences_across_terms() {
		let pool = vec![
			chunk("c1", "r1", "Python and more Python services", &[]),
			chunk("c2", "r2", "One python mention", &[]),
			chunk("c3", "r3", "Nothing relevant", &[]),
		];
		let ranked = lexical_rank(&pool, "python", 10);
		assert_eq!(ranked.len(), 2);
		assert_eq!(ranked[0].chunk_id, "c1");
		assert_eq!(ranked[0].score, 2.0);
		assert_eq!(ranked[0].rank, 1);
		assert_eq!(ranked[1].rank, 2);
	}

	#[test]
	fn lexical_rank_escapes_regex_metacharacters() {
		let pool = vec![chunk("c1", "r1", "Ships C++ builds", &[])];
		let ranked = lexical_rank(&pool, "c++", 10);
		assert_eq!(ranked.len(), 1);
	}

	#[test]
	fn lexical_rank_with_no_terms_is_empty() {
		let pool = vec![chunk("c1", "r1", "anything", &[])];
		assert!(lexical_rank(&pool, " , ;", 10).is_empty());
	}

	#[test]
	fn dense_rank_orders_by_similarity() {
		let pool = vec![
			chunk("c1", "r1", "", &[1.0, 0.0]),
			chunk("c2", "r2", "", &[0.0, 1.0]),
			chunk("c3", "r3", "", &[0.7, 0.7]),
		];
		let ranked = dense_rank(&pool, &[1.0, 0.0], 10);
		assert_eq!(ranked[0].chunk_id, "c1");
		assert_eq!(ranked[1].chunk_id, "c3");
		assert_eq!(ranked[2].chunk_id, "c2");
	}

	#[test]
	fn dense_rank_skips_chunks_without_embeddings() {
		let pool = vec![chunk("c1", "r1", "", &[]), chunk("c2", "r2", "", &[1.0, 0.0])];
		let ranked = dense_rank(&pool, &[1.0, 0.0], 10);
		assert_eq!(ranked.len(), 1);
		assert_eq!(ranked[0].chunk_id, "c2");
	}

	#[test]
	fn dense_rank_truncates_to_limit() {
		let pool = vec![
			chunk("c1", "r1", "", &[1.0, 0.0]),
			chunk("c2", "r2", "", &[0.9, 0.1]),
			chunk("c3", "r3", "", &[0.8, 0.2]),
		];
		let ranked = dense_rank(&pool, &[1.0, 0.0], 2);
		assert_eq!(ranked.len(), 2);
	}
}
