//! Reciprocal rank fusion and evidence selection. Fusion is rank-only:
//! the lexical and dense legs score on incomparable scales, so only the
//! positions they assign matter here.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::retrieval::RetrievedChunk;

const MAX_EVIDENCE_PER_CANDIDATE: usize = 3;
const MAX_EVIDENCE_CHARS: usize = 800;

#[derive(Clone, Debug)]
pub(crate) struct FusedCandidate {
	pub resume_id: String,
	pub rrf_score: f32,
	pub dense_rank: Option<u32>,
	pub sparse_rank: Option<u32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WhyMatched {
	Dense,
	Sparse,
	Both,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EvidenceItem {
	pub chunk_text: String,
	pub section_type: String,
	pub section_ordinal: i64,
	pub score: f32,
	pub why_matched: WhyMatched,
}

/// Best (lowest) chunk rank per resume in one retrieval list.
fn resume_ranks(list: &[RetrievedChunk]) -> BTreeMap<&str, u32> {
	let mut ranks: BTreeMap<&str, u32> = BTreeMap::new();
	for chunk in list {
		ranks
			.entry(chunk.resume_id.as_str())
			.and_modify(|rank| *rank = (*rank).min(chunk.rank))
			.or_insert(chunk.rank);
	}
	ranks
}

/// `rrf(resume) = Σ over lists 1 / (k + rank)`, missing lists contribute
/// zero. Sorted by score descending, ties broken by resume id ascending
/// so equal-rank resumes come back in a stable order.
pub(crate) fn fuse(
	dense: &[RetrievedChunk],
	sparse: &[RetrievedChunk],
	rrf_k: u32,
) -> Vec<FusedCandidate> {
	let dense_ranks = resume_ranks(dense);
	let sparse_ranks = resume_ranks(sparse);
	let k = rrf_k as f32;

	let mut all_ids: Vec<&str> = dense_ranks.keys().chain(sparse_ranks.keys()).copied().collect();
	all_ids.sort_unstable();
	all_ids.dedup();

	let mut fused: Vec<FusedCandidate> = all_ids
		.into_iter()
		.map(|resume_id| {
			let dense_rank = dense_ranks.get(resume_id).copied();
			let sparse_rank = sparse_ranks.get(resume_id).copied();
			let mut rrf_score = 0.0;
			if let Some(rank) = dense_rank {
				rrf_score += 1.0 / (k + rank as f32);
			}
			if let Some(rank) = sparse_rank {
				rrf_score += 1.0 / (k + rank as f32);
			}
			FusedCandidate { resume_id: resume_id.to_string(), rrf_score, dense_rank, sparse_rank }
		})
		.collect();

	fused.sort_by(|a, b| {
		b.rrf_score
			.partial_cmp(&a.rrf_score)
			.unwrap_or(std::cmp::Ordering::Equal)
			.then_with(|| a.resume_id.cmp(&b.resume_id))
	});
	fused
}

/// Top evidence snippets per resume: the union of both lists, de-duplicated
/// by `(section_type, section_ordinal)`. A chunk surfacing in both legs is
/// marked `both`. Items are ordered by their chunk-level RRF contribution,
/// which is comparable across legs where the raw scores are not.
pub(crate) fn collect_evidence(
	dense: &[RetrievedChunk],
	sparse: &[RetrievedChunk],
	rrf_k: u32,
) -> HashMap<String, Vec<EvidenceItem>> {
	struct Entry {
		chunk_text: String,
		why_matched: WhyMatched,
		score: f32,
	}

	let k = rrf_k as f32;
	// resume -> (section_type, section_ordinal) -> entry.
	let mut per_resume: BTreeMap<String, BTreeMap<(String, i64), Entry>> = BTreeMap::new();

	let mut absorb = |list: &[RetrievedChunk], source: WhyMatched| {
		for chunk in list {
			let contribution = 1.0 / (k + chunk.rank as f32);
			let sections = per_resume.entry(chunk.resume_id.clone()).or_default();
			sections
				.entry((chunk.section_type.clone(), chunk.section_ordinal))
				.and_modify(|entry| {
					if entry.why_matched != source {
						entry.why_matched = WhyMatched::Both;
					}
					entry.score += contribution;
				})
				.or_insert_with(|| Entry {
					chunk_text: chunk.chunk_text.clone(),
					why_matched: source,
					score: contribution,
				});
		}
	};
	absorb(dense, WhyMatched::Dense);
	absorb(sparse, WhyMatched::Sparse);

	per_resume
		.into_iter()
		.map(|(resume_id, sections)| {
			let mut items: Vec<EvidenceItem> = sections
				.into_iter()
				.map(|((section_type, section_ordinal), entry)| EvidenceItem {
					chunk_text: truncate_chars(&entry.chunk_text, MAX_EVIDENCE_CHARS),
					section_type,
					section_ordinal,
					score: entry.score,
					why_matched: entry.why_matched,
				})
				.collect();
			items.sort_by(|a, b| {
				b.score
					.partial_cmp(&a.score)
					.unwrap_or(std::cmp::Ordering::Equal)
					.then_with(|| a.section_type.cmp(&b.section_type))
					.then_with(|| a.section_ordinal.cmp(&b.section_ordinal))
			});
			items.truncate(MAX_EVIDENCE_PER_CANDIDATE);
			(resume_id, items)
		})
		.collect()
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
	if text.chars().count() <= max_chars {
		return text.to_string();
	}
	text.chars().take(max_chars).collect()
}
