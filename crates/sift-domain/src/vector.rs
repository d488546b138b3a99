//! Embedding vectors travel as little-endian `f32` BLOBs; similarity is
//! exact cosine over the gated candidate set.

pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
	let mut bytes = Vec::with_capacity(vec.len() * 4);
	for value in vec {
		bytes.extend_from_slice(&value.to_le_bytes());
	}
	bytes
}

pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
	blob.chunks_exact(4)
		.map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
		.collect()
}

/// Cosine similarity in `[-1, 1]`. Mismatched lengths, empty inputs, and
/// zero-norm vectors all score 0.0 instead of erroring.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
	if a.len() != b.len() || a.is_empty() {
		return 0.0;
	}

	let mut dot = 0.0f32;
	let mut norm_a = 0.0f32;
	let mut norm_b = 0.0f32;
	for (x, y) in a.iter().zip(b.iter()) {
		dot += x * y;
		norm_a += x * x;
		norm_b += y * y;
	}

	let denom = norm_a.sqrt() * norm_b.sqrt();
	if denom < f32::EPSILON {
		return 0.0;
	}
	dot / denom
}
