//! Read-only chunk lookups. Iteration order is fixed at
//! `(resume_id, section_type, section_ordinal)` so every consumer sees
//! the same sequence for the same input.

use sqlx::{QueryBuilder, SqlitePool};

use crate::{Result, models::ChunkRow};

const ORDER_CLAUSE: &str = " ORDER BY resume_id ASC, section_type ASC, section_ordinal ASC";

/// Chunks for the given resumes, or the whole corpus when `resume_ids`
/// is `None`. An explicit empty candidate set yields no chunks.
pub async fn chunks_for(
	pool: &SqlitePool,
	resume_ids: Option<&[String]>,
) -> Result<Vec<ChunkRow>> {
	match resume_ids {
		None => {
			let mut builder = QueryBuilder::new(select_prefix());
			builder.push(ORDER_CLAUSE);
			Ok(builder.build_query_as().fetch_all(pool).await?)
		},
		Some([]) => Ok(Vec::new()),
		Some(ids) => {
			let mut builder = QueryBuilder::new(select_prefix());
			builder.push(" WHERE resume_id IN (");
			{
				let mut separated = builder.separated(", ");
				for id in ids {
					separated.push_bind(id);
				}
			}
			builder.push(")");
			builder.push(ORDER_CLAUSE);
			Ok(builder.build_query_as().fetch_all(pool).await?)
		},
	}
}

/// One resume's chunks in section order; used by the profile endpoint,
/// which never exposes embeddings.
pub async fn chunks_for_resume(pool: &SqlitePool, resume_id: &str) -> Result<Vec<ChunkRow>> {
	let rows = sqlx::query_as(
		"SELECT chunk_id, resume_id, section_type, section_ordinal, chunk_text, embedding, \
		 skills_in_chunk FROM resume_chunks WHERE resume_id = $1 \
		 ORDER BY section_type ASC, section_ordinal ASC",
	)
	.bind(resume_id)
	.fetch_all(pool)
	.await?;
	Ok(rows)
}

fn select_prefix() -> &'static str {
	"SELECT chunk_id, resume_id, section_type, section_ordinal, chunk_text, embedding, \
	 skills_in_chunk FROM resume_chunks"
}
