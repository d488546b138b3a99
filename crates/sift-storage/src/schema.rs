/// Logical layout: four tables keyed by `resume_id`, with the secondary
/// indices the ledger gate and the chunk store rely on. PII lives in its
/// own table and is never read by the retrieval path.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS resumes_core (
	resume_id TEXT PRIMARY KEY,
	summary TEXT NOT NULL DEFAULT '',
	location_country TEXT NOT NULL DEFAULT '',
	location_city TEXT NOT NULL DEFAULT '',
	total_yoe INTEGER NOT NULL DEFAULT 0,
	experience TEXT NOT NULL DEFAULT '[]',
	projects TEXT NOT NULL DEFAULT '[]',
	education TEXT NOT NULL DEFAULT '[]',
	ingested_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS resumes_pii (
	resume_id TEXT PRIMARY KEY,
	payload TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS resume_skills (
	resume_id TEXT NOT NULL,
	skill_canonical TEXT NOT NULL,
	confidence REAL NOT NULL,
	evidence_count INTEGER NOT NULL,
	evidence_sources TEXT NOT NULL DEFAULT '[]',
	PRIMARY KEY (resume_id, skill_canonical)
);

CREATE INDEX IF NOT EXISTS idx_resume_skills_skill ON resume_skills (skill_canonical);

CREATE INDEX IF NOT EXISTS idx_resume_skills_resume ON resume_skills (resume_id);

CREATE TABLE IF NOT EXISTS resume_chunks (
	chunk_id TEXT PRIMARY KEY,
	resume_id TEXT NOT NULL,
	section_type TEXT NOT NULL,
	section_ordinal INTEGER NOT NULL,
	chunk_text TEXT NOT NULL,
	embedding BLOB NOT NULL DEFAULT '',
	skills_in_chunk TEXT NOT NULL DEFAULT '[]'
);

CREATE INDEX IF NOT EXISTS idx_resume_chunks_resume ON resume_chunks (resume_id)
"#;
