use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	pub search: Search,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub sqlite: Sqlite,
}

#[derive(Debug, Deserialize)]
pub struct Sqlite {
	pub path: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub rerank: ProviderConfig,
	pub llm_extractor: LlmProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	pub default_headers: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct ProviderConfig {
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub timeout_ms: u64,
	pub default_headers: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct LlmProviderConfig {
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	pub default_headers: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct Search {
	#[serde(default = "default_k_dense")]
	pub k_dense: u32,
	#[serde(default = "default_k_sparse")]
	pub k_sparse: u32,
	#[serde(default = "default_rrf_k")]
	pub rrf_k: u32,
	#[serde(default = "default_min_relevance_score")]
	pub min_relevance_score: f32,
	#[serde(default = "default_min_strong_matches")]
	pub min_strong_matches: u32,
	#[serde(default = "default_limit")]
	pub default_limit: u32,
	#[serde(default = "default_rerank_pool_cap")]
	pub rerank_pool_cap: u32,
	#[serde(default = "default_retrieval_timeout_ms")]
	pub retrieval_timeout_ms: u64,
	#[serde(default = "default_rerank_timeout_ms")]
	pub rerank_timeout_ms: u64,
	#[serde(default = "default_pipeline_timeout_ms")]
	pub pipeline_timeout_ms: u64,
}

fn default_k_dense() -> u32 {
	300
}

fn default_k_sparse() -> u32 {
	300
}

fn default_rrf_k() -> u32 {
	60
}

fn default_min_relevance_score() -> f32 {
	20.0
}

fn default_min_strong_matches() -> u32 {
	3
}

fn default_limit() -> u32 {
	50
}

fn default_rerank_pool_cap() -> u32 {
	100
}

fn default_retrieval_timeout_ms() -> u64 {
	2_000
}

fn default_rerank_timeout_ms() -> u64 {
	5_000
}

fn default_pipeline_timeout_ms() -> u64 {
	20_000
}
