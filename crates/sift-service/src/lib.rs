//! Retrieval and ranking core: skill gating, hybrid lexical + dense
//! retrieval over resume chunks, reciprocal rank fusion, evidence
//! selection, bounded scoring, and the two orchestrators that drive it
//! (the classic skills query and the streamed agentic pipeline).

pub mod events;
mod fusion;
pub mod ingest;
pub mod resume;
mod retrieval;
pub mod search;
pub mod shortlist;

pub use events::{PipelineEvent, Stage};
pub use fusion::{EvidenceItem, WhyMatched};
pub use ingest::IngestOutcome;
pub use resume::{ChunkOut, DeleteResponse, ResumeProfile, SkillOut};
pub use search::{
	CandidateOut, EvidenceOut, HybridStats, MatchMode, SearchMeta, SearchRequest, SearchResponse,
};
pub use shortlist::{
	MatchQuality, MissionSpec, ShortlistData, ShortlistFilters, ShortlistRequest,
};

use std::{future::Future, pin::Pin, sync::Arc};

use sift_config::{Config, EmbeddingProviderConfig, LlmProviderConfig, ProviderConfig};
use sift_storage::Db;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug)]
pub enum ServiceError {
	InvalidQuery { message: String },
	NotFound { message: String },
	UpstreamUnavailable { message: String },
	Internal { message: String },
}

impl std::fmt::Display for ServiceError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::InvalidQuery { message } => write!(f, "Invalid query: {message}"),
			Self::NotFound { message } => write!(f, "Not found: {message}"),
			Self::UpstreamUnavailable { message } => {
				write!(f, "Upstream unavailable: {message}")
			},
			Self::Internal { message } => write!(f, "Internal error: {message}"),
		}
	}
}

impl std::error::Error for ServiceError {}

impl From<sift_storage::Error> for ServiceError {
	fn from(err: sift_storage::Error) -> Self {
		match err {
			sift_storage::Error::NotFound(message) => Self::NotFound { message },
			other => Self::Internal { message: other.to_string() },
		}
	}
}

impl From<sift_providers::Error> for ServiceError {
	fn from(err: sift_providers::Error) -> Self {
		Self::UpstreamUnavailable { message: err.to_string() }
	}
}

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider: Send + Sync {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, sift_providers::Result<Vec<Vec<f32>>>>;
}

pub trait RerankProvider: Send + Sync {
	fn rerank<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		query: &'a str,
		docs: &'a [String],
		top_k: usize,
	) -> BoxFuture<'a, sift_providers::Result<Vec<f32>>>;
}

pub trait ExtractorProvider: Send + Sync {
	fn extract<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [serde_json::Value],
	) -> BoxFuture<'a, sift_providers::Result<serde_json::Value>>;
}

struct DefaultProviders;

impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, sift_providers::Result<Vec<Vec<f32>>>> {
		Box::pin(sift_providers::embedding::embed(cfg, texts))
	}
}

impl RerankProvider for DefaultProviders {
	fn rerank<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		query: &'a str,
		docs: &'a [String],
		top_k: usize,
	) -> BoxFuture<'a, sift_providers::Result<Vec<f32>>> {
		Box::pin(sift_providers::rerank::rerank(cfg, query, docs, top_k))
	}
}

impl ExtractorProvider for DefaultProviders {
	fn extract<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [serde_json::Value],
	) -> BoxFuture<'a, sift_providers::Result<serde_json::Value>> {
		Box::pin(sift_providers::extractor::extract(cfg, messages))
	}
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub rerank: Arc<dyn RerankProvider>,
	pub extractor: Arc<dyn ExtractorProvider>,
}

impl Providers {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		rerank: Arc<dyn RerankProvider>,
		extractor: Arc<dyn ExtractorProvider>,
	) -> Self {
		Self { embedding, rerank, extractor }
	}
}

impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);
		Self { embedding: provider.clone(), rerank: provider.clone(), extractor: provider }
	}
}

pub struct SiftService {
	pub cfg: Config,
	pub db: Db,
	pub providers: Providers,
}

impl SiftService {
	pub fn new(cfg: Config, db: Db) -> Self {
		Self { cfg, db, providers: Providers::default() }
	}

	pub fn with_providers(cfg: Config, db: Db, providers: Providers) -> Self {
		Self { cfg, db, providers }
	}
}
