use sift_config::{
	Config, EmbeddingProviderConfig, LlmProviderConfig, ProviderConfig, Providers, Search, Service,
	Sqlite, Storage, apply_env_overrides, validate,
};

fn sample_config() -> Config {
	Config {
		service: Service {
			http_bind: "127.0.0.1:8080".to_string(),
			log_level: "info".to_string(),
		},
		storage: Storage {
			sqlite: Sqlite { path: "sift.db".to_string(), pool_max_conns: 5 },
		},
		providers: Providers {
			embedding: EmbeddingProviderConfig {
				api_base: "http://localhost:8000".to_string(),
				api_key: "key".to_string(),
				path: "/embed".to_string(),
				model: "all-MiniLM-L6-v2".to_string(),
				dimensions: 384,
				timeout_ms: 1_000,
				default_headers: serde_json::Map::new(),
			},
			rerank: ProviderConfig {
				api_base: "http://localhost:8000".to_string(),
				api_key: "key".to_string(),
				path: "/rerank".to_string(),
				model: "cross-encoder/ms-marco-MiniLM-L-6-v2".to_string(),
				timeout_ms: 1_000,
				default_headers: serde_json::Map::new(),
			},
			llm_extractor: LlmProviderConfig {
				api_base: "http://localhost:8001".to_string(),
				api_key: "key".to_string(),
				path: "/chat/completions".to_string(),
				model: "model".to_string(),
				temperature: 0.1,
				timeout_ms: 1_000,
				default_headers: serde_json::Map::new(),
			},
		},
		search: Search {
			k_dense: 300,
			k_sparse: 300,
			rrf_k: 60,
			min_relevance_score: 20.0,
			min_strong_matches: 3,
			default_limit: 50,
			rerank_pool_cap: 100,
			retrieval_timeout_ms: 2_000,
			rerank_timeout_ms: 5_000,
			pipeline_timeout_ms: 20_000,
		},
	}
}

#[test]
fn accepts_sample_config() {
	assert!(validate(&sample_config()).is_ok());
}

#[test]
fn rejects_zero_embedding_dimensions() {
	let mut cfg = sample_config();
	cfg.providers.embedding.dimensions = 0;
	assert!(validate(&cfg).is_err());
}

#[test]
fn rejects_empty_http_bind() {
	let mut cfg = sample_config();
	cfg.service.http_bind = " ".to_string();
	assert!(validate(&cfg).is_err());
}

#[test]
fn rejects_zero_rrf_k() {
	let mut cfg = sample_config();
	cfg.search.rrf_k = 0;
	assert!(validate(&cfg).is_err());
}

#[test]
fn env_overrides_replace_recognized_keys() {
	let mut cfg = sample_config();
	let vars = vec![
		("EMBEDDING_MODEL_DIM".to_string(), "768".to_string()),
		("RERANK_MODEL_ENDPOINT".to_string(), "http://rerank:9000".to_string()),
		("K_DENSE".to_string(), "150".to_string()),
		("RRF_K".to_string(), "90".to_string()),
		("MIN_RELEVANCE_SCORE".to_string(), "35.5".to_string()),
	];
	apply_env_overrides(&mut cfg, &vars);
	assert_eq!(cfg.providers.embedding.dimensions, 768);
	assert_eq!(cfg.providers.rerank.api_base, "http://rerank:9000");
	assert_eq!(cfg.search.k_dense, 150);
	assert_eq!(cfg.search.rrf_k, 90);
	assert_eq!(cfg.search.min_relevance_score, 35.5);
}

#[test]
fn env_overrides_ignore_unparseable_values() {
	let mut cfg = sample_config();
	let vars = vec![("K_DENSE".to_string(), "not-a-number".to_string())];
	apply_env_overrides(&mut cfg, &vars);
	assert_eq!(cfg.search.k_dense, 300);
}

#[test]
fn search_defaults_apply_when_section_is_sparse() {
	let raw = r#"
		[service]
		http_bind = "127.0.0.1:8080"
		log_level = "info"

		[storage.sqlite]
		path = "sift.db"
		pool_max_conns = 5

		[providers.embedding]
		api_base = "http://localhost:8000"
		api_key = "key"
		path = "/embed"
		model = "all-MiniLM-L6-v2"
		dimensions = 384
		timeout_ms = 1000
		default_headers = {}

		[providers.rerank]
		api_base = "http://localhost:8000"
		api_key = "key"
		path = "/rerank"
		model = "ce"
		timeout_ms = 1000
		default_headers = {}

		[providers.llm_extractor]
		api_base = "http://localhost:8001"
		api_key = "key"
		path = "/chat/completions"
		model = "model"
		temperature = 0.1
		timeout_ms = 1000
		default_headers = {}

		[search]
	"#;
	let cfg: Config = toml::from_str(raw).expect("parse failed");
	assert_eq!(cfg.search.k_dense, 300);
	assert_eq!(cfg.search.k_sparse, 300);
	assert_eq!(cfg.search.rrf_k, 60);
	assert_eq!(cfg.search.min_relevance_score, 20.0);
	assert_eq!(cfg.search.pipeline_timeout_ms, 20_000);
}
