mod types;

pub use types::*;

pub fn load(path: &std::path::Path) -> color_eyre::Result<Config> {
	let raw = std::fs::read_to_string(path)?;
	let mut cfg: Config = toml::from_str(&raw)?;
	apply_env_overrides(&mut cfg, &std::env::vars().collect::<Vec<_>>());
	validate(&cfg)?;
	Ok(cfg)
}

/// Recognized environment overrides. Values that fail to parse are ignored
/// so a stray variable cannot take the service down at boot.
pub fn apply_env_overrides(cfg: &mut Config, vars: &[(String, String)]) {
	for (key, value) in vars {
		match key.as_str() {
			"EMBEDDING_MODEL_DIM" => {
				if let Ok(dim) = value.parse() {
					cfg.providers.embedding.dimensions = dim;
				}
			},
			"RERANK_MODEL_ENDPOINT" => {
				cfg.providers.rerank.api_base = value.clone();
			},
			"K_DENSE" => {
				if let Ok(k) = value.parse() {
					cfg.search.k_dense = k;
				}
			},
			"K_SPARSE" => {
				if let Ok(k) = value.parse() {
					cfg.search.k_sparse = k;
				}
			},
			"RRF_K" => {
				if let Ok(k) = value.parse() {
					cfg.search.rrf_k = k;
				}
			},
			"MIN_RELEVANCE_SCORE" => {
				if let Ok(score) = value.parse() {
					cfg.search.min_relevance_score = score;
				}
			},
			"RETRIEVAL_TIMEOUT_MS" => {
				if let Ok(ms) = value.parse() {
					cfg.search.retrieval_timeout_ms = ms;
				}
			},
			"RERANK_TIMEOUT_MS" => {
				if let Ok(ms) = value.parse() {
					cfg.search.rerank_timeout_ms = ms;
				}
			},
			"PIPELINE_TIMEOUT_MS" => {
				if let Ok(ms) = value.parse() {
					cfg.search.pipeline_timeout_ms = ms;
				}
			},
			_ => {},
		}
	}
}

pub fn validate(cfg: &Config) -> color_eyre::Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(color_eyre::eyre::eyre!("service.http_bind must be non-empty."));
	}
	if cfg.storage.sqlite.path.trim().is_empty() {
		return Err(color_eyre::eyre::eyre!("storage.sqlite.path must be non-empty."));
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(color_eyre::eyre::eyre!(
			"providers.embedding.dimensions must be greater than zero."
		));
	}
	if cfg.search.k_dense == 0 || cfg.search.k_sparse == 0 {
		return Err(color_eyre::eyre::eyre!(
			"search.k_dense and search.k_sparse must be greater than zero."
		));
	}
	if cfg.search.rrf_k == 0 {
		return Err(color_eyre::eyre::eyre!("search.rrf_k must be greater than zero."));
	}
	Ok(())
}
