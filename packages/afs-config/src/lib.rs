mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, EmbeddingProviderConfig, Postgres, ProviderConfig, Providers, Qdrant, Ranking, Search,
	SearchCache, Service, Storage,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;
	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);
	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.storage.vector_dim == 0 {
		return Err(Error::Validation {
			message: "storage.vector_dim must be greater than zero.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}

	if let Some(qdrant) = cfg.storage.qdrant.as_ref()
		&& qdrant.collection.trim().is_empty()
	{
		return Err(Error::Validation {
			message: "storage.qdrant.collection must be non-empty.".to_string(),
		});
	}

	if let Some(embedding) = cfg.providers.embedding.as_ref() {
		if embedding.dimensions == 0 {
			return Err(Error::Validation {
				message: "providers.embedding.dimensions must be greater than zero.".to_string(),
			});
		}
		if embedding.dimensions != cfg.storage.vector_dim {
			return Err(Error::Validation {
				message: "providers.embedding.dimensions must match storage.vector_dim."
					.to_string(),
			});
		}
		if embedding.api_key.trim().is_empty() {
			return Err(Error::Validation {
				message: "Provider embedding api_key must be non-empty.".to_string(),
			});
		}
	}
	if let Some(rerank) = cfg.providers.rerank.as_ref()
		&& rerank.api_key.trim().is_empty()
	{
		return Err(Error::Validation {
			message: "Provider rerank api_key must be non-empty.".to_string(),
		});
	}

	validate_search(cfg)
}

fn validate_search(cfg: &Config) -> Result<()> {
	let search = &cfg.search;

	if search.default_top_k == 0 {
		return Err(Error::Validation {
			message: "search.default_top_k must be greater than zero.".to_string(),
		});
	}
	if search.default_top_k > search.max_top_k {
		return Err(Error::Validation {
			message: "search.default_top_k must be at most search.max_top_k.".to_string(),
		});
	}
	if search.candidate_k == 0 {
		return Err(Error::Validation {
			message: "search.candidate_k must be greater than zero.".to_string(),
		});
	}
	if search.lexical_fetch_limit == 0 {
		return Err(Error::Validation {
			message: "search.lexical_fetch_limit must be greater than zero.".to_string(),
		});
	}
	if search.term_concurrency == 0 {
		return Err(Error::Validation {
			message: "search.term_concurrency must be greater than zero.".to_string(),
		});
	}
	if search.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "search.timeout_ms must be greater than zero.".to_string(),
		});
	}

	let threshold = search.cache.similarity_threshold;

	if !threshold.is_finite() {
		return Err(Error::Validation {
			message: "search.cache.similarity_threshold must be a finite number.".to_string(),
		});
	}
	if threshold <= 0.0 || threshold > 1.0 {
		return Err(Error::Validation {
			message: "search.cache.similarity_threshold must be in the range (0.0, 1.0]."
				.to_string(),
		});
	}
	if search.cache.max_entries == 0 {
		return Err(Error::Validation {
			message: "search.cache.max_entries must be greater than zero.".to_string(),
		});
	}
	if search.cache.ttl_days <= 0 {
		return Err(Error::Validation {
			message: "search.cache.ttl_days must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg
		.storage
		.qdrant
		.as_ref()
		.map(|qdrant| qdrant.url.trim().is_empty())
		.unwrap_or(false)
	{
		cfg.storage.qdrant = None;
	}
	if cfg
		.providers
		.embedding
		.as_ref()
		.map(|embedding| embedding.api_base.trim().is_empty())
		.unwrap_or(false)
	{
		cfg.providers.embedding = None;
	}
	if cfg
		.providers
		.rerank
		.as_ref()
		.map(|rerank| rerank.api_base.trim().is_empty())
		.unwrap_or(false)
	{
		cfg.providers.rerank = None;
	}

	cfg.ranking.fusion_method = cfg.ranking.fusion_method.trim().to_ascii_lowercase();
}
