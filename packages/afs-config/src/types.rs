use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	#[serde(default)]
	pub providers: Providers,
	#[serde(default)]
	pub search: Search,
	#[serde(default)]
	pub ranking: Ranking,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Storage {
	/// Dimension of the cache embedding column and of the vector index.
	pub vector_dim: u32,
	pub postgres: Postgres,
	/// Optional. Without it the vector retrieval path is unavailable and searches run lexical-only.
	pub qdrant: Option<Qdrant>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Providers {
	/// Optional. Without it both the vector path and the result cache degrade to no-ops.
	pub embedding: Option<EmbeddingProviderConfig>,
	pub rerank: Option<ProviderConfig>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Search {
	pub default_top_k: u32,
	pub max_top_k: u32,
	/// Per-source candidate budget handed to lexical and vector retrieval.
	pub candidate_k: u32,
	pub lexical_fetch_limit: u32,
	pub term_concurrency: u32,
	pub timeout_ms: u64,
	pub cache: SearchCache,
}
impl Default for Search {
	fn default() -> Self {
		Self {
			default_top_k: 20,
			max_top_k: 100,
			candidate_k: 100,
			lexical_fetch_limit: 2_000,
			term_concurrency: 4,
			timeout_ms: 10_000,
			cache: SearchCache::default(),
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SearchCache {
	pub enabled: bool,
	pub similarity_threshold: f32,
	pub max_entries: u32,
	pub ttl_days: i64,
}
impl Default for SearchCache {
	fn default() -> Self {
		Self { enabled: true, similarity_threshold: 0.95, max_entries: 10_000, ttl_days: 30 }
	}
}

/// Default fusion parameters. Requests override any subset of them.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Ranking {
	pub k1: f32,
	pub b: f32,
	pub lexical_weight: f32,
	pub vector_weight: f32,
	pub skill_boost_factor: f32,
	pub recency_boost_factor: f32,
	pub fusion_method: String,
}
impl Default for Ranking {
	fn default() -> Self {
		Self {
			k1: 1.5,
			b: 0.6,
			lexical_weight: 0.5,
			vector_weight: 0.5,
			skill_boost_factor: 0.3,
			recency_boost_factor: 0.1,
			fusion_method: "weighted_sum".to_string(),
		}
	}
}
