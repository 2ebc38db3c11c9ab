pub mod search;
pub mod sources;

mod error;

pub use error::{Error, Result};
pub use search::{
	MatchDetails, MetadataFilter, ProfileSummary, QueryAnalysis, ScoreBreakdown, SearchDebug,
	SearchItem, SearchRequest, SearchResponse, SourceStatus, TopSkill,
};

use std::{collections::HashMap, future::Future, pin::Pin, sync::Arc};

use time::OffsetDateTime;

use afs_config::Config;
use afs_storage::{
	db::Db,
	models::{CachedEntry, CandidateChunks, EntityAttributes, EntityId, NewCacheEntry, VectorHit},
	qdrant::QdrantStore,
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Read access to the chunk corpus for lexical scoring. `chunk_types` of `None` means all types.
pub trait LexicalCorpus
where
	Self: Send + Sync,
{
	fn total_docs<'a>(&'a self, chunk_types: Option<&'a [String]>) -> BoxFuture<'a, Result<u64>>;

	fn avg_doc_length<'a>(&'a self, chunk_types: Option<&'a [String]>)
	-> BoxFuture<'a, Result<f64>>;

	fn doc_frequency<'a>(
		&'a self,
		term: &'a str,
		chunk_types: Option<&'a [String]>,
	) -> BoxFuture<'a, Result<u64>>;

	/// Chunks containing at least one of `terms`, flagged when the fetch limit cut the set short.
	fn fetch_candidates<'a>(
		&'a self,
		terms: &'a [String],
		chunk_types: Option<&'a [String]>,
	) -> BoxFuture<'a, Result<CandidateChunks>>;
}

pub trait VectorIndex
where
	Self: Send + Sync,
{
	/// Chunk-level hits ordered by descending cosine similarity.
	fn nearest<'a>(
		&'a self,
		embedding: &'a [f32],
		top_k: u32,
		chunk_types: Option<&'a [String]>,
	) -> BoxFuture<'a, Result<Vec<VectorHit>>>;
}

pub trait AttributeStore
where
	Self: Send + Sync,
{
	/// Entities without a stored record are absent from the map.
	fn fetch_attributes<'a>(
		&'a self,
		entity_ids: &'a [EntityId],
	) -> BoxFuture<'a, Result<HashMap<EntityId, EntityAttributes>>>;
}

pub trait ResultCacheStore
where
	Self: Send + Sync,
{
	/// Most similar stored entry created at or after `not_before`, if any.
	fn nearest<'a>(
		&'a self,
		embedding: &'a [f32],
		not_before: OffsetDateTime,
	) -> BoxFuture<'a, Result<Option<CachedEntry>>>;

	fn insert<'a>(&'a self, entry: &'a NewCacheEntry) -> BoxFuture<'a, Result<()>>;
}

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;
}

pub trait RerankProvider
where
	Self: Send + Sync,
{
	fn rerank<'a>(&'a self, query: &'a str, docs: &'a [String]) -> BoxFuture<'a, Result<Vec<f32>>>;
}

/// Data-access collaborators. Optional members are capabilities that may be unconfigured.
#[derive(Clone)]
pub struct Sources {
	pub lexical: Arc<dyn LexicalCorpus>,
	pub vector: Option<Arc<dyn VectorIndex>>,
	pub attributes: Arc<dyn AttributeStore>,
	pub cache: Option<Arc<dyn ResultCacheStore>>,
}

#[derive(Clone, Default)]
pub struct Providers {
	pub embedding: Option<Arc<dyn EmbeddingProvider>>,
	pub rerank: Option<Arc<dyn RerankProvider>>,
}
impl Providers {
	pub fn new(
		embedding: Option<Arc<dyn EmbeddingProvider>>,
		rerank: Option<Arc<dyn RerankProvider>>,
	) -> Self {
		Self { embedding, rerank }
	}

	/// HTTP clients for whichever providers the configuration names.
	pub fn from_config(cfg: &Config) -> Result<Self> {
		let embedding = match cfg.providers.embedding.clone() {
			Some(provider) => Some(Arc::new(sources::HttpEmbedding::new(provider)?)
				as Arc<dyn EmbeddingProvider>),
			None => None,
		};
		let rerank = match cfg.providers.rerank.clone() {
			Some(provider) =>
				Some(Arc::new(sources::HttpRerank::new(provider)?) as Arc<dyn RerankProvider>),
			None => None,
		};

		Ok(Self { embedding, rerank })
	}
}

pub struct AfsService {
	pub cfg: Config,
	pub sources: Sources,
	pub providers: Providers,
}
impl AfsService {
	/// Wires the Postgres, Qdrant, and HTTP provider defaults.
	pub fn new(cfg: Config, db: Db, qdrant: Option<QdrantStore>) -> Result<Self> {
		let providers = Providers::from_config(&cfg)?;
		let sources = sources::default_sources(&cfg, db, qdrant);

		Ok(Self { cfg, sources, providers })
	}

	pub fn with_parts(cfg: Config, sources: Sources, providers: Providers) -> Self {
		Self { cfg, sources, providers }
	}
}
