//! Default collaborator implementations backed by Postgres, Qdrant, and HTTP providers.

use std::{collections::HashMap, sync::Arc};

use sqlx::PgPool;
use time::{Duration, OffsetDateTime};

use crate::{
	AttributeStore, BoxFuture, EmbeddingProvider, LexicalCorpus, RerankProvider, Result,
	ResultCacheStore, Sources, VectorIndex,
};
use afs_config::{Config, EmbeddingProviderConfig, ProviderConfig};
use afs_providers::{embedding::EmbeddingClient, rerank::RerankClient};
use afs_storage::{
	db::Db,
	models::{CachedEntry, CandidateChunks, EntityAttributes, EntityId, NewCacheEntry, VectorHit},
	qdrant::QdrantStore,
	queries,
};

/// The vector path is only wired when Qdrant is configured.
pub fn default_sources(cfg: &Config, db: Db, qdrant: Option<QdrantStore>) -> Sources {
	let pool = db.pool;
	let vector = qdrant.map(|store| Arc::new(QdrantVectors { store }) as Arc<dyn VectorIndex>);
	let cache = cfg.search.cache.enabled.then(|| {
		Arc::new(PgResultCache {
			pool: pool.clone(),
			max_entries: i64::from(cfg.search.cache.max_entries),
			ttl_days: cfg.search.cache.ttl_days,
		}) as Arc<dyn ResultCacheStore>
	});

	Sources {
		lexical: Arc::new(PgCorpus {
			pool: pool.clone(),
			fetch_limit: i64::from(cfg.search.lexical_fetch_limit),
		}),
		vector,
		attributes: Arc::new(PgAttributes { pool }),
		cache,
	}
}

pub struct PgCorpus {
	pub pool: PgPool,
	pub fetch_limit: i64,
}
impl LexicalCorpus for PgCorpus {
	fn total_docs<'a>(&'a self, chunk_types: Option<&'a [String]>) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move {
			let count = queries::count_chunks(&self.pool, chunk_types).await?;

			Ok(u64::try_from(count).unwrap_or_default())
		})
	}

	fn avg_doc_length<'a>(
		&'a self,
		chunk_types: Option<&'a [String]>,
	) -> BoxFuture<'a, Result<f64>> {
		Box::pin(async move { Ok(queries::avg_chunk_length(&self.pool, chunk_types).await?) })
	}

	fn doc_frequency<'a>(
		&'a self,
		term: &'a str,
		chunk_types: Option<&'a [String]>,
	) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move {
			let count = queries::count_chunks_with_term(&self.pool, term, chunk_types).await?;

			Ok(u64::try_from(count).unwrap_or_default())
		})
	}

	fn fetch_candidates<'a>(
		&'a self,
		terms: &'a [String],
		chunk_types: Option<&'a [String]>,
	) -> BoxFuture<'a, Result<CandidateChunks>> {
		Box::pin(async move {
			Ok(queries::fetch_chunks_matching_any(&self.pool, terms, chunk_types, self.fetch_limit)
				.await?)
		})
	}
}

pub struct PgAttributes {
	pub pool: PgPool,
}
impl AttributeStore for PgAttributes {
	fn fetch_attributes<'a>(
		&'a self,
		entity_ids: &'a [EntityId],
	) -> BoxFuture<'a, Result<HashMap<EntityId, EntityAttributes>>> {
		Box::pin(async move {
			let profiles = queries::fetch_profiles(&self.pool, entity_ids).await?;

			Ok(profiles.into_iter().map(|profile| (profile.entity_id, profile)).collect())
		})
	}
}

/// pgvector-backed result cache. Each insert prunes expired entries and the overflow beyond
/// `max_entries`, oldest first.
pub struct PgResultCache {
	pub pool: PgPool,
	pub max_entries: i64,
	pub ttl_days: i64,
}
impl ResultCacheStore for PgResultCache {
	fn nearest<'a>(
		&'a self,
		embedding: &'a [f32],
		not_before: OffsetDateTime,
	) -> BoxFuture<'a, Result<Option<CachedEntry>>> {
		Box::pin(async move {
			Ok(queries::nearest_cache_entry(&self.pool, embedding, not_before).await?)
		})
	}

	fn insert<'a>(&'a self, entry: &'a NewCacheEntry) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let now = OffsetDateTime::now_utc();

			queries::insert_cache_entry(&self.pool, entry, now).await?;

			let pruned = queries::prune_cache_entries(
				&self.pool,
				self.max_entries,
				now - Duration::days(self.ttl_days),
			)
			.await?;

			if pruned > 0 {
				tracing::debug!(pruned, "Pruned result cache entries.");
			}

			Ok(())
		})
	}
}

pub struct QdrantVectors {
	pub store: QdrantStore,
}
impl VectorIndex for QdrantVectors {
	fn nearest<'a>(
		&'a self,
		embedding: &'a [f32],
		top_k: u32,
		chunk_types: Option<&'a [String]>,
	) -> BoxFuture<'a, Result<Vec<VectorHit>>> {
		Box::pin(async move {
			Ok(self.store.nearest(embedding.to_vec(), u64::from(top_k), chunk_types).await?)
		})
	}
}

pub struct HttpEmbedding {
	client: EmbeddingClient,
}
impl HttpEmbedding {
	pub fn new(cfg: EmbeddingProviderConfig) -> Result<Self> {
		Ok(Self { client: EmbeddingClient::new(cfg)? })
	}
}
impl EmbeddingProvider for HttpEmbedding {
	fn embed<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(async move { Ok(self.client.embed(texts).await?) })
	}
}

pub struct HttpRerank {
	client: RerankClient,
}
impl HttpRerank {
	pub fn new(cfg: ProviderConfig) -> Result<Self> {
		Ok(Self { client: RerankClient::new(cfg)? })
	}
}
impl RerankProvider for HttpRerank {
	fn rerank<'a>(&'a self, query: &'a str, docs: &'a [String]) -> BoxFuture<'a, Result<Vec<f32>>> {
		Box::pin(async move { Ok(self.client.rerank(query, docs).await?) })
	}
}
