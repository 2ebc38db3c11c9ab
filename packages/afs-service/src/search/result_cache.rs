use time::{Duration, OffsetDateTime};

use crate::{
	AfsService, Result,
	search::{SearchItem, ranking},
};
use afs_domain::params::FusionParameters;
use afs_storage::models::NewCacheEntry;

pub(super) struct CacheHit {
	pub(super) items: Vec<SearchItem>,
	pub(super) insight: String,
	pub(super) similarity: f32,
}

impl AfsService {
	/// Embeds the query and, when that succeeds, looks for a near-duplicate cached search.
	pub(super) async fn embed_and_lookup(
		&self,
		query: &str,
		params: &FusionParameters,
		top_k: usize,
		cache_key_prefix: &str,
	) -> (Option<Result<Vec<f32>>>, Option<CacheHit>) {
		let embedding = self.embed_query(query, cache_key_prefix).await;
		let hit = match &embedding {
			Some(Ok(vector)) => self.lookup_cache(vector, params, top_k, cache_key_prefix).await,
			_ => None,
		};

		(embedding, hit)
	}

	/// Best-effort lookup. Every failure is logged and reported as a miss.
	async fn lookup_cache(
		&self,
		embedding: &[f32],
		params: &FusionParameters,
		top_k: usize,
		cache_key_prefix: &str,
	) -> Option<CacheHit> {
		let store = self.sources.cache.as_ref()?;
		let not_before =
			OffsetDateTime::now_utc() - Duration::days(self.cfg.search.cache.ttl_days);
		let entry = match store.nearest(embedding, not_before).await {
			Ok(Some(entry)) => entry,
			Ok(None) => {
				tracing::info!(cache_key_prefix, "Result cache miss.");

				return None;
			},
			Err(err) => {
				tracing::warn!(cache_key_prefix, error = %err, "Result cache lookup failed.");

				return None;
			},
		};
		let threshold = self.cfg.search.cache.similarity_threshold;

		if !ranking::is_cache_hit(entry.similarity, threshold)
			|| entry.strategy != ranking::strategy_tag(params.fusion_method)
		{
			tracing::info!(
				cache_key_prefix,
				similarity = entry.similarity,
				strategy = entry.strategy.as_str(),
				"Result cache miss."
			);

			return None;
		}

		let mut items: Vec<SearchItem> = match serde_json::from_value(entry.results) {
			Ok(items) => items,
			Err(err) => {
				tracing::warn!(
					cache_key_prefix,
					cache_id = %entry.cache_id,
					error = %err,
					"Cached results could not be decoded."
				);

				return None;
			},
		};

		items.truncate(top_k);
		ranking::mark_cache_hit(&mut items);

		tracing::info!(cache_key_prefix, similarity = entry.similarity, "Result cache hit.");

		Some(CacheHit { items, insight: entry.insight, similarity: entry.similarity })
	}

	/// Best-effort store. Failures are logged and never reach the caller.
	pub(super) async fn store_cache(
		&self,
		query: &str,
		embedding: &[f32],
		params: &FusionParameters,
		items: &[SearchItem],
		insight: &str,
		cache_key_prefix: &str,
	) {
		let Some(store) = self.sources.cache.as_ref() else {
			return;
		};
		let results = match serde_json::to_value(items) {
			Ok(results) => results,
			Err(err) => {
				tracing::warn!(cache_key_prefix, error = %err, "Failed to encode results for caching.");

				return;
			},
		};
		let entry = NewCacheEntry {
			query_text: query.trim().to_string(),
			embedding: embedding.to_vec(),
			strategy: ranking::strategy_tag(params.fusion_method),
			results,
			insight: insight.to_string(),
		};

		match store.insert(&entry).await {
			Ok(()) => tracing::info!(cache_key_prefix, "Stored result cache entry."),
			Err(err) => {
				tracing::warn!(cache_key_prefix, error = %err, "Result cache store failed.");
			},
		}
	}
}
