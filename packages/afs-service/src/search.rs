mod enrich;
mod filter;
mod ranking;
mod result_cache;
mod retrieve;

pub use filter::MetadataFilter;

use std::{
	collections::{BTreeMap, HashMap},
	sync::Arc,
	time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use crate::{AfsService, Error, RerankProvider, Result};
use afs_domain::{
	intent::{QueryIntent, detect_intent},
	params::FusionParameters,
};
use afs_storage::models::{EntityAttributes, EntityId};
use enrich::Evidence;
use ranking::FusedCandidate;
use retrieve::LexicalRetrieval;

const STRATEGY_NAME: &str = "adaptive_fusion";
const NO_TERMS_MARKER: &str = "no valid search terms";

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SearchRequest {
	pub query: String,
	#[serde(default)]
	pub filters: Option<MetadataFilter>,
	/// Loosely typed tuning overrides, see `FusionParameters::from_value`.
	#[serde(default)]
	pub parameters: Option<Value>,
	pub top_k: Option<u32>,
	pub use_cache: Option<bool>,
	pub rerank: Option<bool>,
	pub timeout_ms: Option<u64>,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
	Ok,
	Skipped,
	Unavailable,
	Failed,
}

#[derive(Clone, Debug, Serialize)]
pub struct SearchResponse {
	pub strategy: String,
	pub total_results: usize,
	pub marker: Option<String>,
	pub cache_hit: bool,
	pub insight: String,
	pub query_analysis: QueryAnalysis,
	pub parameters_used: FusionParameters,
	pub results: Vec<SearchItem>,
	pub debug: SearchDebug,
}
impl SearchResponse {
	fn new(query: &str, terms: &[String], params: FusionParameters) -> Self {
		Self {
			strategy: STRATEGY_NAME.to_string(),
			total_results: 0,
			marker: None,
			cache_hit: false,
			insight: String::new(),
			query_analysis: QueryAnalysis {
				original_query: query.to_string(),
				extracted_keywords: terms.to_vec(),
				detected_intent: detect_intent(terms),
			},
			parameters_used: params,
			results: Vec::new(),
			debug: SearchDebug::default(),
		}
	}

	fn finish(mut self, started: Instant) -> Self {
		self.total_results = self.results.len();
		self.debug.execution_time_ms = started.elapsed().as_secs_f64() * 1_000.0;

		self
	}
}

#[derive(Clone, Debug, Serialize)]
pub struct QueryAnalysis {
	pub original_query: String,
	pub extracted_keywords: Vec<String>,
	pub detected_intent: QueryIntent,
}

/// Per-stage counts so callers can spot silent degradation.
#[derive(Clone, Debug, Serialize)]
pub struct SearchDebug {
	pub lexical_candidates: usize,
	pub vector_candidates: usize,
	pub fused_candidates: usize,
	pub after_filtering: usize,
	pub lexical_status: SourceStatus,
	pub vector_status: SourceStatus,
	/// True when the lexical prefilter matched more chunks than it was allowed to fetch.
	pub lexical_truncated: bool,
	/// False when the attribute fetch for boosts or filtering failed.
	pub attributes_available: bool,
	pub cache_similarity: Option<f32>,
	pub execution_time_ms: f64,
}
impl Default for SearchDebug {
	fn default() -> Self {
		Self {
			lexical_candidates: 0,
			vector_candidates: 0,
			fused_candidates: 0,
			after_filtering: 0,
			lexical_status: SourceStatus::Skipped,
			vector_status: SourceStatus::Skipped,
			lexical_truncated: false,
			attributes_available: true,
			cache_similarity: None,
			execution_time_ms: 0.0,
		}
	}
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SearchItem {
	pub rank: u32,
	pub profile: ProfileSummary,
	pub scores: ScoreBreakdown,
	pub match_details: MatchDetails,
	pub content_preview: String,
	pub highlighted_preview: String,
	pub match_insight: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ProfileSummary {
	pub id: EntityId,
	pub name: Option<String>,
	pub email: Option<String>,
	pub branch: Option<String>,
	pub semester: Option<i32>,
	pub cgpa: Option<f32>,
	pub location: Option<String>,
	pub tenant_name: Option<String>,
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub updated_at: Option<OffsetDateTime>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ScoreBreakdown {
	pub final_score: f32,
	pub lexical_score: f32,
	pub lexical_normalized: f32,
	pub vector_score: f32,
	pub base_fusion_score: f32,
	pub skill_boost: f32,
	pub recency_boost: f32,
	pub rerank_score: Option<f32>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct MatchDetails {
	pub matched_chunk_types: Vec<String>,
	pub keywords_found: Vec<String>,
	pub term_contributions: BTreeMap<String, f32>,
	pub vector_similarity: Option<f32>,
	pub top_skills: Vec<TopSkill>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TopSkill {
	pub name: String,
	pub domain: Option<String>,
	pub score: f32,
}

impl AfsService {
	/// Runs the full retrieval, fusion, and ranking pipeline under the request deadline.
	///
	/// Dropping the pipeline on timeout cancels any in-flight retrieval work.
	pub async fn search(&self, req: SearchRequest) -> Result<SearchResponse> {
		let timeout_ms = req.timeout_ms.filter(|ms| *ms > 0).unwrap_or(self.cfg.search.timeout_ms);

		match tokio::time::timeout(Duration::from_millis(timeout_ms), self.run_search(req)).await {
			Ok(result) => result,
			Err(_) => {
				tracing::warn!(timeout_ms, "Search exceeded its deadline.");

				Err(Error::Timeout { timeout_ms })
			},
		}
	}

	async fn run_search(&self, req: SearchRequest) -> Result<SearchResponse> {
		let started = Instant::now();
		let defaults = FusionParameters::from_ranking(&self.cfg.ranking);
		let params = FusionParameters::from_value(req.parameters.as_ref(), &defaults);
		let top_k = resolve_top_k(req.top_k, self.cfg.search.default_top_k, self.cfg.search.max_top_k);
		let filter = req.filters.clone().unwrap_or_default().normalized();
		let terms = ranking::query_terms(&req.query);
		let cache_key_prefix = ranking::cache_key_prefix(&req.query);
		let mut response = SearchResponse::new(&req.query, &terms, params.clone());

		if terms.is_empty() {
			tracing::info!(
				cache_key_prefix = cache_key_prefix.as_str(),
				"Query has no valid search terms."
			);

			response.marker = Some(NO_TERMS_MARKER.to_string());
			response.insight = "The query contains no searchable terms.".to_string();

			return Ok(response.finish(started));
		}

		let cache_eligible = req.use_cache.unwrap_or(true)
			&& self.cfg.search.cache.enabled
			&& filter.is_empty()
			&& self.sources.cache.is_some()
			&& self.providers.embedding.is_some();
		let wants_vector = params.vector_weight > 0.0 && self.sources.vector.is_some();
		let chunk_types = filter.chunk_types();
		let lexical = self.lexical_path(&terms, &params, chunk_types, &cache_key_prefix);

		tokio::pin!(lexical);

		let mut lexical_early = None;
		// The lexical path makes progress while the query is embedded and the cache consulted. A
		// cache hit drops it.
		let embedding = if cache_eligible {
			let lookup = self.embed_and_lookup(&req.query, &params, top_k, &cache_key_prefix);

			tokio::pin!(lookup);

			let (embedding, hit) = tokio::select! {
				biased;

				out = &mut lookup => out,
				retrieval = &mut lexical => {
					lexical_early = Some(retrieval);

					lookup.await
				},
			};

			if let Some(hit) = hit {
				response.cache_hit = true;
				response.insight = hit.insight;
				response.results = hit.items;
				response.debug.cache_similarity = Some(hit.similarity);

				return Ok(response.finish(started));
			}

			embedding
		} else {
			None
		};
		let lexical = async {
			match lexical_early {
				Some(retrieval) => retrieval,
				None => lexical.await,
			}
		};
		let vector = async {
			if embedding.is_none() && wants_vector {
				let late = self.embed_query(&req.query, &cache_key_prefix).await;

				self.vector_path(late.as_ref(), &params, chunk_types, &cache_key_prefix).await
			} else {
				self.vector_path(embedding.as_ref(), &params, chunk_types, &cache_key_prefix)
					.await
			}
		};
		let (lexical, vector) = tokio::join!(lexical, vector);
		let query_vector = match &embedding {
			Some(Ok(vector)) => Some(vector.as_slice()),
			_ => None,
		};
		let LexicalRetrieval { outcome: lexical, truncated: lexical_truncated } = lexical;

		response.debug.lexical_truncated = lexical_truncated;
		response.debug.lexical_status = lexical.status();
		response.debug.vector_status = vector.status();

		if !lexical.succeeded() && !vector.succeeded() && (lexical.failed() || vector.failed()) {
			let message = [("lexical", lexical.error()), ("vector", vector.error())]
				.into_iter()
				.filter_map(|(source, err)| err.map(|err| format!("{source}: {err}")))
				.collect::<Vec<_>>()
				.join("; ");

			return Err(Error::Retrieval { message });
		}

		let lexical = lexical.into_candidates();
		let vector = vector.into_candidates();
		let mut fused = ranking::fuse(&lexical, &vector, &params);

		response.debug.lexical_candidates = lexical.len();
		response.debug.vector_candidates = vector.len();
		response.debug.fused_candidates = fused.len();

		if fused.is_empty() {
			response.insight = "No profiles matched the query.".to_string();

			return Ok(response.finish(started));
		}

		let needs_attributes = params.skill_boost_factor > 0.0
			|| params.recency_boost_factor > 0.0
			|| filter.has_attribute_criteria();
		let attributes = if needs_attributes {
			self.fetch_fused_attributes(&fused, &cache_key_prefix).await
		} else {
			None
		};

		response.debug.attributes_available = !needs_attributes || attributes.is_some();

		if let Some(attributes) = attributes.as_ref() {
			let now = OffsetDateTime::now_utc();

			if params.skill_boost_factor > 0.0 {
				ranking::apply_skill_boost(&mut fused, attributes, params.skill_boost_factor);
			}
			if params.recency_boost_factor > 0.0 {
				ranking::apply_recency_boost(&mut fused, attributes, now, params.recency_boost_factor);
			}
		}
		if filter.has_attribute_criteria() {
			fused.retain(|candidate| {
				filter.matches(attributes.as_ref().and_then(|attrs| attrs.get(&candidate.entity_id)))
			});
		}

		response.debug.after_filtering = fused.len();

		fused.truncate(top_k);

		let evidence = enrich::evidence_map(&lexical, &vector);

		if req.rerank.unwrap_or(false)
			&& let Some(reranker) = self.providers.rerank.as_ref()
		{
			rerank(reranker, &req.query, &mut fused, &evidence, &cache_key_prefix).await;
		}

		let profiles = match attributes {
			Some(attributes) => attributes,
			None => {
				let ids: Vec<EntityId> = fused.iter().map(|candidate| candidate.entity_id).collect();

				self.sources.attributes.fetch_attributes(&ids).await?
			},
		};

		response.results = fused
			.iter()
			.enumerate()
			.map(|(idx, candidate)| {
				enrich::build_item(
					idx as u32 + 1,
					candidate,
					evidence.get(&candidate.entity_id),
					profiles.get(&candidate.entity_id),
					&terms,
				)
			})
			.collect();
		response.insight = summary_insight(response.results.len(), &params);

		if cache_eligible
			&& !response.results.is_empty()
			&& let Some(vector) = query_vector
		{
			self.store_cache(
				&req.query,
				vector,
				&params,
				&response.results,
				&response.insight,
				&cache_key_prefix,
			)
			.await;
		}

		let response = response.finish(started);

		tracing::info!(
			cache_key_prefix = cache_key_prefix.as_str(),
			lexical_candidates = response.debug.lexical_candidates,
			vector_candidates = response.debug.vector_candidates,
			fused_candidates = response.debug.fused_candidates,
			results = response.total_results,
			elapsed_ms = response.debug.execution_time_ms,
			"Search completed."
		);

		Ok(response)
	}

	/// `None` when no embedding provider is configured.
	async fn embed_query(&self, query: &str, cache_key_prefix: &str) -> Option<Result<Vec<f32>>> {
		let provider = self.providers.embedding.as_ref()?;
		let texts = [query.trim().to_string()];
		let result = provider.embed(&texts).await.and_then(|vectors| {
			vectors.into_iter().next().filter(|vector| !vector.is_empty()).ok_or_else(|| {
				Error::Provider { message: "Embedding provider returned no vector.".to_string() }
			})
		});

		if let Err(err) = &result {
			tracing::warn!(cache_key_prefix, error = %err, "Query embedding failed.");
		}

		Some(result)
	}

	async fn fetch_fused_attributes(
		&self,
		fused: &[FusedCandidate],
		cache_key_prefix: &str,
	) -> Option<HashMap<EntityId, EntityAttributes>> {
		let ids: Vec<EntityId> = fused.iter().map(|candidate| candidate.entity_id).collect();

		match self.sources.attributes.fetch_attributes(&ids).await {
			Ok(attributes) => Some(attributes),
			Err(err) => {
				tracing::warn!(
					cache_key_prefix,
					error = %err,
					"Attribute fetch failed. Boosts are disabled for this search."
				);

				None
			},
		}
	}
}

/// Reorders by rerank score. Ties keep the fused order. Failures leave the order untouched.
async fn rerank(
	reranker: &Arc<dyn RerankProvider>,
	query: &str,
	candidates: &mut [FusedCandidate],
	evidence: &HashMap<EntityId, Evidence<'_>>,
	cache_key_prefix: &str,
) {
	if candidates.is_empty() {
		return;
	}

	let docs: Vec<String> = candidates
		.iter()
		.map(|candidate| {
			evidence.get(&candidate.entity_id).map(|e| e.content().to_string()).unwrap_or_default()
		})
		.collect();

	match reranker.rerank(query, &docs).await {
		Ok(scores) if scores.len() == candidates.len() => {
			for (candidate, score) in candidates.iter_mut().zip(scores) {
				candidate.rerank_score = Some(score);
			}

			candidates.sort_by(|left, right| {
				ranking::cmp_f32_desc(
					left.rerank_score.unwrap_or(f32::NEG_INFINITY),
					right.rerank_score.unwrap_or(f32::NEG_INFINITY),
				)
			});
		},
		Ok(scores) => {
			tracing::warn!(
				cache_key_prefix,
				expected = candidates.len(),
				got = scores.len(),
				"Rerank returned a mismatched score count. Keeping fused order."
			);
		},
		Err(err) => {
			tracing::warn!(cache_key_prefix, error = %err, "Rerank failed. Keeping fused order.");
		},
	}
}

fn resolve_top_k(requested: Option<u32>, default_top_k: u32, max_top_k: u32) -> usize {
	let max_top_k = max_top_k.max(1);

	requested.unwrap_or(default_top_k).clamp(1, max_top_k) as usize
}

fn summary_insight(count: usize, params: &FusionParameters) -> String {
	format!(
		"Found {count} profiles with {} fusion (lexical {:.2} / vector {:.2}).",
		params.fusion_method.as_str(),
		params.lexical_weight,
		params.vector_weight
	)
}
