use std::{collections::HashMap, sync::Arc};

use tokio::task::JoinSet;

use crate::{
	AfsService, Error, Result,
	search::{
		SourceStatus,
		ranking::{self, LexicalCandidate, VectorCandidate},
	},
};
use afs_domain::params::FusionParameters;

/// Result of one retrieval path. Only `Failed` counts against the request.
pub(super) enum PathOutcome<T> {
	Skipped,
	Unavailable,
	Done(Vec<T>),
	Failed(String),
}
impl<T> PathOutcome<T> {
	pub(super) fn status(&self) -> SourceStatus {
		match self {
			Self::Skipped => SourceStatus::Skipped,
			Self::Unavailable => SourceStatus::Unavailable,
			Self::Done(_) => SourceStatus::Ok,
			Self::Failed(_) => SourceStatus::Failed,
		}
	}

	pub(super) fn succeeded(&self) -> bool {
		matches!(self, Self::Done(_))
	}

	pub(super) fn failed(&self) -> bool {
		matches!(self, Self::Failed(_))
	}

	pub(super) fn error(&self) -> Option<&str> {
		match self {
			Self::Failed(message) => Some(message),
			_ => None,
		}
	}

	pub(super) fn into_candidates(self) -> Vec<T> {
		match self {
			Self::Done(candidates) => candidates,
			_ => Vec::new(),
		}
	}
}

/// Lexical path result plus whether the prefilter hit its fetch limit.
pub(super) struct LexicalRetrieval {
	pub(super) outcome: PathOutcome<LexicalCandidate>,
	pub(super) truncated: bool,
}
impl LexicalRetrieval {
	fn complete(outcome: PathOutcome<LexicalCandidate>) -> Self {
		Self { outcome, truncated: false }
	}
}

impl AfsService {
	pub(super) async fn lexical_path(
		&self,
		terms: &[String],
		params: &FusionParameters,
		chunk_types: Option<&[String]>,
		cache_key_prefix: &str,
	) -> LexicalRetrieval {
		if params.lexical_weight <= 0.0 {
			return LexicalRetrieval::complete(PathOutcome::Skipped);
		}

		match self.lexical_candidates(terms, params, chunk_types).await {
			Ok((candidates, truncated)) => {
				if truncated {
					tracing::warn!(
						cache_key_prefix,
						source = "lexical",
						fetch_limit = self.cfg.search.lexical_fetch_limit,
						"Lexical prefilter hit its fetch limit. Some matching chunks were not scored."
					);
				}

				LexicalRetrieval { outcome: PathOutcome::Done(candidates), truncated }
			},
			Err(err) => {
				tracing::warn!(
					cache_key_prefix,
					source = "lexical",
					error = %err,
					"Candidate source failed."
				);

				LexicalRetrieval::complete(PathOutcome::Failed(err.to_string()))
			},
		}
	}

	pub(super) async fn vector_path(
		&self,
		embedding: Option<&Result<Vec<f32>>>,
		params: &FusionParameters,
		chunk_types: Option<&[String]>,
		cache_key_prefix: &str,
	) -> PathOutcome<VectorCandidate> {
		if params.vector_weight <= 0.0 {
			return PathOutcome::Skipped;
		}

		let (Some(index), Some(embedding)) = (self.sources.vector.as_ref(), embedding) else {
			return PathOutcome::Unavailable;
		};
		let embedding = match embedding {
			Ok(embedding) => embedding,
			Err(err) => return PathOutcome::Failed(err.to_string()),
		};
		let candidate_k = self.cfg.search.candidate_k;

		match index.nearest(embedding, candidate_k, chunk_types).await {
			Ok(hits) => PathOutcome::Done(ranking::aggregate_hits(hits, candidate_k as usize)),
			Err(err) => {
				tracing::warn!(
					cache_key_prefix,
					source = "vector",
					error = %err,
					"Candidate source failed."
				);

				PathOutcome::Failed(err.to_string())
			},
		}
	}

	async fn lexical_candidates(
		&self,
		terms: &[String],
		params: &FusionParameters,
		chunk_types: Option<&[String]>,
	) -> Result<(Vec<LexicalCandidate>, bool)> {
		let corpus = &self.sources.lexical;
		let (total_docs, avg_doc_length) =
			tokio::try_join!(corpus.total_docs(chunk_types), corpus.avg_doc_length(chunk_types))?;

		if total_docs == 0 {
			return Ok((Vec::new(), false));
		}

		let idf_table = self.idf_table(terms, total_docs, chunk_types).await?;
		let fetched = corpus.fetch_candidates(terms, chunk_types).await?;
		let chunks = fetched
			.docs
			.iter()
			.filter_map(|doc| {
				ranking::score_document(doc, terms, &idf_table, params.k1, params.b, avg_doc_length)
			})
			.collect();
		let candidates = ranking::aggregate_by_entity(chunks, self.cfg.search.candidate_k as usize);

		Ok((candidates, fetched.truncated))
	}

	/// One document-frequency lookup per term, at most `term_concurrency` in flight.
	async fn idf_table(
		&self,
		terms: &[String],
		total_docs: u64,
		chunk_types: Option<&[String]>,
	) -> Result<HashMap<String, f32>> {
		let limit = self.cfg.search.term_concurrency.max(1) as usize;
		let chunk_types = chunk_types.map(<[String]>::to_vec);
		let mut pending = terms.iter();
		let mut tasks = JoinSet::new();
		let mut table = HashMap::with_capacity(terms.len());

		loop {
			while tasks.len() < limit
				&& let Some(term) = pending.next()
			{
				let corpus = Arc::clone(&self.sources.lexical);
				let term = term.clone();
				let chunk_types = chunk_types.clone();

				tasks.spawn(async move {
					let frequency = corpus.doc_frequency(&term, chunk_types.as_deref()).await;

					(term, frequency)
				});
			}

			let Some(joined) = tasks.join_next().await else {
				break;
			};
			let (term, frequency) = joined.map_err(|err| Error::Retrieval {
				message: format!("Term statistics task failed: {err}"),
			})?;

			table.insert(term, ranking::idf(total_docs, frequency?));
		}

		Ok(table)
	}
}
