use std::collections::{BTreeMap, BTreeSet, HashMap};

use afs_storage::models::{EntityId, LexicalDocument};

use super::{fusion::cmp_f32_desc, text::tokenize};

/// One chunk that matched at least one query term with a positive contribution.
#[derive(Clone, Debug)]
pub struct ScoredChunk {
	pub entity_id: EntityId,
	pub chunk_type: String,
	pub content: String,
	pub score: f32,
	pub term_contributions: BTreeMap<String, f32>,
}

/// Entity-level lexical evidence. Scores and contributions are summed over matching chunks.
#[derive(Clone, Debug)]
pub struct LexicalCandidate {
	pub entity_id: EntityId,
	pub score: f32,
	pub matched_chunk_types: BTreeSet<String>,
	pub term_contributions: BTreeMap<String, f32>,
	/// Content of the highest scoring chunk.
	pub best_content: String,
	best_chunk_score: f32,
}

/// `ln((N - n + 0.5) / (n + 0.5) + 1)`, or zero when the term is absent from the corpus.
pub fn idf(total_docs: u64, doc_frequency: u64) -> f32 {
	if total_docs == 0 || doc_frequency == 0 {
		return 0.0;
	}

	let total = total_docs as f64;
	let frequency = doc_frequency as f64;
	let value = ((total - frequency + 0.5) / (frequency + 0.5) + 1.0).ln();

	if value.is_finite() && value > 0.0 { value as f32 } else { 0.0 }
}

/// Scores one chunk against `terms`. Returns `None` when no term contributes.
pub fn score_document(
	doc: &LexicalDocument,
	terms: &[String],
	idf_table: &HashMap<String, f32>,
	k1: f32,
	b: f32,
	avg_doc_length: f64,
) -> Option<ScoredChunk> {
	let tokens = tokenize(&doc.content);
	let doc_len = doc.content.split_whitespace().count() as f64;
	let length_ratio = if avg_doc_length > 0.0 { (doc_len / avg_doc_length) as f32 } else { 1.0 };
	let denominator = k1 * (1.0 - b + b * length_ratio);
	let mut term_contributions = BTreeMap::new();
	let mut score = 0.0_f32;

	for term in terms {
		let tf = tokens.iter().filter(|token| *token == term).count() as f32;

		if tf == 0.0 {
			continue;
		}

		let idf = idf_table.get(term).copied().unwrap_or(0.0);
		let contribution = idf * (tf * (k1 + 1.0)) / (tf + denominator);

		if contribution.is_finite() && contribution > 0.0 {
			score += contribution;

			term_contributions.insert(term.clone(), contribution);
		}
	}

	if score > 0.0 {
		Some(ScoredChunk {
			entity_id: doc.entity_id,
			chunk_type: doc.chunk_type.clone(),
			content: doc.content.clone(),
			score,
			term_contributions,
		})
	} else {
		None
	}
}

/// Rolls chunk scores up to entities, best first, keeping at most `limit`.
pub fn aggregate_by_entity(chunks: Vec<ScoredChunk>, limit: usize) -> Vec<LexicalCandidate> {
	let mut by_entity: BTreeMap<EntityId, LexicalCandidate> = BTreeMap::new();

	for chunk in chunks {
		let entry = by_entity.entry(chunk.entity_id).or_insert_with(|| LexicalCandidate {
			entity_id: chunk.entity_id,
			score: 0.0,
			matched_chunk_types: BTreeSet::new(),
			term_contributions: BTreeMap::new(),
			best_content: String::new(),
			best_chunk_score: f32::NEG_INFINITY,
		});

		entry.score += chunk.score;

		entry.matched_chunk_types.insert(chunk.chunk_type);

		for (term, contribution) in chunk.term_contributions {
			*entry.term_contributions.entry(term).or_insert(0.0) += contribution;
		}

		if chunk.score > entry.best_chunk_score {
			entry.best_chunk_score = chunk.score;
			entry.best_content = chunk.content;
		}
	}

	let mut out: Vec<_> = by_entity.into_values().collect();

	out.sort_by(|left, right| {
		cmp_f32_desc(left.score, right.score).then_with(|| left.entity_id.cmp(&right.entity_id))
	});
	out.truncate(limit);

	out
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;

	use uuid::Uuid;

	use afs_storage::models::LexicalDocument;

	use crate::search::ranking::bm25::{aggregate_by_entity, idf, score_document};

	fn doc(entity: u128, chunk_type: &str, content: String) -> LexicalDocument {
		LexicalDocument {
			chunk_id: Uuid::new_v4(),
			entity_id: Uuid::from_u128(entity),
			chunk_type: chunk_type.to_string(),
			content,
		}
	}

	fn padded(words: &[&str], len: usize) -> String {
		let mut out: Vec<&str> = words.to_vec();

		out.resize(len, "filler");

		out.join(" ")
	}

	fn terms() -> Vec<String> {
		vec!["python".to_string(), "fastapi".to_string()]
	}

	#[test]
	fn idf_is_zero_for_absent_terms() {
		assert_eq!(idf(10, 0), 0.0);
		assert_eq!(idf(0, 0), 0.0);
		assert!(idf(10, 1) > idf(10, 5));
		assert!(idf(3, 3) > 0.0);
	}

	#[test]
	fn two_terms_at_average_length_beat_one_term_in_short_doc() {
		let table = HashMap::from([
			("python".to_string(), idf(3, 2)),
			("fastapi".to_string(), idf(3, 2)),
		]);
		let both = doc(1, "skills", padded(&["python", "fastapi"], 100));
		let one = doc(2, "skills", padded(&["python"], 50));
		let both_score = score_document(&both, &terms(), &table, 1.5, 0.6, 100.0)
			.expect("Expected a score for the two-term document.")
			.score;
		let one_score = score_document(&one, &terms(), &table, 1.5, 0.6, 100.0)
			.expect("Expected a score for the one-term document.")
			.score;

		assert!(both_score > one_score, "{both_score} should beat {one_score}");
	}

	#[test]
	fn documents_without_query_terms_never_score() {
		let table = HashMap::from([("python".to_string(), 1.2), ("fastapi".to_string(), 0.8)]);
		let miss = doc(1, "skills", padded(&["golang", "gin"], 40));

		for (k1, b) in [(1.0, 0.0), (1.5, 0.6), (3.0, 1.0)] {
			assert!(score_document(&miss, &terms(), &table, k1, b, 100.0).is_none());
		}
	}

	#[test]
	fn zero_average_length_disables_length_normalization() {
		let table = HashMap::from([("python".to_string(), 1.0)]);
		let short = doc(1, "skills", padded(&["python"], 5));
		let long = doc(2, "skills", padded(&["python"], 500));
		let short_score = score_document(&short, &terms(), &table, 1.5, 1.0, 0.0)
			.expect("Expected a score.")
			.score;
		let long_score =
			score_document(&long, &terms(), &table, 1.5, 1.0, 0.0).expect("Expected a score.").score;

		assert_eq!(short_score, long_score);
	}

	#[test]
	fn aggregation_sums_chunks_and_unions_types() {
		let table = HashMap::from([("python".to_string(), 1.0), ("fastapi".to_string(), 1.0)]);
		let chunks = vec![
			doc(1, "skills", padded(&["python"], 10)),
			doc(1, "projects", padded(&["python", "fastapi"], 10)),
			doc(2, "skills", padded(&["fastapi"], 10)),
		]
		.iter()
		.filter_map(|doc| score_document(doc, &terms(), &table, 1.5, 0.6, 10.0))
		.collect::<Vec<_>>();
		let chunk_sum: f32 =
			chunks.iter().filter(|chunk| chunk.entity_id == Uuid::from_u128(1)).map(|c| c.score).sum();
		let entities = aggregate_by_entity(chunks, 10);

		assert_eq!(entities.len(), 2);
		assert_eq!(entities[0].entity_id, Uuid::from_u128(1));
		assert_eq!(entities[0].score, chunk_sum);
		assert_eq!(
			entities[0].matched_chunk_types.iter().cloned().collect::<Vec<_>>(),
			vec!["projects".to_string(), "skills".to_string()]
		);
		assert!(entities[0].best_content.contains("fastapi"));
		assert_eq!(entities[0].term_contributions.len(), 2);
	}

	#[test]
	fn aggregation_respects_limit() {
		let table = HashMap::from([("python".to_string(), 1.0)]);
		let chunks = (1..=5)
			.map(|entity| doc(entity, "skills", padded(&["python"], 10)))
			.filter_map(|doc| score_document(&doc, &terms(), &table, 1.5, 0.6, 10.0))
			.collect::<Vec<_>>();
		let entities = aggregate_by_entity(chunks, 3);

		assert_eq!(
			entities.iter().map(|entity| entity.entity_id).collect::<Vec<_>>(),
			vec![Uuid::from_u128(1), Uuid::from_u128(2), Uuid::from_u128(3)]
		);
	}
}
