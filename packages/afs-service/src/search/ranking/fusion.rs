use std::{
	cmp::Ordering,
	collections::{BTreeMap, HashMap},
};

use afs_domain::params::{FusionMethod, FusionParameters};
use afs_storage::models::EntityId;

use super::{bm25::LexicalCandidate, vector::VectorCandidate};

pub const RRF_K: f32 = 60.0;
/// Rank assigned to an entity missing from one of the lists.
pub const RRF_MISSING_RANK: u32 = 1_000;

#[derive(Clone, Debug, PartialEq)]
pub struct FusedCandidate {
	pub entity_id: EntityId,
	pub lexical_score: f32,
	pub lexical_normalized: f32,
	pub vector_score: f32,
	pub base_fusion_score: f32,
	pub skill_boost: f32,
	pub recency_boost: f32,
	pub rerank_score: Option<f32>,
	pub final_score: f32,
}
impl FusedCandidate {
	/// Deltas are summed before being added so the result does not depend on pass order.
	pub fn refresh_final_score(&mut self) {
		self.final_score = self.base_fusion_score + (self.skill_boost + self.recency_boost);
	}
}

/// Merges both lists into their union, ordered by fused score then entity id.
///
/// Inputs must already be sorted best first; list position defines rank for RRF.
pub fn fuse(
	lexical: &[LexicalCandidate],
	vector: &[VectorCandidate],
	params: &FusionParameters,
) -> Vec<FusedCandidate> {
	let max_lexical = lexical.iter().map(|candidate| candidate.score).fold(0.0_f32, f32::max);
	let lexical_ranks = rank_map(lexical.iter().map(|candidate| candidate.entity_id));
	let vector_ranks = rank_map(vector.iter().map(|candidate| candidate.entity_id));
	let lexical_scores: HashMap<_, _> =
		lexical.iter().map(|candidate| (candidate.entity_id, candidate.score)).collect();
	let vector_scores: HashMap<_, _> =
		vector.iter().map(|candidate| (candidate.entity_id, candidate.score)).collect();
	let mut entity_ids: Vec<EntityId> =
		lexical_ranks.keys().chain(vector_ranks.keys()).copied().collect();

	entity_ids.sort();
	entity_ids.dedup();

	let mut out: Vec<FusedCandidate> = entity_ids
		.into_iter()
		.map(|entity_id| {
			let lexical_score = lexical_scores.get(&entity_id).copied().unwrap_or(0.0);
			let lexical_normalized =
				if max_lexical > 0.0 { lexical_score / max_lexical } else { 0.0 };
			let vector_score = vector_scores.get(&entity_id).copied().unwrap_or(0.0);
			let base_fusion_score = match params.fusion_method {
				FusionMethod::WeightedSum =>
					params.lexical_weight * lexical_normalized + params.vector_weight * vector_score,
				FusionMethod::Multiplicative =>
					if lexical_normalized > 0.0 && vector_score > 0.0 {
						lexical_normalized.powf(params.lexical_weight)
							* vector_score.powf(params.vector_weight)
					} else {
						0.0
					},
				FusionMethod::Rrf =>
					rrf_term(params.lexical_weight, lexical_ranks.get(&entity_id).copied())
						+ rrf_term(params.vector_weight, vector_ranks.get(&entity_id).copied()),
			};

			FusedCandidate {
				entity_id,
				lexical_score,
				lexical_normalized,
				vector_score,
				base_fusion_score,
				skill_boost: 0.0,
				recency_boost: 0.0,
				rerank_score: None,
				final_score: base_fusion_score,
			}
		})
		.collect();

	sort_by_final_score(&mut out);

	out
}

pub fn sort_by_final_score(candidates: &mut [FusedCandidate]) {
	candidates.sort_by(|left, right| {
		cmp_f32_desc(left.final_score, right.final_score)
			.then_with(|| left.entity_id.cmp(&right.entity_id))
	});
}

pub fn cmp_f32_desc(a: f32, b: f32) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
	}
}

/// One-based ranks. The first occurrence of an entity wins.
fn rank_map(ids: impl Iterator<Item = EntityId>) -> BTreeMap<EntityId, u32> {
	let mut ranks = BTreeMap::new();

	for (idx, entity_id) in ids.enumerate() {
		ranks.entry(entity_id).or_insert(idx as u32 + 1);
	}

	ranks
}

fn rrf_term(weight: f32, rank: Option<u32>) -> f32 {
	weight / (RRF_K + rank.unwrap_or(RRF_MISSING_RANK) as f32)
}

#[cfg(test)]
mod tests {
	use std::collections::BTreeMap;

	use serde_json::json;
	use uuid::Uuid;

	use afs_domain::params::{FusionMethod, FusionParameters};

	use crate::search::ranking::{
		bm25::{LexicalCandidate, ScoredChunk, aggregate_by_entity},
		fusion::{FusedCandidate, RRF_K, RRF_MISSING_RANK, fuse},
		vector::VectorCandidate,
	};

	fn lexical(entries: &[(u128, f32)]) -> Vec<LexicalCandidate> {
		let chunks = entries
			.iter()
			.map(|(entity, score)| ScoredChunk {
				entity_id: Uuid::from_u128(*entity),
				chunk_type: "skills".to_string(),
				content: "python".to_string(),
				score: *score,
				term_contributions: BTreeMap::from([("python".to_string(), *score)]),
			})
			.collect();

		aggregate_by_entity(chunks, 100)
	}

	fn vector(entries: &[(u128, f32)]) -> Vec<VectorCandidate> {
		entries
			.iter()
			.map(|(entity, score)| VectorCandidate {
				entity_id: Uuid::from_u128(*entity),
				similarity: *score,
				score: *score,
				chunk_type: "skills".to_string(),
				content: String::new(),
			})
			.collect()
	}

	fn params(lexical_weight: f32, vector_weight: f32, method: FusionMethod) -> FusionParameters {
		FusionParameters::new(1.5, 0.6, lexical_weight, vector_weight, 0.0, 0.0, method)
	}

	fn score_of(fused: &[FusedCandidate], entity: u128) -> f32 {
		fused
			.iter()
			.find(|candidate| candidate.entity_id == Uuid::from_u128(entity))
			.map(|candidate| candidate.base_fusion_score)
			.expect("Expected entity in fused output.")
	}

	#[test]
	fn multiplicative_requires_both_signals() {
		let lex = lexical(&[(2, 3.0)]);
		let vec = vector(&[(1, 0.9), (2, 0.5)]);
		let multiplicative = fuse(&lex, &vec, &params(0.5, 0.5, FusionMethod::Multiplicative));
		let weighted = fuse(&lex, &vec, &params(0.5, 0.5, FusionMethod::WeightedSum));

		assert_eq!(score_of(&multiplicative, 1), 0.0);
		assert!((score_of(&weighted, 1) - 0.45).abs() < 1e-6);
		assert!(score_of(&multiplicative, 2) > 0.0);
	}

	#[test]
	fn unnormalized_weights_match_normalized_weights() {
		let lex = lexical(&[(1, 4.0), (2, 2.0), (3, 1.0)]);
		let vec = vector(&[(3, 0.8), (4, 0.6), (1, 0.3)]);
		let defaults = FusionParameters::default();

		for method in ["weighted_sum", "rrf", "multiplicative"] {
			let raw = FusionParameters::from_value(
				Some(&json!({ "lexical_weight": 4, "vector_weight": 1, "fusion_method": method })),
				&defaults,
			);
			let normalized = FusionParameters::from_value(
				Some(&json!({ "lexical_weight": 0.8, "vector_weight": 0.2, "fusion_method": method })),
				&defaults,
			);

			assert_eq!(fuse(&lex, &vec, &raw), fuse(&lex, &vec, &normalized));
		}
	}

	#[test]
	fn rrf_never_decreases_when_rank_improves() {
		let weights = params(0.5, 0.5, FusionMethod::Rrf);
		let mut previous = f32::NEG_INFINITY;

		for position in (0..10).rev() {
			let mut entries: Vec<(u128, f32)> =
				(100..109).map(|entity| (entity, 1.0)).collect();

			entries.insert(position, (1, 1.0));

			let vec = vector(&entries);
			let score = score_of(&fuse(&[], &vec, &weights), 1);

			assert!(score >= previous, "rank {} scored {score} below {previous}", position + 1);

			previous = score;
		}
	}

	#[test]
	fn rrf_gives_missing_entities_a_sentinel_rank() {
		let lex = lexical(&[(1, 2.0)]);
		let vec = vector(&[(2, 0.9)]);
		let fused = fuse(&lex, &vec, &params(0.5, 0.5, FusionMethod::Rrf));
		let expected = 0.5 / (RRF_K + 1.0) + 0.5 / (RRF_K + RRF_MISSING_RANK as f32);

		assert_eq!(fused.len(), 2);
		assert!((score_of(&fused, 1) - expected).abs() < 1e-7);
		assert!((score_of(&fused, 2) - expected).abs() < 1e-7);
		assert_eq!(fused[0].entity_id, Uuid::from_u128(1));
	}

	#[test]
	fn vector_only_fusion_reproduces_vector_order() {
		let lex = lexical(&[(9, 10.0), (1, 1.0)]);
		let vec = vector(&[(3, 0.9), (1, 0.7), (2, 0.7), (4, 0.2)]);
		let fused = fuse(&lex, &vec, &params(0.0, 1.0, FusionMethod::WeightedSum));
		let order: Vec<_> = fused
			.iter()
			.filter(|candidate| candidate.vector_score > 0.0)
			.map(|candidate| candidate.entity_id)
			.collect();

		assert_eq!(order, vec.iter().map(|candidate| candidate.entity_id).collect::<Vec<_>>());
	}

	#[test]
	fn zero_weights_degenerate_to_zero_scores() {
		let fused = fuse(
			&lexical(&[(1, 2.0)]),
			&vector(&[(2, 0.9)]),
			&params(0.0, 0.0, FusionMethod::WeightedSum),
		);

		assert!(fused.iter().all(|candidate| candidate.base_fusion_score == 0.0));
		assert_eq!(fused[0].entity_id, Uuid::from_u128(1));
	}

	#[test]
	fn lexical_scores_are_max_normalized() {
		let fused = fuse(
			&lexical(&[(1, 4.0), (2, 1.0)]),
			&[],
			&params(1.0, 0.0, FusionMethod::WeightedSum),
		);

		assert_eq!(fused[0].lexical_normalized, 1.0);
		assert_eq!(fused[1].lexical_normalized, 0.25);
		assert_eq!(fused[1].lexical_score, 1.0);
	}
}
