use std::collections::BTreeMap;

use afs_storage::models::{EntityId, VectorHit};

use super::fusion::cmp_f32_desc;

#[derive(Clone, Debug)]
pub struct VectorCandidate {
	pub entity_id: EntityId,
	/// Raw cosine similarity of the best chunk.
	pub similarity: f32,
	/// `similarity` clamped to `[0, 1]` for fusion.
	pub score: f32,
	pub chunk_type: String,
	pub content: String,
}

/// Collapses chunk hits to one candidate per entity using the maximum similarity.
pub fn aggregate_hits(hits: Vec<VectorHit>, limit: usize) -> Vec<VectorCandidate> {
	let mut by_entity: BTreeMap<EntityId, VectorCandidate> = BTreeMap::new();

	for hit in hits {
		if !hit.similarity.is_finite() {
			continue;
		}

		match by_entity.get_mut(&hit.entity_id) {
			Some(existing) if existing.similarity >= hit.similarity => {},
			Some(existing) => {
				existing.similarity = hit.similarity;
				existing.chunk_type = hit.chunk_type;
				existing.content = hit.content;
			},
			None => {
				by_entity.insert(
					hit.entity_id,
					VectorCandidate {
						entity_id: hit.entity_id,
						similarity: hit.similarity,
						score: 0.0,
						chunk_type: hit.chunk_type,
						content: hit.content,
					},
				);
			},
		}
	}

	let mut out: Vec<_> = by_entity
		.into_values()
		.map(|mut candidate| {
			candidate.score = candidate.similarity.clamp(0.0, 1.0);

			candidate
		})
		.collect();

	out.sort_by(|left, right| {
		cmp_f32_desc(left.score, right.score).then_with(|| left.entity_id.cmp(&right.entity_id))
	});
	out.truncate(limit);

	out
}
