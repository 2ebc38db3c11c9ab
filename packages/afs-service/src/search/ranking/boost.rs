use std::collections::HashMap;

use time::OffsetDateTime;

use afs_storage::models::{EntityAttributes, EntityId, SkillScore};

use super::fusion::{FusedCandidate, sort_by_final_score};

const SKILL_SCORE_SCALE: f32 = 10.0;
const RECENCY_WINDOW_DAYS: f32 = 365.0;

/// Mean proficiency on a 0-1 scale times `factor`. No skills means no boost.
pub fn skill_boost(skills: &[SkillScore], factor: f32) -> f32 {
	if skills.is_empty() || factor <= 0.0 {
		return 0.0;
	}

	let mean = skills.iter().map(|skill| skill.score).sum::<f32>() / skills.len() as f32;

	(mean / SKILL_SCORE_SCALE).clamp(0.0, 1.0) * factor
}

/// Linear decay to zero over a year. Future timestamps count as fresh.
pub fn recency_boost(updated_at: Option<OffsetDateTime>, now: OffsetDateTime, factor: f32) -> f32 {
	let Some(updated_at) = updated_at else {
		return 0.0;
	};

	if factor <= 0.0 {
		return 0.0;
	}

	let days = (now - updated_at).whole_days().max(0) as f32;

	(1.0 - days / RECENCY_WINDOW_DAYS).max(0.0) * factor
}

pub fn apply_skill_boost(
	candidates: &mut [FusedCandidate],
	attributes: &HashMap<EntityId, EntityAttributes>,
	factor: f32,
) {
	for candidate in candidates.iter_mut() {
		candidate.skill_boost = attributes
			.get(&candidate.entity_id)
			.map(|attrs| skill_boost(&attrs.skills, factor))
			.unwrap_or(0.0);

		candidate.refresh_final_score();
	}

	sort_by_final_score(candidates);
}

pub fn apply_recency_boost(
	candidates: &mut [FusedCandidate],
	attributes: &HashMap<EntityId, EntityAttributes>,
	now: OffsetDateTime,
	factor: f32,
) {
	for candidate in candidates.iter_mut() {
		candidate.recency_boost = attributes
			.get(&candidate.entity_id)
			.map(|attrs| recency_boost(attrs.updated_at, now, factor))
			.unwrap_or(0.0);

		candidate.refresh_final_score();
	}

	sort_by_final_score(candidates);
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;

	use time::{Duration, macros::datetime};
	use uuid::Uuid;

	use afs_storage::models::{EntityAttributes, SkillScore};

	use crate::search::ranking::{
		boost::{apply_recency_boost, apply_skill_boost, recency_boost, skill_boost},
		fusion::FusedCandidate,
	};

	fn skill(score: f32) -> SkillScore {
		SkillScore { name: format!("skill-{score}"), domain: None, score }
	}

	fn candidate(entity: u128, base: f32) -> FusedCandidate {
		FusedCandidate {
			entity_id: Uuid::from_u128(entity),
			lexical_score: 0.0,
			lexical_normalized: 0.0,
			vector_score: 0.0,
			base_fusion_score: base,
			skill_boost: 0.0,
			recency_boost: 0.0,
			rerank_score: None,
			final_score: base,
		}
	}

	#[test]
	fn skill_boost_averages_on_a_ten_point_scale() {
		assert!((skill_boost(&[skill(8.0), skill(6.0)], 0.5) - 0.35).abs() < 1e-6);
		assert_eq!(skill_boost(&[], 0.5), 0.0);
		assert_eq!(skill_boost(&[skill(9.0)], 0.0), 0.0);
		assert_eq!(skill_boost(&[skill(25.0)], 0.3), 0.3);
	}

	#[test]
	fn recency_boost_decays_over_a_year() {
		let now = datetime!(2025-06-01 00:00 UTC);

		assert_eq!(recency_boost(Some(now), now, 0.4), 0.4);
		assert_eq!(recency_boost(Some(now - Duration::days(400)), now, 0.4), 0.0);
		assert_eq!(recency_boost(Some(now + Duration::days(3)), now, 0.4), 0.4);
		assert_eq!(recency_boost(None, now, 0.4), 0.0);

		let half = recency_boost(Some(now - Duration::days(73)), now, 1.0);

		assert!((half - 0.8).abs() < 1e-6);
	}

	#[test]
	fn boost_passes_commute() {
		let now = datetime!(2025-06-01 00:00 UTC);
		let attributes = HashMap::from([
			(
				Uuid::from_u128(1),
				EntityAttributes {
					entity_id: Uuid::from_u128(1),
					skills: vec![skill(3.0)],
					updated_at: Some(now - Duration::days(10)),
					..Default::default()
				},
			),
			(
				Uuid::from_u128(2),
				EntityAttributes {
					entity_id: Uuid::from_u128(2),
					skills: vec![skill(9.0), skill(7.0)],
					updated_at: Some(now - Duration::days(200)),
					..Default::default()
				},
			),
		]);
		let base = vec![candidate(1, 0.61), candidate(2, 0.4), candidate(3, 0.55)];
		let mut skill_first = base.clone();
		let mut recency_first = base;

		apply_skill_boost(&mut skill_first, &attributes, 0.3);
		apply_recency_boost(&mut skill_first, &attributes, now, 0.2);
		apply_recency_boost(&mut recency_first, &attributes, now, 0.2);
		apply_skill_boost(&mut recency_first, &attributes, 0.3);

		assert_eq!(skill_first, recency_first);
		assert_eq!(skill_first.last().map(|c| c.entity_id), Some(Uuid::from_u128(3)));
	}
}
