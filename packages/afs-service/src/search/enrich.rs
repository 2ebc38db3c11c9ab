use std::collections::{BTreeSet, HashMap};

use afs_storage::models::{EntityAttributes, EntityId, SkillScore};

use crate::search::{
	MatchDetails, ProfileSummary, ScoreBreakdown, SearchItem, TopSkill,
	ranking::{self, FusedCandidate, LexicalCandidate, VectorCandidate},
};

const TOP_SKILLS: usize = 5;
const STRONG_SIGNAL: f32 = 0.7;

/// Retrieval evidence for one entity, borrowed from the candidate lists.
pub(super) struct Evidence<'a> {
	lexical: Option<&'a LexicalCandidate>,
	vector: Option<&'a VectorCandidate>,
}
impl Evidence<'_> {
	/// Best lexical chunk if any, otherwise the best vector chunk.
	pub(super) fn content(&self) -> &str {
		self.lexical
			.map(|candidate| candidate.best_content.as_str())
			.or_else(|| self.vector.map(|candidate| candidate.content.as_str()))
			.unwrap_or_default()
	}
}

pub(super) fn evidence_map<'a>(
	lexical: &'a [LexicalCandidate],
	vector: &'a [VectorCandidate],
) -> HashMap<EntityId, Evidence<'a>> {
	let mut out: HashMap<EntityId, Evidence<'a>> = HashMap::new();

	for candidate in lexical {
		out.entry(candidate.entity_id)
			.or_insert(Evidence { lexical: None, vector: None })
			.lexical = Some(candidate);
	}
	for candidate in vector {
		out.entry(candidate.entity_id)
			.or_insert(Evidence { lexical: None, vector: None })
			.vector = Some(candidate);
	}

	out
}

pub(super) fn build_item(
	rank: u32,
	candidate: &FusedCandidate,
	evidence: Option<&Evidence<'_>>,
	profile: Option<&EntityAttributes>,
	terms: &[String],
) -> SearchItem {
	let lexical = evidence.and_then(|evidence| evidence.lexical);
	let vector = evidence.and_then(|evidence| evidence.vector);
	let mut chunk_types: BTreeSet<String> =
		lexical.map(|candidate| candidate.matched_chunk_types.clone()).unwrap_or_default();

	if let Some(vector) = vector {
		chunk_types.insert(vector.chunk_type.clone());
	}

	let term_contributions = lexical.map(|l| l.term_contributions.clone()).unwrap_or_default();
	let keywords_found: Vec<String> =
		terms.iter().filter(|term| term_contributions.contains_key(*term)).cloned().collect();
	let preview = ranking::content_preview(evidence.map(Evidence::content).unwrap_or_default());
	let highlighted_preview = ranking::highlight(&preview, terms);
	let scores = ScoreBreakdown {
		final_score: candidate.final_score,
		lexical_score: candidate.lexical_score,
		lexical_normalized: candidate.lexical_normalized,
		vector_score: candidate.vector_score,
		base_fusion_score: candidate.base_fusion_score,
		skill_boost: candidate.skill_boost,
		recency_boost: candidate.recency_boost,
		rerank_score: candidate.rerank_score,
	};
	let matched_chunk_types: Vec<String> = chunk_types.into_iter().collect();
	let match_insight = match_insight(&scores, &matched_chunk_types);

	SearchItem {
		rank,
		profile: profile_summary(candidate.entity_id, profile),
		scores,
		match_details: MatchDetails {
			matched_chunk_types,
			keywords_found,
			term_contributions,
			vector_similarity: vector.map(|candidate| candidate.similarity),
			top_skills: profile.map(|profile| top_skills(&profile.skills)).unwrap_or_default(),
		},
		content_preview: preview,
		highlighted_preview,
		match_insight,
	}
}

fn profile_summary(entity_id: EntityId, profile: Option<&EntityAttributes>) -> ProfileSummary {
	let Some(profile) = profile else {
		return ProfileSummary {
			id: entity_id,
			name: None,
			email: None,
			branch: None,
			semester: None,
			cgpa: None,
			location: None,
			tenant_name: None,
			updated_at: None,
		};
	};

	ProfileSummary {
		id: entity_id,
		name: profile.name.clone(),
		email: profile.email.clone(),
		branch: profile.branch.clone(),
		semester: profile.semester,
		cgpa: profile.cgpa,
		location: profile.location.clone(),
		tenant_name: profile.tenant_name.clone(),
		updated_at: profile.updated_at,
	}
}

fn top_skills(skills: &[SkillScore]) -> Vec<TopSkill> {
	let mut sorted: Vec<&SkillScore> = skills.iter().collect();

	sorted.sort_by(|left, right| {
		ranking::cmp_f32_desc(left.score, right.score).then_with(|| left.name.cmp(&right.name))
	});

	sorted
		.into_iter()
		.take(TOP_SKILLS)
		.map(|skill| TopSkill {
			name: skill.name.clone(),
			domain: skill.domain.clone(),
			score: skill.score,
		})
		.collect()
}

fn match_insight(scores: &ScoreBreakdown, chunk_types: &[String]) -> String {
	let mut parts = vec![format!("Final score: {:.2}", scores.final_score)];

	if scores.lexical_normalized > STRONG_SIGNAL {
		parts.push(format!("Strong lexical match (BM25: {:.2})", scores.lexical_normalized));
	} else if scores.lexical_normalized > 0.0 {
		parts.push(format!("Lexical match (BM25: {:.2})", scores.lexical_normalized));
	}
	if scores.vector_score > STRONG_SIGNAL {
		parts.push(format!("Strong semantic alignment (Vector: {:.2})", scores.vector_score));
	} else if scores.vector_score > 0.0 {
		parts.push(format!("Semantic match (Vector: {:.2})", scores.vector_score));
	}
	if scores.skill_boost > 0.0 {
		parts.push(format!("Skill boost: +{:.2}", scores.skill_boost));
	}
	if scores.recency_boost > 0.0 {
		parts.push(format!("Recency boost: +{:.2}", scores.recency_boost));
	}
	if let Some(rerank_score) = scores.rerank_score {
		parts.push(format!("Rerank: {rerank_score:.2}"));
	}
	if !chunk_types.is_empty() {
		parts.push(format!("Found in: {}", chunk_types.join(", ")));
	}

	parts.join(" | ")
}

#[cfg(test)]
mod tests {
	use afs_storage::models::SkillScore;

	use crate::search::{
		ScoreBreakdown,
		enrich::{match_insight, top_skills},
	};

	fn scores(lexical: f32, vector: f32, skill: f32) -> ScoreBreakdown {
		ScoreBreakdown {
			final_score: 0.82,
			lexical_score: 3.1,
			lexical_normalized: lexical,
			vector_score: vector,
			base_fusion_score: 0.7,
			skill_boost: skill,
			recency_boost: 0.0,
			rerank_score: None,
		}
	}

	#[test]
	fn insight_lists_signals_in_order() {
		let insight = match_insight(
			&scores(0.91, 0.4, 0.12),
			&["projects".to_string(), "skills".to_string()],
		);

		assert_eq!(
			insight,
			"Final score: 0.82 | Strong lexical match (BM25: 0.91) | Semantic match (Vector: 0.40) | Skill boost: +0.12 | Found in: projects, skills"
		);
	}

	#[test]
	fn insight_omits_absent_signals() {
		assert_eq!(match_insight(&scores(0.0, 0.0, 0.0), &[]), "Final score: 0.82");
	}

	#[test]
	fn top_skills_keep_the_five_best() {
		let skills: Vec<SkillScore> = (1..=7)
			.map(|score| SkillScore { name: format!("s{score}"), domain: None, score: score as f32 })
			.collect();
		let top = top_skills(&skills);

		assert_eq!(top.len(), 5);
		assert_eq!(top[0].name, "s7");
		assert_eq!(top[4].name, "s3");
	}
}
