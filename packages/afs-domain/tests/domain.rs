use serde_json::json;

use afs_config::Ranking;
use afs_domain::{
	intent::{QueryIntent, detect_intent},
	params::{FusionMethod, FusionParameters},
	presets,
};

#[test]
fn ranking_defaults_become_parameters() {
	let params = FusionParameters::from_ranking(&Ranking::default());

	assert_eq!(params.k1, 1.5);
	assert_eq!(params.b, 0.6);
	assert_eq!(params.lexical_weight, 0.5);
	assert_eq!(params.vector_weight, 0.5);
	assert_eq!(params.fusion_method, FusionMethod::WeightedSum);
}

#[test]
fn numeric_parameters_are_clamped() {
	let defaults = FusionParameters::default();
	let params = FusionParameters::from_value(
		Some(&json!({
			"k1": 9.0,
			"b": -2.0,
			"skill_boost_factor": 4.0,
			"recency_boost_factor": -0.5,
		})),
		&defaults,
	);

	assert_eq!(params.k1, 3.0);
	assert_eq!(params.b, 0.0);
	assert_eq!(params.skill_boost_factor, 1.0);
	assert_eq!(params.recency_boost_factor, 0.0);
}

#[test]
fn legacy_names_and_numeric_strings_are_accepted() {
	let defaults = FusionParameters::default();
	let params = FusionParameters::from_value(
		Some(&json!({
			"bm25_k1": "2.0",
			"bm25_b": 0.5,
			"bm25_weight": 0.75,
			"vector_weight": 0.25,
			"skill_proficiency_boost": 0.6,
			"recency_boost": "0.4",
			"fusion_method": "rrf",
		})),
		&defaults,
	);

	assert_eq!(params.k1, 2.0);
	assert_eq!(params.b, 0.5);
	assert_eq!(params.lexical_weight, 0.75);
	assert_eq!(params.vector_weight, 0.25);
	assert_eq!(params.skill_boost_factor, 0.6);
	assert_eq!(params.recency_boost_factor, 0.4);
	assert_eq!(params.fusion_method, FusionMethod::Rrf);
}

#[test]
fn canonical_names_win_over_legacy_names() {
	let defaults = FusionParameters::default();
	let params = FusionParameters::from_value(
		Some(&json!({ "k1": 1.2, "bm25_k1": 2.8 })),
		&defaults,
	);

	assert_eq!(params.k1, 1.2);
}

#[test]
fn scaled_weights_match_pre_normalized_weights() {
	let defaults = FusionParameters::default();
	let scaled = FusionParameters::from_value(
		Some(&json!({ "lexical_weight": 4, "vector_weight": 1 })),
		&defaults,
	);
	let normalized = FusionParameters::from_value(
		Some(&json!({ "lexical_weight": 0.8, "vector_weight": 0.2 })),
		&defaults,
	);

	assert_eq!(scaled, normalized);
}

#[test]
fn unknown_fusion_method_is_weighted_sum() {
	let defaults =
		FusionParameters { fusion_method: FusionMethod::Rrf, ..FusionParameters::default() };
	let params = FusionParameters::from_value(
		Some(&json!({ "fusion_method": "borda_count" })),
		&defaults,
	);

	assert_eq!(params.fusion_method, FusionMethod::WeightedSum);
}

#[test]
fn missing_parameters_use_defaults() {
	let defaults = FusionParameters::default();

	assert_eq!(FusionParameters::from_value(None, &defaults), defaults);
	assert_eq!(FusionParameters::from_value(Some(&json!("fast")), &defaults), defaults);
}

#[test]
fn presets_are_normalized_and_addressable() {
	let all = presets::presets();

	assert_eq!(all.len(), 6);

	for preset in &all {
		let sum = preset.parameters.lexical_weight + preset.parameters.vector_weight;

		assert!((sum - 1.0).abs() < 1e-6, "Preset {} weights must sum to one.", preset.key);
	}

	let strict = presets::preset("strict_requirements").expect("Preset must exist.");

	assert_eq!(strict.parameters.fusion_method, FusionMethod::Multiplicative);
	assert!(presets::preset("unknown").is_none());
}

#[test]
fn intent_follows_vocabularies() {
	assert_eq!(detect_intent(&["python", "fastapi"]), QueryIntent::TechnicalSkillSearch);
	assert_eq!(detect_intent(&["innovative", "leader"]), QueryIntent::SoftSkillSearch);
	assert_eq!(detect_intent(&["react", "mentor"]), QueryIntent::MixedTechnicalSoftSkills);
	assert_eq!(detect_intent(&["astronomy"]), QueryIntent::GeneralSearch);
	assert_eq!(detect_intent::<&str>(&[]), QueryIntent::GeneralSearch);
}
