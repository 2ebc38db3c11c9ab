use serde::Serialize;

use crate::params::{FusionMethod, FusionParameters};

#[derive(Clone, Debug, Serialize)]
pub struct Preset {
	pub key: &'static str,
	pub name: &'static str,
	pub description: &'static str,
	pub use_when: &'static str,
	pub parameters: FusionParameters,
}

pub fn presets() -> Vec<Preset> {
	vec![
		Preset {
			key: "technical_skills_exact",
			name: "Technical Skills (Exact Match)",
			description: "Best for specific technology stacks such as 'react typescript graphql'.",
			use_when: "You need exact technical skill matching.",
			parameters: FusionParameters::new(2.0, 0.5, 0.75, 0.25, 0.3, 0.05, FusionMethod::WeightedSum),
		},
		Preset {
			key: "conceptual_semantic",
			name: "Conceptual Understanding",
			description: "Best for soft skills and concepts such as 'innovative team leader'.",
			use_when: "You need semantic understanding of qualities.",
			parameters: FusionParameters::new(1.2, 0.75, 0.25, 0.75, 0.2, 0.1, FusionMethod::WeightedSum),
		},
		Preset {
			key: "balanced_hybrid",
			name: "Balanced Hybrid",
			description: "Equal weight to lexical and semantic matching.",
			use_when: "Mixed queries with both technical and soft skills.",
			parameters: FusionParameters::new(1.5, 0.6, 0.5, 0.5, 0.3, 0.1, FusionMethod::WeightedSum),
		},
		Preset {
			key: "top_performers",
			name: "Top Performers",
			description: "Heavily weight profiles with high skill proficiency.",
			use_when: "You want the strongest candidates.",
			parameters: FusionParameters::new(1.5, 0.6, 0.4, 0.6, 0.6, 0.05, FusionMethod::Multiplicative),
		},
		Preset {
			key: "fresh_talent",
			name: "Fresh Talent",
			description: "Prioritize recently updated profiles.",
			use_when: "You want active, recently updated profiles.",
			parameters: FusionParameters::new(1.5, 0.6, 0.5, 0.5, 0.2, 0.5, FusionMethod::WeightedSum),
		},
		Preset {
			key: "strict_requirements",
			name: "Strict Requirements",
			description: "Lexical and vector signals must both match (multiplicative fusion).",
			use_when: "Candidates must meet both exact and conceptual criteria.",
			parameters: FusionParameters::new(1.5, 0.6, 0.5, 0.5, 0.3, 0.1, FusionMethod::Multiplicative),
		},
	]
}

pub fn preset(key: &str) -> Option<Preset> {
	presets().into_iter().find(|preset| preset.key == key)
}
