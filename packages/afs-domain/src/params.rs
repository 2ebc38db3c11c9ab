use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use afs_config::Ranking;

pub const K1_RANGE: (f32, f32) = (1.0, 3.0);
pub const B_RANGE: (f32, f32) = (0.0, 1.0);
pub const BOOST_RANGE: (f32, f32) = (0.0, 1.0);

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionMethod {
	#[default]
	WeightedSum,
	Rrf,
	Multiplicative,
}
impl FusionMethod {
	/// Unrecognized names fall back to weighted sum.
	pub fn parse(raw: &str) -> Self {
		match raw.trim().to_ascii_lowercase().as_str() {
			"rrf" => Self::Rrf,
			"multiplicative" => Self::Multiplicative,
			_ => Self::WeightedSum,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::WeightedSum => "weighted_sum",
			Self::Rrf => "rrf",
			Self::Multiplicative => "multiplicative",
		}
	}
}

/// Tuning knobs for one search, always held in their clamped form.
///
/// `lexical_weight` and `vector_weight` are either both zero or sum to one.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FusionParameters {
	pub k1: f32,
	pub b: f32,
	pub lexical_weight: f32,
	pub vector_weight: f32,
	pub skill_boost_factor: f32,
	pub recency_boost_factor: f32,
	pub fusion_method: FusionMethod,
}
impl FusionParameters {
	pub fn new(
		k1: f32,
		b: f32,
		lexical_weight: f32,
		vector_weight: f32,
		skill_boost_factor: f32,
		recency_boost_factor: f32,
		fusion_method: FusionMethod,
	) -> Self {
		let (lexical_weight, vector_weight) = normalize_weights(lexical_weight, vector_weight);

		Self {
			k1: clamp_or(k1, K1_RANGE, 1.5),
			b: clamp_or(b, B_RANGE, 0.6),
			lexical_weight,
			vector_weight,
			skill_boost_factor: clamp_or(skill_boost_factor, BOOST_RANGE, 0.0),
			recency_boost_factor: clamp_or(recency_boost_factor, BOOST_RANGE, 0.0),
			fusion_method,
		}
	}

	pub fn from_ranking(ranking: &Ranking) -> Self {
		Self::new(
			ranking.k1,
			ranking.b,
			ranking.lexical_weight,
			ranking.vector_weight,
			ranking.skill_boost_factor,
			ranking.recency_boost_factor,
			FusionMethod::parse(&ranking.fusion_method),
		)
	}

	/// Overlays a loosely typed request object on `defaults`.
	///
	/// Malformed values are ignored rather than rejected. Numbers may also arrive as numeric
	/// strings. Both canonical and legacy key names are honored, canonical first.
	pub fn from_value(value: Option<&Value>, defaults: &Self) -> Self {
		let Some(object) = value.and_then(Value::as_object) else {
			return defaults.clone();
		};
		let fusion_method = lookup(object, &["fusion_method"])
			.and_then(Value::as_str)
			.map(FusionMethod::parse)
			.unwrap_or(defaults.fusion_method);

		Self::new(
			number_or(object, &["k1", "bm25_k1"], defaults.k1),
			number_or(object, &["b", "bm25_b"], defaults.b),
			number_or(object, &["lexical_weight", "bm25_weight"], defaults.lexical_weight),
			number_or(object, &["vector_weight"], defaults.vector_weight),
			number_or(
				object,
				&["skill_boost_factor", "skill_proficiency_boost"],
				defaults.skill_boost_factor,
			),
			number_or(object, &["recency_boost_factor", "recency_boost"], defaults.recency_boost_factor),
			fusion_method,
		)
	}
}
impl Default for FusionParameters {
	fn default() -> Self {
		Self::from_ranking(&Ranking::default())
	}
}

/// Drops negative or non-finite weights to zero, then rescales so the pair sums to one.
pub fn normalize_weights(lexical: f32, vector: f32) -> (f32, f32) {
	let lexical = if lexical.is_finite() && lexical > 0.0 { lexical } else { 0.0 };
	let vector = if vector.is_finite() && vector > 0.0 { vector } else { 0.0 };
	let total = lexical + vector;

	if total > 0.0 && total.is_finite() { (lexical / total, vector / total) } else { (0.0, 0.0) }
}

fn clamp_or(value: f32, (min, max): (f32, f32), fallback: f32) -> f32 {
	if value.is_finite() { value.clamp(min, max) } else { fallback.clamp(min, max) }
}

fn lookup<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
	keys.iter().find_map(|key| object.get(*key).filter(|value| !value.is_null()))
}

fn number_or(object: &Map<String, Value>, keys: &[&str], fallback: f32) -> f32 {
	let parsed = keys.iter().find_map(|key| object.get(*key).and_then(as_number));

	parsed.unwrap_or(fallback)
}

fn as_number(value: &Value) -> Option<f32> {
	let number = match value {
		Value::Number(number) => number.as_f64()?,
		Value::String(raw) => raw.trim().parse::<f64>().ok()?,
		_ => return None,
	};

	if number.is_finite() { Some(number as f32) } else { None }
}
