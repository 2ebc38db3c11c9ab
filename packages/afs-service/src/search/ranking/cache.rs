use afs_domain::params::FusionMethod;

use crate::search::SearchItem;

pub const CACHE_HIT_PREFIX: &str = "[CACHE HIT] ";

const STRATEGY: &str = "adaptive_fusion";

/// Strictly above the threshold. Non-finite similarities never hit.
pub fn is_cache_hit(similarity: f32, threshold: f32) -> bool {
	similarity.is_finite() && similarity > threshold
}

pub fn strategy_tag(method: FusionMethod) -> String {
	format!("{STRATEGY}:{}", method.as_str())
}

/// Short blake3 prefix of the trimmed query, for log correlation only.
pub fn cache_key_prefix(query: &str) -> String {
	let hash = blake3::hash(query.trim().as_bytes()).to_hex();

	hash.as_str()[..12].to_string()
}

pub fn mark_cache_hit(items: &mut [SearchItem]) {
	for item in items {
		if !item.match_insight.starts_with(CACHE_HIT_PREFIX) {
			item.match_insight = format!("{CACHE_HIT_PREFIX}{}", item.match_insight);
		}
	}
}
