use reqwest::Client;
use serde_json::Value;

use crate::{Result, invalid_response};
use afs_config::ProviderConfig;

/// Cross-encoder style `/rerank` client. Scores come back aligned with the input documents.
#[derive(Clone, Debug)]
pub struct RerankClient {
	cfg: ProviderConfig,
	client: Client,
}
impl RerankClient {
	pub fn new(cfg: ProviderConfig) -> Result<Self> {
		let client = crate::build_client(&cfg.api_key, &cfg.default_headers, cfg.timeout_ms)?;

		Ok(Self { cfg, client })
	}

	pub async fn rerank(&self, query: &str, docs: &[String]) -> Result<Vec<f32>> {
		if docs.is_empty() {
			return Ok(Vec::new());
		}

		let url = format!("{}{}", self.cfg.api_base, self.cfg.path);
		let body = serde_json::json!({ "model": self.cfg.model, "query": query, "documents": docs });
		let res = self.client.post(url).json(&body).send().await?;
		let json: Value = res.error_for_status()?.json().await?;

		parse_rerank_response(json, docs.len())
	}
}

fn parse_rerank_response(json: Value, doc_count: usize) -> Result<Vec<f32>> {
	let mut scores = vec![0.0_f32; doc_count];
	let results = json
		.get("results")
		.or_else(|| json.get("data"))
		.and_then(Value::as_array)
		.ok_or_else(|| invalid_response("Rerank response is missing results array."))?;

	for item in results {
		let index = item
			.get("index")
			.and_then(Value::as_u64)
			.ok_or_else(|| invalid_response("Rerank result missing index."))? as usize;
		let score = item
			.get("relevance_score")
			.or_else(|| item.get("score"))
			.and_then(Value::as_f64)
			.ok_or_else(|| invalid_response("Rerank result missing score."))? as f32;

		if let Some(slot) = scores.get_mut(index) {
			*slot = score;
		}
	}

	Ok(scores)
}

#[cfg(test)]
mod tests {
	use crate::rerank::parse_rerank_response;

	#[test]
	fn aligns_scores_by_index() {
		let json = serde_json::json!({
			"results": [
				{ "index": 1, "relevance_score": 0.2 },
				{ "index": 0, "relevance_score": 0.9 }
			]
		});
		let scores = parse_rerank_response(json, 2).expect("parse failed");

		assert_eq!(scores, vec![0.9, 0.2]);
	}

	#[test]
	fn ignores_out_of_range_indices() {
		let json = serde_json::json!({ "data": [{ "index": 5, "score": 0.7 }] });
		let scores = parse_rerank_response(json, 1).expect("parse failed");

		assert_eq!(scores, vec![0.0]);
	}
}
