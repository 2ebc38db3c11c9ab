use std::collections::HashMap;

use qdrant_client::qdrant::{
	Condition, Filter, Query, QueryPointsBuilder, ScoredPoint, Value, value::Kind,
};
use uuid::Uuid;

use crate::{Error, Result, models::VectorHit};

pub const DENSE_VECTOR_NAME: &str = "dense";

pub struct QdrantStore {
	pub client: qdrant_client::Qdrant,
	pub collection: String,
	pub vector_dim: u32,
}
impl QdrantStore {
	pub fn new(cfg: &afs_config::Qdrant, vector_dim: u32) -> Result<Self> {
		let client = qdrant_client::Qdrant::from_url(&cfg.url).build()?;

		Ok(Self { client, collection: cfg.collection.clone(), vector_dim })
	}

	/// Chunk-level cosine neighbors, best first. Points without an entity id are skipped.
	pub async fn nearest(
		&self,
		embedding: Vec<f32>,
		limit: u64,
		chunk_types: Option<&[String]>,
	) -> Result<Vec<VectorHit>> {
		check_dimension(self.vector_dim, &embedding)?;

		let mut search = QueryPointsBuilder::new(self.collection.clone())
			.query(Query::new_nearest(embedding))
			.using(DENSE_VECTOR_NAME)
			.with_payload(true)
			.limit(limit);

		if let Some(chunk_types) = chunk_types {
			search = search.filter(Filter::must([Condition::matches(
				"chunk_type",
				chunk_types.to_vec(),
			)]));
		}

		let response = self.client.query(search).await?;

		Ok(response.result.iter().filter_map(vector_hit).collect())
	}
}

fn check_dimension(expected: u32, embedding: &[f32]) -> Result<()> {
	if embedding.len() != expected as usize {
		return Err(Error::InvalidArgument(format!(
			"Query embedding has {} dimensions, the index expects {expected}.",
			embedding.len()
		)));
	}

	Ok(())
}

fn vector_hit(point: &ScoredPoint) -> Option<VectorHit> {
	let entity_id =
		payload_str(&point.payload, "entity_id").and_then(|raw| Uuid::parse_str(raw).ok())?;

	Some(VectorHit {
		entity_id,
		chunk_type: payload_str(&point.payload, "chunk_type").unwrap_or_default().to_string(),
		similarity: point.score,
		content: payload_str(&point.payload, "content").unwrap_or_default().to_string(),
	})
}

fn payload_str<'a>(payload: &'a HashMap<String, Value>, key: &str) -> Option<&'a str> {
	match &payload.get(key)?.kind {
		Some(Kind::StringValue(text)) => Some(text.as_str()),
		_ => None,
	}
}
