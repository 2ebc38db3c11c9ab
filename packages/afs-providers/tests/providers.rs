use reqwest::header::AUTHORIZATION;
use serde_json::{Map, Value};

use afs_config::{EmbeddingProviderConfig, ProviderConfig};
use afs_providers::{embedding::EmbeddingClient, rerank::RerankClient};

#[test]
fn builds_bearer_auth_header() {
	let headers =
		afs_providers::auth_headers("secret", &Map::new()).expect("Failed to build headers.");
	let value = headers.get(AUTHORIZATION).expect("Missing authorization header.");

	assert_eq!(value, "Bearer secret");
}

#[test]
fn includes_default_headers() {
	let mut defaults = Map::new();

	defaults.insert("x-tenant".to_string(), Value::String("campus".to_string()));

	let headers = afs_providers::auth_headers("secret", &defaults).expect("Failed to build headers.");

	assert_eq!(headers.get("x-tenant").expect("Missing default header."), "campus");
}

#[test]
fn rejects_non_string_default_headers() {
	let mut defaults = Map::new();

	defaults.insert("x-retries".to_string(), Value::from(3));

	let err = afs_providers::auth_headers("secret", &defaults).expect_err("Expected error.");

	assert!(err.to_string().contains("x-retries"), "Unexpected error: {err}");
}

#[test]
fn clients_build_from_config() {
	let embedding = EmbeddingClient::new(EmbeddingProviderConfig {
		provider_id: "local".to_string(),
		api_base: "http://127.0.0.1:9".to_string(),
		api_key: "key".to_string(),
		path: "/embeddings".to_string(),
		model: "m".to_string(),
		dimensions: 4,
		timeout_ms: 1_000,
		default_headers: Map::new(),
	})
	.expect("Embedding client must build.");

	assert_eq!(embedding.dimensions(), 4);

	RerankClient::new(ProviderConfig {
		provider_id: "local".to_string(),
		api_base: "http://127.0.0.1:9".to_string(),
		api_key: "key".to_string(),
		path: "/rerank".to_string(),
		model: "m".to_string(),
		timeout_ms: 1_000,
		default_headers: Map::new(),
	})
	.expect("Rerank client must build.");
}
