use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use afs_config::{Config, Error};

const SAMPLE_CONFIG_TEMPLATE_TOML: &str = include_str!("fixtures/sample_config.template.toml");

fn sample_toml_with(edit: impl FnOnce(&mut toml::Table)) -> String {
	let mut value: Value =
		toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.");
	let root = value.as_table_mut().expect("Template config must be a table.");

	edit(root);

	toml::to_string(&value).expect("Failed to render template config.")
}

fn section<'a>(root: &'a mut toml::Table, path: &[&str]) -> &'a mut toml::Table {
	let mut table = root;

	for key in path {
		table = table
			.get_mut(*key)
			.and_then(Value::as_table_mut)
			.unwrap_or_else(|| panic!("Template config must include [{key}]."));
	}

	table
}

fn write_temp_config(payload: String) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("afs_config_test_{nanos}_{pid}_{ordinal}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn base_config() -> Config {
	toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse test config.")
}

fn load_payload(payload: String) -> afs_config::Result<Config> {
	let path = write_temp_config(payload);
	let result = afs_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	result
}

#[test]
fn sample_config_is_valid() {
	let cfg = load_payload(SAMPLE_CONFIG_TEMPLATE_TOML.to_string())
		.expect("Sample config must load.");

	assert_eq!(cfg.search.cache.similarity_threshold, 0.95);
	assert_eq!(cfg.ranking.fusion_method, "weighted_sum");
	assert!(cfg.storage.qdrant.is_some());
	assert!(cfg.providers.embedding.is_some());
}

#[test]
fn missing_file_is_a_read_error() {
	let mut path = env::temp_dir();

	path.push("afs_config_test_missing_file.toml");

	let err = afs_config::load(&path).expect_err("Expected read error.");

	assert!(matches!(err, Error::ReadConfig { .. }), "Unexpected error: {err}");
}

#[test]
fn malformed_toml_is_a_parse_error() {
	let err = load_payload("[service\nhttp_bind = ".to_string()).expect_err("Expected parse error.");

	assert!(matches!(err, Error::ParseConfig { .. }), "Unexpected error: {err}");
}

#[test]
fn omitted_sections_fall_back_to_defaults() {
	let payload = sample_toml_with(|root| {
		root.remove("search");
		root.remove("ranking");
		root.remove("providers");
	});
	let cfg = load_payload(payload).expect("Config without optional sections must load.");

	assert_eq!(cfg.search.default_top_k, 20);
	assert_eq!(cfg.search.term_concurrency, 4);
	assert_eq!(cfg.ranking.k1, 1.5);
	assert_eq!(cfg.ranking.b, 0.6);
	assert!(cfg.providers.embedding.is_none());
	assert!(cfg.providers.rerank.is_none());
}

#[test]
fn blank_qdrant_url_disables_vector_index() {
	let payload = sample_toml_with(|root| {
		section(root, &["storage", "qdrant"])
			.insert("url".to_string(), Value::String("  ".to_string()));
	});
	let cfg = load_payload(payload).expect("Blank qdrant url must normalize to None.");

	assert!(cfg.storage.qdrant.is_none());
}

#[test]
fn fusion_method_is_normalized() {
	let payload = sample_toml_with(|root| {
		section(root, &["ranking"])
			.insert("fusion_method".to_string(), Value::String(" RRF ".to_string()));
	});
	let cfg = load_payload(payload).expect("Config must load.");

	assert_eq!(cfg.ranking.fusion_method, "rrf");
}

#[test]
fn embedding_dimensions_must_match_vector_dim() {
	let payload = sample_toml_with(|root| {
		section(root, &["providers", "embedding"])
			.insert("dimensions".to_string(), Value::Integer(8));
	});
	let err = load_payload(payload).expect_err("Expected dimension mismatch error.");

	assert!(
		err.to_string()
			.contains("providers.embedding.dimensions must match storage.vector_dim."),
		"Unexpected error: {err}"
	);
}

#[test]
fn provider_api_key_must_be_non_empty() {
	let mut cfg = base_config();

	if let Some(rerank) = cfg.providers.rerank.as_mut() {
		rerank.api_key = " ".to_string();
	}

	let err = afs_config::validate(&cfg).expect_err("Expected api_key validation error.");

	assert!(
		err.to_string().contains("Provider rerank api_key must be non-empty."),
		"Unexpected error: {err}"
	);
}

#[test]
fn default_top_k_cannot_exceed_max_top_k() {
	let mut cfg = base_config();

	cfg.search.default_top_k = 150;

	let err = afs_config::validate(&cfg).expect_err("Expected top_k validation error.");

	assert!(
		err.to_string().contains("search.default_top_k must be at most search.max_top_k."),
		"Unexpected error: {err}"
	);
}

#[test]
fn term_concurrency_must_be_positive() {
	let mut cfg = base_config();

	cfg.search.term_concurrency = 0;

	let err = afs_config::validate(&cfg).expect_err("Expected term_concurrency error.");

	assert!(
		err.to_string().contains("search.term_concurrency must be greater than zero."),
		"Unexpected error: {err}"
	);
}

#[test]
fn cache_threshold_must_be_a_similarity() {
	for threshold in [0.0, 1.5, f32::NAN] {
		let mut cfg = base_config();

		cfg.search.cache.similarity_threshold = threshold;

		assert!(
			afs_config::validate(&cfg).is_err(),
			"Threshold {threshold} must be rejected."
		);
	}

	let mut cfg = base_config();

	cfg.search.cache.similarity_threshold = 1.0;

	assert!(afs_config::validate(&cfg).is_ok());
}

#[test]
fn cache_ttl_must_be_positive() {
	let payload = sample_toml_with(|root| {
		section(root, &["search", "cache"]).insert("ttl_days".to_string(), Value::Integer(0));
	});
	let err = load_payload(payload).expect_err("Expected cache TTL validation error.");

	assert!(
		err.to_string().contains("search.cache.ttl_days must be greater than zero."),
		"Unexpected error: {err}"
	);
}
