use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	Error, Result,
	models::{
		CachedEntry, CandidateChunks, EntityAttributes, LexicalDocument, NewCacheEntry, ProfileRow,
	},
	vector_to_pg,
};

/// Whole-token match pattern for a lowercase alphanumeric term.
///
/// Boundaries are any non `[a-z0-9]` character so the database agrees with the tokenizer about
/// which chunks contain a term.
pub fn term_pattern(term: &str) -> Result<String> {
	if term.is_empty() || !term.bytes().all(|byte| byte.is_ascii_lowercase() || byte.is_ascii_digit())
	{
		return Err(Error::InvalidArgument(format!("Term {term:?} is not a normalized token.")));
	}

	Ok(format!("(^|[^a-z0-9]){term}([^a-z0-9]|$)"))
}

pub async fn count_chunks(pool: &PgPool, chunk_types: Option<&[String]>) -> Result<i64> {
	let count: i64 = sqlx::query_scalar(
		"\
SELECT count(*)
FROM profile_chunks
WHERE ($1::text[] IS NULL OR chunk_type = ANY($1))",
	)
	.bind(chunk_types.map(<[String]>::to_vec))
	.fetch_one(pool)
	.await?;

	Ok(count)
}

/// Mean whitespace-delimited word count, or 0 for an empty selection.
pub async fn avg_chunk_length(pool: &PgPool, chunk_types: Option<&[String]>) -> Result<f64> {
	let avg: f64 = sqlx::query_scalar(
		"\
SELECT COALESCE(AVG(array_length(regexp_split_to_array(btrim(content), '\\s+'), 1)), 0)::float8
FROM profile_chunks
WHERE ($1::text[] IS NULL OR chunk_type = ANY($1))",
	)
	.bind(chunk_types.map(<[String]>::to_vec))
	.fetch_one(pool)
	.await?;

	Ok(avg)
}

pub async fn count_chunks_with_term(
	pool: &PgPool,
	term: &str,
	chunk_types: Option<&[String]>,
) -> Result<i64> {
	let pattern = term_pattern(term)?;
	let count: i64 = sqlx::query_scalar(
		"\
SELECT count(*)
FROM profile_chunks
WHERE lower(content) ~ $1
	AND ($2::text[] IS NULL OR chunk_type = ANY($2))",
	)
	.bind(pattern)
	.bind(chunk_types.map(<[String]>::to_vec))
	.fetch_one(pool)
	.await?;

	Ok(count)
}

/// Chunks containing at least one of `terms`, in chunk id order.
pub async fn fetch_chunks_matching_any(
	pool: &PgPool,
	terms: &[String],
	chunk_types: Option<&[String]>,
	limit: i64,
) -> Result<CandidateChunks> {
	if terms.is_empty() {
		return Ok(CandidateChunks::default());
	}

	let patterns = terms.iter().map(|term| term_pattern(term)).collect::<Result<Vec<_>>>()?;
	let limit = limit.max(0);
	// One extra row tells a full page apart from a cut-off one.
	let mut docs = sqlx::query_as::<_, LexicalDocument>(
		"\
SELECT chunk_id, entity_id, chunk_type, content
FROM profile_chunks
WHERE lower(content) ~ ANY($1)
	AND ($2::text[] IS NULL OR chunk_type = ANY($2))
ORDER BY chunk_id
LIMIT $3",
	)
	.bind(patterns)
	.bind(chunk_types.map(<[String]>::to_vec))
	.bind(limit.saturating_add(1))
	.fetch_all(pool)
	.await?;
	let keep = usize::try_from(limit).unwrap_or(usize::MAX);
	let truncated = docs.len() > keep;

	docs.truncate(keep);

	Ok(CandidateChunks { docs, truncated })
}

pub async fn fetch_profiles(pool: &PgPool, entity_ids: &[Uuid]) -> Result<Vec<EntityAttributes>> {
	if entity_ids.is_empty() {
		return Ok(Vec::new());
	}

	let rows = sqlx::query_as::<_, ProfileRow>(
		"\
SELECT
	entity_id,
	name,
	email,
	branch,
	semester,
	cgpa,
	location,
	tenant_name,
	skills,
	updated_at
FROM profiles
WHERE entity_id = ANY($1)",
	)
	.bind(entity_ids)
	.fetch_all(pool)
	.await?;

	Ok(rows.into_iter().map(EntityAttributes::from).collect())
}

pub async fn upsert_profile(pool: &PgPool, profile: &EntityAttributes) -> Result<()> {
	let skills = serde_json::to_value(&profile.skills)
		.map_err(|err| Error::InvalidArgument(format!("Failed to encode skills: {err}")))?;

	sqlx::query(
		"\
INSERT INTO profiles (
	entity_id,
	name,
	email,
	branch,
	semester,
	cgpa,
	location,
	tenant_name,
	skills,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
ON CONFLICT (entity_id) DO UPDATE SET
	name = EXCLUDED.name,
	email = EXCLUDED.email,
	branch = EXCLUDED.branch,
	semester = EXCLUDED.semester,
	cgpa = EXCLUDED.cgpa,
	location = EXCLUDED.location,
	tenant_name = EXCLUDED.tenant_name,
	skills = EXCLUDED.skills,
	updated_at = EXCLUDED.updated_at",
	)
	.bind(profile.entity_id)
	.bind(profile.name.as_deref())
	.bind(profile.email.as_deref())
	.bind(profile.branch.as_deref())
	.bind(profile.semester)
	.bind(profile.cgpa)
	.bind(profile.location.as_deref())
	.bind(profile.tenant_name.as_deref())
	.bind(skills)
	.bind(profile.updated_at)
	.execute(pool)
	.await?;

	Ok(())
}

pub async fn insert_chunk(pool: &PgPool, chunk: &LexicalDocument) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO profile_chunks (chunk_id, entity_id, chunk_type, content)
VALUES ($1, $2, $3, $4)
ON CONFLICT (chunk_id) DO UPDATE SET
	chunk_type = EXCLUDED.chunk_type,
	content = EXCLUDED.content",
	)
	.bind(chunk.chunk_id)
	.bind(chunk.entity_id)
	.bind(chunk.chunk_type.as_str())
	.bind(chunk.content.as_str())
	.execute(pool)
	.await?;

	Ok(())
}

/// Closest stored query by cosine similarity among entries created at or after `not_before`.
pub async fn nearest_cache_entry(
	pool: &PgPool,
	embedding: &[f32],
	not_before: OffsetDateTime,
) -> Result<Option<CachedEntry>> {
	let vec_text = vector_to_pg(embedding);
	let row = sqlx::query_as::<_, CachedEntry>(
		"\
SELECT
	cache_id,
	query_text,
	strategy,
	results,
	insight,
	(1 - (embedding <=> $1::text::vector))::real AS similarity,
	created_at
FROM search_query_cache
WHERE created_at >= $2
ORDER BY embedding <=> $1::text::vector, created_at DESC
LIMIT 1",
	)
	.bind(vec_text.as_str())
	.bind(not_before)
	.fetch_optional(pool)
	.await?;

	Ok(row)
}

pub async fn insert_cache_entry(
	pool: &PgPool,
	entry: &NewCacheEntry,
	now: OffsetDateTime,
) -> Result<Uuid> {
	let cache_id = Uuid::new_v4();
	let vec_text = vector_to_pg(&entry.embedding);

	sqlx::query(
		"\
INSERT INTO search_query_cache (cache_id, query_text, embedding, strategy, results, insight, created_at)
VALUES ($1, $2, $3::text::vector, $4, $5, $6, $7)",
	)
	.bind(cache_id)
	.bind(entry.query_text.as_str())
	.bind(vec_text.as_str())
	.bind(entry.strategy.as_str())
	.bind(&entry.results)
	.bind(entry.insight.as_str())
	.bind(now)
	.execute(pool)
	.await?;

	Ok(cache_id)
}

/// Drops expired entries and everything beyond the newest `max_entries`.
pub async fn prune_cache_entries(
	pool: &PgPool,
	max_entries: i64,
	not_before: OffsetDateTime,
) -> Result<u64> {
	let result = sqlx::query(
		"\
DELETE FROM search_query_cache
WHERE created_at < $2
	OR cache_id IN (
		SELECT cache_id
		FROM search_query_cache
		ORDER BY created_at DESC, cache_id DESC
		OFFSET $1
	)",
	)
	.bind(max_entries)
	.bind(not_before)
	.execute(pool)
	.await?;

	Ok(result.rows_affected())
}
