use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

pub type EntityId = Uuid;

/// One indexed chunk as seen by lexical scoring.
#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct LexicalDocument {
	pub chunk_id: Uuid,
	pub entity_id: EntityId,
	pub chunk_type: String,
	pub content: String,
}

/// Chunks returned by the lexical prefilter. `truncated` is set when more chunks matched than
/// the fetch limit allowed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CandidateChunks {
	pub docs: Vec<LexicalDocument>,
	pub truncated: bool,
}

/// One chunk-level nearest-neighbor hit. `similarity` is cosine similarity.
#[derive(Clone, Debug, PartialEq)]
pub struct VectorHit {
	pub entity_id: EntityId,
	pub chunk_type: String,
	pub similarity: f32,
	pub content: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SkillScore {
	pub name: String,
	pub domain: Option<String>,
	/// Proficiency on a 0-10 scale.
	pub score: f32,
}
impl SkillScore {
	/// Lenient decode of one stored skill item. Legacy key names are accepted.
	pub fn from_value(value: &Value) -> Option<Self> {
		let object = value.as_object()?;
		let name = ["name", "tool_name"]
			.iter()
			.find_map(|key| object.get(*key).and_then(Value::as_str))
			.map(str::trim)
			.filter(|name| !name.is_empty())?;
		let domain = ["domain", "domain_name"]
			.iter()
			.find_map(|key| object.get(*key).and_then(Value::as_str))
			.map(ToString::to_string);
		let raw_score =
			["score", "average_normalized_score"].iter().find_map(|key| object.get(*key));
		// A missing score counts as zero proficiency. A present but non-numeric one is malformed.
		let score = match raw_score {
			Some(raw) => numeric(raw)?,
			None => 0.0,
		};

		Some(Self { name: name.to_string(), domain, score })
	}
}

/// Typed per-entity record used for boosts, filtering, and enrichment.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EntityAttributes {
	pub entity_id: EntityId,
	pub name: Option<String>,
	pub email: Option<String>,
	pub branch: Option<String>,
	pub semester: Option<i32>,
	pub cgpa: Option<f32>,
	pub location: Option<String>,
	pub tenant_name: Option<String>,
	pub skills: Vec<SkillScore>,
	pub updated_at: Option<OffsetDateTime>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ProfileRow {
	pub entity_id: Uuid,
	pub name: Option<String>,
	pub email: Option<String>,
	pub branch: Option<String>,
	pub semester: Option<i32>,
	pub cgpa: Option<f32>,
	pub location: Option<String>,
	pub tenant_name: Option<String>,
	pub skills: Value,
	pub updated_at: Option<OffsetDateTime>,
}
impl From<ProfileRow> for EntityAttributes {
	fn from(row: ProfileRow) -> Self {
		Self {
			entity_id: row.entity_id,
			name: row.name,
			email: row.email,
			branch: row.branch,
			semester: row.semester,
			cgpa: row.cgpa.filter(|cgpa| cgpa.is_finite()),
			location: row.location,
			tenant_name: row.tenant_name,
			skills: decode_skills(&row.skills),
			updated_at: row.updated_at,
		}
	}
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct CachedEntry {
	pub cache_id: Uuid,
	pub query_text: String,
	pub strategy: String,
	pub results: Value,
	pub insight: String,
	pub similarity: f32,
	pub created_at: OffsetDateTime,
}

#[derive(Clone, Debug)]
pub struct NewCacheEntry {
	pub query_text: String,
	pub embedding: Vec<f32>,
	pub strategy: String,
	pub results: Value,
	pub insight: String,
}

/// Malformed items are dropped. A non-array payload yields no skills.
pub fn decode_skills(value: &Value) -> Vec<SkillScore> {
	value
		.as_array()
		.map(|items| items.iter().filter_map(SkillScore::from_value).collect())
		.unwrap_or_default()
}

fn numeric(value: &Value) -> Option<f32> {
	let number = match value {
		Value::Number(number) => number.as_f64()?,
		Value::String(raw) => raw.trim().parse::<f64>().ok()?,
		_ => return None,
	};

	if number.is_finite() { Some(number as f32) } else { None }
}
