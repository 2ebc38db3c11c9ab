use serde::{Deserialize, Serialize};

use afs_storage::models::EntityAttributes;

/// Request-level restrictions. `chunk_types` narrows retrieval; the rest post-filter on attributes.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct MetadataFilter {
	#[serde(default)]
	pub chunk_types: Vec<String>,
	#[serde(default)]
	pub branches: Vec<String>,
	pub min_semester: Option<i32>,
	pub min_cgpa: Option<f32>,
}
impl MetadataFilter {
	/// Trims values and drops blanks and non-finite bounds.
	pub fn normalized(self) -> Self {
		Self {
			chunk_types: clean(self.chunk_types),
			branches: clean(self.branches),
			min_semester: self.min_semester,
			min_cgpa: self.min_cgpa.filter(|cgpa| cgpa.is_finite()),
		}
	}

	pub fn chunk_types(&self) -> Option<&[String]> {
		if self.chunk_types.is_empty() { None } else { Some(&self.chunk_types) }
	}

	pub fn has_attribute_criteria(&self) -> bool {
		!self.branches.is_empty() || self.min_semester.is_some() || self.min_cgpa.is_some()
	}

	pub fn is_empty(&self) -> bool {
		self.chunk_types.is_empty() && !self.has_attribute_criteria()
	}

	/// An entity lacking an attribute that an active criterion needs does not match.
	pub fn matches(&self, attributes: Option<&EntityAttributes>) -> bool {
		if !self.has_attribute_criteria() {
			return true;
		}

		let Some(attributes) = attributes else {
			return false;
		};

		if !self.branches.is_empty() {
			let Some(branch) = attributes.branch.as_deref().map(str::trim) else {
				return false;
			};

			if !self.branches.iter().any(|wanted| wanted.eq_ignore_ascii_case(branch)) {
				return false;
			}
		}
		if let Some(min_semester) = self.min_semester
			&& attributes.semester.is_none_or(|semester| semester < min_semester)
		{
			return false;
		}
		if let Some(min_cgpa) = self.min_cgpa
			&& attributes.cgpa.is_none_or(|cgpa| cgpa < min_cgpa)
		{
			return false;
		}

		true
	}
}

fn clean(values: Vec<String>) -> Vec<String> {
	let mut out: Vec<String> = values
		.into_iter()
		.map(|value| value.trim().to_string())
		.filter(|value| !value.is_empty())
		.collect();

	out.dedup();

	out
}
