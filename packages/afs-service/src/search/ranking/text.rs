use std::collections::HashSet;

use regex::RegexBuilder;

const MIN_TOKEN_LEN: usize = 3;
const PREVIEW_CHARS: usize = 150;
const STOP_WORDS: &[&str] = &[
	"the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "from",
	"is", "as", "are", "was", "were", "be", "been", "being", "have", "has", "had",
];

/// Lowercased ASCII alphanumeric tokens in input order. Stop words and tokens shorter than three
/// characters are dropped. Repeats are kept so callers can count term frequency.
pub fn tokenize(text: &str) -> Vec<String> {
	let mut normalized = String::with_capacity(text.len());

	for ch in text.chars().flat_map(char::to_lowercase) {
		if ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch.is_whitespace() {
			normalized.push(ch);
		} else {
			normalized.push(' ');
		}
	}

	normalized
		.split_whitespace()
		.filter(|token| token.len() >= MIN_TOKEN_LEN && !STOP_WORDS.contains(token))
		.map(ToString::to_string)
		.collect()
}

/// Distinct query terms, first occurrence wins.
pub fn query_terms(query: &str) -> Vec<String> {
	let mut seen = HashSet::new();

	tokenize(query).into_iter().filter(|term| seen.insert(term.clone())).collect()
}

pub fn content_preview(content: &str) -> String {
	let trimmed = content.trim();

	if trimmed.chars().count() <= PREVIEW_CHARS {
		return trimmed.to_string();
	}

	let mut out: String = trimmed.chars().take(PREVIEW_CHARS).collect();

	out.push_str("...");

	out
}

/// Wraps whole-word, case-insensitive occurrences of `terms` in `<mark>` tags.
pub fn highlight(text: &str, terms: &[String]) -> String {
	if terms.is_empty() {
		return text.to_string();
	}

	let alternation = terms.iter().map(|term| regex::escape(term)).collect::<Vec<_>>().join("|");
	let pattern = format!(r"\b(?:{alternation})\b");

	match RegexBuilder::new(&pattern).case_insensitive(true).build() {
		Ok(regex) => regex.replace_all(text, "<mark>$0</mark>").into_owned(),
		Err(err) => {
			tracing::warn!(error = %err, "Failed to build highlight pattern.");

			text.to_string()
		},
	}
}
