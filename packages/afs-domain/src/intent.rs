use serde::Serialize;

const TECHNICAL_TERMS: &[&str] = &[
	"angular",
	"aws",
	"django",
	"docker",
	"fastapi",
	"flask",
	"java",
	"javascript",
	"kubernetes",
	"mongodb",
	"node",
	"postgresql",
	"python",
	"react",
	"sql",
	"typescript",
	"vue",
];
const SOFT_SKILL_TERMS: &[&str] = &[
	"collaborative",
	"communication",
	"creative",
	"innovative",
	"leader",
	"leadership",
	"mentor",
	"organized",
	"team",
];

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryIntent {
	TechnicalSkillSearch,
	SoftSkillSearch,
	MixedTechnicalSoftSkills,
	GeneralSearch,
}

pub fn detect_intent<S>(terms: &[S]) -> QueryIntent
where
	S: AsRef<str>,
{
	let has_technical = terms.iter().any(|term| TECHNICAL_TERMS.contains(&term.as_ref()));
	let has_soft = terms.iter().any(|term| SOFT_SKILL_TERMS.contains(&term.as_ref()));

	match (has_technical, has_soft) {
		(true, true) => QueryIntent::MixedTechnicalSoftSkills,
		(true, false) => QueryIntent::TechnicalSkillSearch,
		(false, true) => QueryIntent::SoftSkillSearch,
		(false, false) => QueryIntent::GeneralSearch,
	}
}
