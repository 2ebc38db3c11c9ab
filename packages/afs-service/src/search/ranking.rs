mod bm25;
mod boost;
mod cache;
mod fusion;
mod text;
mod vector;

pub(super) use bm25::{LexicalCandidate, aggregate_by_entity, idf, score_document};
pub(super) use boost::{apply_recency_boost, apply_skill_boost};
pub(super) use cache::{cache_key_prefix, is_cache_hit, mark_cache_hit, strategy_tag};
pub(super) use fusion::{FusedCandidate, cmp_f32_desc, fuse};
pub(super) use text::{content_preview, highlight, query_terms};
pub(super) use vector::{VectorCandidate, aggregate_hits};
