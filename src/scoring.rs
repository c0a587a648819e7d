//! Candidate scoring: content match, behavior match, and the combined rank.
//!
//! Content scoring counts tag matches per category under fixed category
//! weights and rewards coverage; behavior scoring credits direct engagement
//! with the candidate and similarity-weighted engagement with everything
//! else the listener heard.

use std::cmp::Ordering;

use crate::behavior::{behavior_weight, favorite_counts, BehaviorRecord};
use crate::catalog::{normalize_id, Catalog};
use crate::tags::{Category, TagSets};

/// Per-category match weights.
pub const GENRE_WEIGHT: f64 = 3.0;
pub const INSTRUMENT_WEIGHT: f64 = 2.0;
pub const MOOD_WEIGHT: f64 = 2.0;
pub const THEME_WEIGHT: f64 = 1.0;

/// Cap of the coverage bonus: a fully-matched track gains 20%.
pub const COVERAGE_BONUS: f64 = 0.2;

/// Weights of the two score components in the combined score. They do not
/// sum to 1 on purpose; downstream consumers only compare ranks.
pub const CONTENT_WEIGHT: f64 = 0.6;
pub const BEHAVIOR_WEIGHT: f64 = 0.3;

/// Similarity floor for counting a heard track toward a candidate's
/// behavior score during ranking.
pub const RANKING_SIMILARITY: f64 = 0.3;
/// Stricter floor used when explaining a single recommendation.
/// Intentionally distinct from [`RANKING_SIMILARITY`]; never unify them.
pub const EXPLAIN_SIMILARITY: f64 = 0.5;

/// Upper bound (exclusive) of the random score every track gets on cold
/// start, so diversity filtering still sees variation.
pub const COLD_START_CEILING: f64 = 0.1;

#[must_use]
pub fn category_weight(category: Category) -> f64 {
    match category {
        Category::Genre => GENRE_WEIGHT,
        Category::Instrument => INSTRUMENT_WEIGHT,
        Category::Mood => MOOD_WEIGHT,
        Category::Theme => THEME_WEIGHT,
    }
}

/// One scored candidate, ephemeral to a single request.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub track_id: String,
    pub content_score: f64,
    pub behavior_score: f64,
    pub score: f64,
}

impl ScoredCandidate {
    /// A candidate that was excluded or could not be resolved: it still
    /// produces a listed entry pre-filter, just with all-zero scores.
    #[must_use]
    pub fn zero(track_id: &str) -> ScoredCandidate {
        ScoredCandidate {
            track_id: track_id.to_string(),
            content_score: 0.0,
            behavior_score: 0.0,
            score: 0.0,
        }
    }
}

/// How well a track's tags match the merged preferences.
///
/// Sum over categories of `matches × category_weight`, then a coverage
/// bonus of up to [`COVERAGE_BONUS`] scaled by the fraction of the track's
/// tags that matched. Tracks with zero tags skip the bonus.
#[must_use]
pub fn content_score(track_tags: &TagSets, preferences: &TagSets) -> f64 {
    let mut score = 0.0;
    let mut matched = 0usize;

    for category in Category::ALL {
        let wanted = preferences.get(category);
        if wanted.is_empty() {
            continue;
        }
        let matches = track_tags
            .get(category)
            .iter()
            .filter(|tag| wanted.contains(tag))
            .count();
        matched += matches;
        score += matches as f64 * category_weight(category);
    }

    let total = track_tags.total();
    if total > 0 {
        let coverage = matched as f64 / total as f64;
        score *= 1.0 + coverage * COVERAGE_BONUS;
    }
    score
}

/// Jaccard similarity over the union of all four categories.
#[must_use]
pub fn tag_similarity(a: &TagSets, b: &TagSets) -> f64 {
    let tags_a = a.all_tags();
    let tags_b = b.all_tags();
    let union = tags_a.union(&tags_b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = tags_a.intersection(&tags_b).count();
    intersection as f64 / union as f64
}

/// Similarity-weighted engagement with the listener's history.
///
/// A record for the candidate itself contributes its full behavior weight;
/// any other heard track contributes `similarity × weight` when its tag
/// similarity exceeds `similarity_floor`. The sum is averaged over the
/// history length (0 for an empty history, no division error).
#[must_use]
pub fn behavior_score(
    track_id: &str,
    track_tags: &TagSets,
    history: &[BehaviorRecord],
    catalog: &Catalog,
    similarity_floor: f64,
    now: i64,
) -> f64 {
    if history.is_empty() {
        return 0.0;
    }

    let favorites = favorite_counts(history);
    let candidate_id = normalize_id(track_id);
    let mut score = 0.0;

    for record in history {
        let record_id = normalize_id(&record.track_id);
        let count = favorites.get(&record_id).copied().unwrap_or(0);
        if record_id == candidate_id {
            score += behavior_weight(record, count, now);
        } else if let Some(record_tags) = catalog.lookup(&record.track_id) {
            let similarity = tag_similarity(track_tags, record_tags);
            if similarity > similarity_floor {
                score += similarity * behavior_weight(record, count, now);
            }
        }
    }

    score / history.len() as f64
}

/// Combined rank value.
#[must_use]
pub fn final_score(content: f64, behavior: f64) -> f64 {
    content * CONTENT_WEIGHT + behavior * BEHAVIOR_WEIGHT
}

/// Keeps positive scores and sorts them descending. The sort is stable, so
/// ties keep their original (catalog) order.
#[must_use]
pub fn rank(mut candidates: Vec<ScoredCandidate>) -> Vec<ScoredCandidate> {
    candidates.retain(|c| c.score > 0.0);
    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    candidates
}
