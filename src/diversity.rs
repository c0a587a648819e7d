//! Diversity filtering of ranked candidates.

use crate::catalog::Catalog;
use crate::scoring::{tag_similarity, ScoredCandidate};

/// Pairwise similarity cutoff: a kept pair is always strictly below this.
pub const MAX_PAIRWISE_SIMILARITY: f64 = 0.7;

/// Greedy forward scan over the ranked list.
///
/// A candidate is kept iff its Jaccard similarity to every already-kept
/// candidate is strictly below `max_similarity`. Candidates whose tags the
/// catalog cannot resolve are dropped, never auto-kept.
///
/// Quadratic in the number of kept candidates. Acceptable at current
/// catalog scale; revisit before pointing this at a much larger corpus.
#[must_use]
pub fn ensure_diversity(
    ranked: &[ScoredCandidate],
    catalog: &Catalog,
    max_similarity: f64,
) -> Vec<ScoredCandidate> {
    let mut kept: Vec<&ScoredCandidate> = Vec::new();
    let mut kept_tags: Vec<&crate::tags::TagSets> = Vec::new();

    for candidate in ranked {
        let Some(tags) = catalog.lookup(&candidate.track_id) else {
            continue;
        };
        let diverse = kept_tags
            .iter()
            .all(|existing| tag_similarity(tags, existing) < max_similarity);
        if diverse {
            kept.push(candidate);
            kept_tags.push(tags);
        }
    }

    kept.into_iter().cloned().collect()
}
