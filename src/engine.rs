//! Recommendation orchestrator.
//!
//! Sequences exclusion → scoring → diversity → backfill over the immutable
//! catalog. Each call is stateless: concurrent requests share nothing but
//! the read-only catalog, and "already recommended" bookkeeping is the
//! caller's to serialize.

use log::{debug, trace, warn};
use rand::seq::SliceRandom;
use rand::{thread_rng, Rng};
use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::behavior::BehaviorRecord;
use crate::catalog::{normalize_id, Catalog};
use crate::diversity::{ensure_diversity, MAX_PAIRWISE_SIMILARITY};
use crate::preference::{extract_implicit, merge_preferences};
use crate::scoring::{
    self, behavior_score, content_score, final_score, ScoredCandidate, COLD_START_CEILING,
    CONTENT_WEIGHT, EXPLAIN_SIMILARITY, RANKING_SIMILARITY,
};
use crate::tags::{Category, TagSets};

/// Result of one recommendation request: ids and scores positionally
/// aligned, exactly `count` entries whenever enough eligible tracks exist.
#[derive(Debug, Clone)]
pub struct Recommendations {
    pub track_ids: Vec<String>,
    pub scores: Vec<f64>,
}

/// Why one track was (or would be) recommended.
#[derive(Debug, Clone)]
pub struct Explanation {
    pub content_score: f64,
    pub behavior_score: f64,
    pub final_score: f64,
    pub matched_tags: TagSets,
    pub track_tags: TagSets,
}

/// The engine owns the catalog and exposes the recommendation operations.
#[derive(Debug)]
pub struct Engine {
    catalog: Catalog,
}

impl Engine {
    #[must_use]
    pub fn new(catalog: Catalog) -> Engine {
        Engine { catalog }
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Merged explicit + implicit preferences, exposed so callers (the
    /// explanation path in particular) reuse the exact same merge.
    #[must_use]
    pub fn merged_preferences(
        &self,
        explicit: &TagSets,
        history: &[BehaviorRecord],
    ) -> TagSets {
        let implicit = extract_implicit(history, &self.catalog, unix_now());
        merge_preferences(explicit, &implicit)
    }

    /// Generates up to `count` recommendations.
    ///
    /// Suppressed ids (current track, everything in the history, and
    /// `excluded_ids`) and tracks carrying any tag of `excluded_tags` never
    /// appear. Diversity is a soft constraint: when the diversity tier
    /// under-delivers, the remainder is backfilled from the eligible pool
    /// with score 0 rather than returning fewer than `count`.
    #[must_use]
    pub fn recommend(
        &self,
        explicit: &TagSets,
        history: &[BehaviorRecord],
        current_track_id: Option<&str>,
        count: usize,
        excluded_tags: &TagSets,
        excluded_ids: &[String],
    ) -> Recommendations {
        let now = unix_now();
        let mut rng = thread_rng();

        let mut suppressed: HashSet<String> = HashSet::new();
        if let Some(id) = current_track_id {
            insert_normalized(&mut suppressed, id);
        }
        for record in history {
            insert_normalized(&mut suppressed, &record.track_id);
        }
        for id in excluded_ids {
            insert_normalized(&mut suppressed, id);
        }

        let implicit = extract_implicit(history, &self.catalog, now);
        let merged = merge_preferences(explicit, &implicit);
        debug!(
            "Recommending: {} suppressed ids, {} disliked tags, merged preferences {:?}",
            suppressed.len(),
            excluded_tags.total(),
            merged
        );

        let cold_start = merged.is_empty() && history.is_empty();
        if cold_start {
            debug!("Cold start: no preferences and no history, randomizing scores");
        }

        // One entry per catalog track pre-filter; excluded tracks keep a
        // zero-score entry instead of disappearing.
        let scored: Vec<ScoredCandidate> = self
            .catalog
            .track_ids()
            .iter()
            .map(|track_id| {
                self.score_track(
                    track_id,
                    &merged,
                    history,
                    &suppressed,
                    excluded_tags,
                    cold_start,
                    now,
                    &mut rng,
                )
            })
            .collect();

        let ranked = scoring::rank(scored);
        for candidate in ranked.iter().take(10) {
            trace!(
                "{}: content {:.3} behavior {:.3} final {:.3}",
                candidate.track_id,
                candidate.content_score,
                candidate.behavior_score,
                candidate.score
            );
        }

        if ranked.is_empty() {
            warn!("No track scored above zero, falling back to a random pick");
            let mut pool = self.eligible_ids(&suppressed, excluded_tags, &HashSet::new());
            pool.shuffle(&mut rng);
            pool.truncate(count);
            return Recommendations {
                scores: vec![0.0; pool.len()],
                track_ids: pool,
            };
        }

        let mut kept = ensure_diversity(&ranked, &self.catalog, MAX_PAIRWISE_SIMILARITY);
        kept.truncate(count);

        let mut track_ids: Vec<String> = kept.iter().map(|c| c.track_id.clone()).collect();
        let mut scores: Vec<f64> = kept.iter().map(|c| c.score).collect();

        if track_ids.len() < count {
            let selected: HashSet<String> =
                track_ids.iter().map(|id| normalize_id(id)).collect();
            let mut pool = self.eligible_ids(&suppressed, excluded_tags, &selected);
            pool.shuffle(&mut rng);
            for id in pool.into_iter().take(count - track_ids.len()) {
                track_ids.push(id);
                scores.push(0.0);
            }
            debug!("Diversity under-delivered, backfilled to {}", track_ids.len());
        }

        Recommendations { track_ids, scores }
    }

    /// Explains a single recommendation with the same math as ranking but
    /// the stricter similarity floor. `None` when the id is unresolvable.
    ///
    /// The cold-start override applies here as in ranking: with no merged
    /// preferences and no history the final score is a random draw, while
    /// the content and behavior components stay deterministic zeros.
    #[must_use]
    pub fn explain(
        &self,
        merged: &TagSets,
        history: &[BehaviorRecord],
        track_id: &str,
    ) -> Option<Explanation> {
        let track_tags = self.catalog.lookup(track_id)?;
        let content = content_score(track_tags, merged);
        let behavior = behavior_score(
            track_id,
            track_tags,
            history,
            &self.catalog,
            EXPLAIN_SIMILARITY,
            unix_now(),
        );
        let score = if merged.is_empty() && history.is_empty() {
            thread_rng().gen_range(0.0..COLD_START_CEILING)
        } else {
            final_score(content, behavior)
        };
        Some(build_explanation(track_tags, merged, content, behavior, score))
    }

    /// Explanation from caller-supplied tags, for tracks absent from the
    /// catalog. Behavior score is forced to 0.
    #[must_use]
    pub fn explain_from_tags(&self, merged: &TagSets, track_tags: &TagSets) -> Explanation {
        let content = content_score(track_tags, merged);
        build_explanation(track_tags, merged, content, 0.0, content * CONTENT_WEIGHT)
    }

    #[allow(clippy::too_many_arguments)]
    fn score_track(
        &self,
        track_id: &str,
        merged: &TagSets,
        history: &[BehaviorRecord],
        suppressed: &HashSet<String>,
        excluded_tags: &TagSets,
        cold_start: bool,
        now: i64,
        rng: &mut impl Rng,
    ) -> ScoredCandidate {
        let Some(track_tags) = self.catalog.lookup(track_id) else {
            return ScoredCandidate::zero(track_id);
        };
        if suppressed.contains(&normalize_id(track_id)) {
            return ScoredCandidate::zero(track_id);
        }
        if has_excluded_tag(track_tags, excluded_tags) {
            return ScoredCandidate::zero(track_id);
        }

        if cold_start {
            // Independent draw per candidate so diversity still sees
            // variation.
            return ScoredCandidate {
                score: rng.gen_range(0.0..COLD_START_CEILING),
                ..ScoredCandidate::zero(track_id)
            };
        }

        let content = content_score(track_tags, merged);
        let behavior = behavior_score(
            track_id,
            track_tags,
            history,
            &self.catalog,
            RANKING_SIMILARITY,
            now,
        );
        ScoredCandidate {
            track_id: track_id.to_string(),
            content_score: content,
            behavior_score: behavior,
            score: final_score(content, behavior),
        }
    }

    /// Tracks available to the backfill tiers: not suppressed, not already
    /// selected, not carrying a disliked tag. Tagless tracks are eligible
    /// here even though the diversity tier drops them.
    fn eligible_ids(
        &self,
        suppressed: &HashSet<String>,
        excluded_tags: &TagSets,
        selected: &HashSet<String>,
    ) -> Vec<String> {
        self.catalog
            .track_ids()
            .iter()
            .filter(|id| {
                let normalized = normalize_id(id);
                !suppressed.contains(&normalized) && !selected.contains(&normalized)
            })
            .filter(|id| match self.catalog.lookup(id) {
                Some(tags) => !has_excluded_tag(tags, excluded_tags),
                None => true,
            })
            .cloned()
            .collect()
    }
}

fn insert_normalized(set: &mut HashSet<String>, id: &str) {
    let normalized = normalize_id(id);
    if !normalized.is_empty() {
        set.insert(normalized);
    }
}

/// A track is excluded when it carries any disliked tag in any category.
fn has_excluded_tag(track_tags: &TagSets, excluded: &TagSets) -> bool {
    Category::ALL.iter().any(|&category| {
        let disliked = excluded.get(category);
        !disliked.is_empty()
            && track_tags
                .get(category)
                .iter()
                .any(|tag| disliked.contains(tag))
    })
}

fn build_explanation(
    track_tags: &TagSets,
    merged: &TagSets,
    content: f64,
    behavior: f64,
    final_score: f64,
) -> Explanation {
    let mut matched = TagSets::default();
    for category in Category::ALL {
        let wanted = merged.get(category);
        *matched.get_mut(category) = track_tags
            .get(category)
            .iter()
            .filter(|tag| wanted.contains(tag))
            .cloned()
            .collect();
    }
    Explanation {
        content_score: content,
        behavior_score: behavior,
        final_score,
        matched_tags: matched,
        track_tags: track_tags.clone(),
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    fn engine() -> Engine {
        // Twelve tracks across three distinct tag clusters plus a tagless row.
        let corpus = "ID\tA\tB\tC\tD\tTAGS\n\
            track_0001\tx\tx\tx\tx\tgenre---rock\tinstrument---guitar\tmood---loud\n\
            2\tx\tx\tx\tx\tgenre---rock\tinstrument---drums\tmood---raw\n\
            3\tx\tx\tx\tx\tgenre---rock\tmood---loud\ttheme---road\n\
            4\tx\tx\tx\tx\tgenre---jazz\tinstrument---piano\tmood---calm\n\
            5\tx\tx\tx\tx\tgenre---jazz\tinstrument---sax\tmood---smooth\n\
            6\tx\tx\tx\tx\tgenre---jazz\tmood---calm\ttheme---night\n\
            7\tx\tx\tx\tx\tgenre---electronic\tinstrument---synth\tmood---dark\n\
            8\tx\tx\tx\tx\tgenre---electronic\tmood---upbeat\ttheme---club\n\
            9\tx\tx\tx\tx\tgenre---folk\tinstrument---banjo\tmood---warm\n\
            10\tx\tx\tx\tx\tgenre---folk\tmood---warm\ttheme---home\n\
            11\tx\tx\tx\tx\tgenre---metal\tinstrument---guitar\tmood---loud\n\
            12\tx\tx\tx\tx\n";
        Engine::new(Catalog::parse(corpus).unwrap())
    }

    fn rock_prefs() -> TagSets {
        TagSets {
            genres: vec!["rock".to_string()],
            ..TagSets::default()
        }
    }

    fn heard(track_id: &str) -> BehaviorRecord {
        BehaviorRecord {
            track_id: track_id.to_string(),
            rating: 4,
            listen_duration: 60,
            favorited: false,
            timestamp: 0,
        }
    }

    #[test]
    fn returns_exactly_count_entries() {
        let engine = engine();
        for count in [1, 3, 10] {
            let recs = engine.recommend(&rock_prefs(), &[], None, count, &TagSets::default(), &[]);
            assert_eq!(recs.track_ids.len(), count, "count={count}");
            assert_eq!(recs.scores.len(), count);
        }
    }

    #[test]
    fn excluded_ids_never_appear_in_either_form() {
        let engine = engine();
        let history = vec![heard("track_0001"), heard("2")];
        let excluded = vec!["0003".to_string()];
        let recs = engine.recommend(
            &rock_prefs(),
            &history,
            Some("11"),
            10,
            &TagSets::default(),
            &excluded,
        );
        for id in &recs.track_ids {
            let n = normalize_id(id);
            assert!(!["1", "2", "3", "11"].contains(&n.as_str()), "leaked {id}");
        }
    }

    #[test]
    fn disliked_tags_never_appear() {
        let engine = engine();
        let disliked = TagSets {
            genres: vec!["jazz".to_string()],
            moods: vec!["loud".to_string()],
            ..TagSets::default()
        };
        let recs = engine.recommend(&rock_prefs(), &[], None, 10, &disliked, &[]);
        for id in &recs.track_ids {
            if let Some(tags) = engine.catalog().lookup(id) {
                assert!(!tags.genres.contains(&"jazz".to_string()), "leaked {id}");
                assert!(!tags.moods.contains(&"loud".to_string()), "leaked {id}");
            }
        }
        assert!(!recs.track_ids.is_empty());
    }

    #[test]
    fn cold_start_randomizes_but_still_delivers() {
        let engine = engine();
        let recs = engine.recommend(&TagSets::default(), &[], None, 3, &TagSets::default(), &[]);
        assert_eq!(recs.track_ids.len(), 3);
        for score in &recs.scores {
            assert!(*score >= 0.0 && *score < COLD_START_CEILING);
        }
    }

    #[test]
    fn scored_tier_ranks_matching_tracks_first() {
        let engine = engine();
        let recs = engine.recommend(&rock_prefs(), &[], None, 3, &TagSets::default(), &[]);
        // The best-scored entry must be a rock track.
        let top_tags = engine.catalog().lookup(&recs.track_ids[0]).unwrap();
        assert!(top_tags.genres.contains(&"rock".to_string()));
        assert!(recs.scores[0] > 0.0);
    }

    #[test]
    fn backfill_tops_up_when_few_tracks_score() {
        let engine = engine();
        // Only one track carries metal, so the scored tier has one entry;
        // backfill must still deliver five.
        let prefs = TagSets {
            genres: vec!["metal".to_string()],
            ..TagSets::default()
        };
        let recs = engine.recommend(&prefs, &[], None, 5, &TagSets::default(), &[]);
        assert_eq!(recs.track_ids.len(), 5);
        assert_eq!(normalize_id(&recs.track_ids[0]), "11");
        assert!(recs.scores[0] > 0.0);
        assert!(recs.scores[1..].iter().all(|s| *s == 0.0));
    }

    #[test]
    fn impossible_preferences_fall_back_to_random_eligible() {
        let engine = engine();
        let prefs = TagSets {
            genres: vec!["zydeco".to_string()],
            ..TagSets::default()
        };
        let history = vec![heard("unknown_track")];
        let recs = engine.recommend(&prefs, &history, None, 3, &TagSets::default(), &[]);
        assert_eq!(recs.track_ids.len(), 3);
        assert!(recs.scores.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn fewer_eligible_than_count_returns_what_exists() {
        let corpus = "ID\tA\tB\tC\tD\tTAGS\n\
            1\tx\tx\tx\tx\tgenre---rock\n\
            2\tx\tx\tx\tx\tgenre---jazz\n";
        let engine = Engine::new(Catalog::parse(corpus).unwrap());
        let recs = engine.recommend(
            &rock_prefs(),
            &[],
            Some("2"),
            5,
            &TagSets::default(),
            &[],
        );
        assert_eq!(recs.track_ids.len(), 1);
        assert_eq!(recs.track_ids[0], "1");
    }

    #[test]
    fn diversity_tier_respects_pairwise_bound() {
        let engine = engine();
        let prefs = TagSets {
            genres: vec!["rock".to_string(), "jazz".to_string()],
            ..TagSets::default()
        };
        let recs = engine.recommend(&prefs, &[], None, 6, &TagSets::default(), &[]);
        let scored: Vec<&String> = recs
            .track_ids
            .iter()
            .zip(&recs.scores)
            .filter(|(_, s)| **s > 0.0)
            .map(|(id, _)| id)
            .collect();
        for (i, a) in scored.iter().enumerate() {
            for b in &scored[i + 1..] {
                let sim = crate::scoring::tag_similarity(
                    engine.catalog().lookup(a).unwrap(),
                    engine.catalog().lookup(b).unwrap(),
                );
                assert!(sim < MAX_PAIRWISE_SIMILARITY);
            }
        }
    }

    #[test]
    fn history_feeds_implicit_preferences() {
        let engine = engine();
        // Heavy engagement with jazz tracks should surface jazz without any
        // explicit preference.
        let history = vec![heard("4"), heard("5"), heard("6")];
        let merged = engine.merged_preferences(&TagSets::default(), &history);
        assert!(merged.genres.contains(&"jazz".to_string()));
    }

    #[test]
    fn explain_reports_matched_tags() {
        let engine = engine();
        let merged = engine.merged_preferences(&rock_prefs(), &[]);
        let explanation = engine.explain(&merged, &[], "track_0001").unwrap();
        assert_eq!(explanation.matched_tags.genres, vec!["rock"]);
        assert!(explanation.content_score > 0.0);
        assert_eq!(explanation.behavior_score, 0.0);
        assert!(
            (explanation.final_score - explanation.content_score * CONTENT_WEIGHT).abs() < 1e-9
        );
    }

    #[test]
    fn explain_on_cold_start_randomizes_only_the_final_score() {
        let engine = engine();
        let explanation = engine
            .explain(&TagSets::default(), &[], "track_0001")
            .unwrap();
        assert_eq!(explanation.content_score, 0.0);
        assert_eq!(explanation.behavior_score, 0.0);
        assert!(explanation.final_score >= 0.0);
        assert!(explanation.final_score < COLD_START_CEILING);
    }

    #[test]
    fn explain_unresolvable_is_none() {
        let engine = engine();
        assert!(engine.explain(&rock_prefs(), &[], "999").is_none());
        // Tagless row: listed in the catalog but resolves to no tags.
        assert!(engine.explain(&rock_prefs(), &[], "12").is_none());
    }

    #[test]
    fn explain_from_tags_forces_behavior_to_zero() {
        let engine = engine();
        let tags = TagSets {
            genres: vec!["rock".to_string()],
            ..TagSets::default()
        };
        let explanation = engine.explain_from_tags(&rock_prefs(), &tags);
        assert_eq!(explanation.behavior_score, 0.0);
        assert!((explanation.final_score - explanation.content_score * CONTENT_WEIGHT).abs() < 1e-9);
        assert_eq!(explanation.matched_tags.genres, vec!["rock"]);
    }
}
