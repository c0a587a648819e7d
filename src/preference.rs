//! Listener preference model.
//!
//! Explicit preferences are a per-category snapshot of declared tags with a
//! weight per tag; implicit preferences are mined from the behavior history.
//! Ranking uses the union of both.

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::behavior::{behavior_weight, favorite_counts, BehaviorRecord};
use crate::catalog::{normalize_id, Catalog};
use crate::tags::{Category, TagSets};

/// How many implicit tags per category survive extraction.
pub const IMPLICIT_TAGS_PER_CATEGORY: usize = 5;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CategoryPrefs {
    tags: Vec<String>,
    weights: BTreeMap<String, u32>,
}

/// Explicitly declared preferences with a weight per tag.
///
/// Invariant: a tag appears in the ordered list iff it has a weight entry.
/// All mutation goes through [`add`](PreferenceSnapshot::add),
/// [`remove`](PreferenceSnapshot::remove) and
/// [`clear`](PreferenceSnapshot::clear), which maintain both sides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreferenceSnapshot {
    genres: CategoryPrefs,
    instruments: CategoryPrefs,
    moods: CategoryPrefs,
    themes: CategoryPrefs,
}

impl PreferenceSnapshot {
    fn category(&self, category: Category) -> &CategoryPrefs {
        match category {
            Category::Genre => &self.genres,
            Category::Instrument => &self.instruments,
            Category::Mood => &self.moods,
            Category::Theme => &self.themes,
        }
    }

    fn category_mut(&mut self, category: Category) -> &mut CategoryPrefs {
        match category {
            Category::Genre => &mut self.genres,
            Category::Instrument => &mut self.instruments,
            Category::Mood => &mut self.moods,
            Category::Theme => &mut self.themes,
        }
    }

    /// Declares a tag. A new tag starts at weight 1; declaring it again
    /// increments the weight, which is how favoriting the same kind of
    /// track over and over becomes the strongest signal.
    pub fn add(&mut self, category: Category, tag: &str) {
        let prefs = self.category_mut(category);
        if let Some(weight) = prefs.weights.get_mut(tag) {
            *weight += 1;
        } else {
            prefs.tags.push(tag.to_string());
            prefs.weights.insert(tag.to_string(), 1);
        }
    }

    /// Restores a tag with a known weight, used when rehydrating a stored
    /// snapshot. An already-present tag is overwritten.
    pub fn insert_weighted(&mut self, category: Category, tag: &str, weight: u32) {
        let prefs = self.category_mut(category);
        if prefs.weights.insert(tag.to_string(), weight.max(1)).is_none() {
            prefs.tags.push(tag.to_string());
        }
    }

    /// Removes a tag and its weight entry. Returns whether it was present.
    pub fn remove(&mut self, category: Category, tag: &str) -> bool {
        let prefs = self.category_mut(category);
        if prefs.weights.remove(tag).is_some() {
            prefs.tags.retain(|t| t != tag);
            true
        } else {
            false
        }
    }

    /// Wholesale reset, the only way to drop everything at once.
    pub fn clear(&mut self) {
        *self = PreferenceSnapshot::default();
    }

    #[must_use]
    pub fn weight(&self, category: Category, tag: &str) -> Option<u32> {
        self.category(category).weights.get(tag).copied()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        Category::ALL.iter().all(|&c| self.category(c).tags.is_empty())
    }

    /// The declared tag lists, in declaration order, weights dropped.
    #[must_use]
    pub fn tag_sets(&self) -> TagSets {
        let mut sets = TagSets::default();
        for category in Category::ALL {
            *sets.get_mut(category) = self.category(category).tags.clone();
        }
        sets
    }

    /// Iterates `(category, tag, weight)` in declaration order, for
    /// persistence and display.
    pub fn iter(&self) -> impl Iterator<Item = (Category, &str, u32)> {
        Category::ALL.into_iter().flat_map(move |category| {
            let prefs = self.category(category);
            prefs
                .tags
                .iter()
                .map(move |tag| (category, tag.as_str(), prefs.weights[tag]))
        })
    }
}

/// Mines implicit preferences from the behavior history.
///
/// Every tag on a listened track accumulates that record's behavior weight;
/// the top [`IMPLICIT_TAGS_PER_CATEGORY`] tags per category survive. Ties
/// break by deterministic lexicographic order, not randomly. Records whose
/// track the catalog cannot resolve contribute nothing.
#[must_use]
pub fn extract_implicit(history: &[BehaviorRecord], catalog: &Catalog, now: i64) -> TagSets {
    let favorites = favorite_counts(history);
    let mut scores: [BTreeMap<&str, f64>; 4] = Default::default();

    for record in history {
        let Some(track_tags) = catalog.lookup(&record.track_id) else {
            continue;
        };
        let count = favorites
            .get(&normalize_id(&record.track_id))
            .copied()
            .unwrap_or(0);
        let weight = behavior_weight(record, count, now);
        for (slot, category) in scores.iter_mut().zip(Category::ALL) {
            for tag in track_tags.get(category) {
                *slot.entry(tag.as_str()).or_default() += weight;
            }
        }
    }

    let mut implicit = TagSets::default();
    for (slot, category) in scores.iter().zip(Category::ALL) {
        *implicit.get_mut(category) = top_tags(slot, IMPLICIT_TAGS_PER_CATEGORY);
    }
    debug!("Implicit preferences: {implicit:?}");
    implicit
}

/// Top `n` tags by accumulated score. The map iterates lexicographically
/// and the sort is stable, so equal scores keep that order.
fn top_tags(scores: &BTreeMap<&str, f64>, n: usize) -> Vec<String> {
    let mut ranked: Vec<(&str, f64)> = scores.iter().map(|(&tag, &s)| (tag, s)).collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked
        .into_iter()
        .take(n)
        .map(|(tag, _)| tag.to_string())
        .collect()
}

/// Merges explicit and implicit preferences per category: the union, with
/// explicit tags first and implicit ones appended without duplicates.
///
/// Ranking treats both sources equally; there is no numeric gate between
/// them.
#[must_use]
pub fn merge_preferences(explicit: &TagSets, implicit: &TagSets) -> TagSets {
    let mut merged = TagSets::default();
    for category in Category::ALL {
        let out = merged.get_mut(category);
        out.extend(explicit.get(category).iter().cloned());
        for tag in implicit.get(category) {
            if !out.contains(tag) {
                out.push(tag.clone());
            }
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    const NOW: i64 = 1_700_000_000;

    #[test]
    fn add_starts_at_one_and_increments() {
        let mut prefs = PreferenceSnapshot::default();
        prefs.add(Category::Genre, "rock");
        assert_eq!(prefs.weight(Category::Genre, "rock"), Some(1));

        prefs.add(Category::Genre, "rock");
        prefs.add(Category::Genre, "rock");
        assert_eq!(prefs.weight(Category::Genre, "rock"), Some(3));
        assert_eq!(prefs.tag_sets().genres, vec!["rock"]);
    }

    #[test]
    fn remove_drops_tag_and_weight_together() {
        let mut prefs = PreferenceSnapshot::default();
        prefs.add(Category::Mood, "happy");
        prefs.add(Category::Mood, "calm");
        assert!(prefs.remove(Category::Mood, "happy"));
        assert!(!prefs.remove(Category::Mood, "happy"));
        assert_eq!(prefs.weight(Category::Mood, "happy"), None);
        assert_eq!(prefs.tag_sets().moods, vec!["calm"]);
    }

    #[test]
    fn list_and_weights_always_agree() {
        let mut prefs = PreferenceSnapshot::default();
        prefs.add(Category::Theme, "summer");
        prefs.add(Category::Theme, "night");
        prefs.insert_weighted(Category::Theme, "road", 4);
        prefs.remove(Category::Theme, "night");

        for (category, tag, weight) in prefs.iter() {
            assert_eq!(prefs.weight(category, tag), Some(weight));
        }
        assert_eq!(prefs.tag_sets().themes.len(), 2);
    }

    #[test]
    fn clear_resets_everything() {
        let mut prefs = PreferenceSnapshot::default();
        prefs.add(Category::Genre, "rock");
        prefs.add(Category::Instrument, "guitar");
        prefs.clear();
        assert!(prefs.is_empty());
        assert_eq!(prefs.weight(Category::Genre, "rock"), None);
    }

    #[test]
    fn merge_is_union_with_explicit_first() {
        let explicit = TagSets {
            genres: vec!["rock".to_string(), "jazz".to_string()],
            ..TagSets::default()
        };
        let implicit = TagSets {
            genres: vec!["jazz".to_string(), "metal".to_string()],
            moods: vec!["happy".to_string()],
            ..TagSets::default()
        };
        let merged = merge_preferences(&explicit, &implicit);
        assert_eq!(merged.genres, vec!["rock", "jazz", "metal"]);
        assert_eq!(merged.moods, vec!["happy"]);
    }

    fn test_catalog() -> Catalog {
        Catalog::parse(
            "ID\tA\tB\tC\tD\tTAGS\n\
             1\tx\tx\tx\tx\tgenre---rock\tmood---happy\n\
             2\tx\tx\tx\tx\tgenre---rock\tgenre---metal\n\
             3\tx\tx\tx\tx\tgenre---jazz\tinstrument---piano\n",
        )
        .unwrap()
    }

    fn listened(track_id: &str, rating: u8) -> BehaviorRecord {
        BehaviorRecord {
            track_id: track_id.to_string(),
            rating,
            listen_duration: 60,
            favorited: false,
            timestamp: NOW - 100_000,
        }
    }

    #[test]
    fn implicit_ranks_tags_by_accumulated_weight() {
        let catalog = test_catalog();
        // rock appears on two well-rated tracks, jazz on one poorly-rated.
        let history = vec![listened("1", 5), listened("2", 5), listened("3", 1)];
        let implicit = extract_implicit(&history, &catalog, NOW);
        assert_eq!(implicit.genres[0], "rock");
        assert!(implicit.genres.contains(&"jazz".to_string()));
        assert_eq!(implicit.moods, vec!["happy"]);
    }

    #[test]
    fn implicit_caps_tags_per_category() {
        let mut corpus = String::from("ID\tA\tB\tC\tD\tTAGS\n");
        for i in 1..=8 {
            corpus.push_str(&format!("{i}\tx\tx\tx\tx\tgenre---g{i}\n"));
        }
        let catalog = Catalog::parse(&corpus).unwrap();
        let history: Vec<BehaviorRecord> =
            (1..=8).map(|i| listened(&i.to_string(), 3)).collect();
        let implicit = extract_implicit(&history, &catalog, NOW);
        assert_eq!(implicit.genres.len(), IMPLICIT_TAGS_PER_CATEGORY);
    }

    #[test]
    fn implicit_skips_unresolvable_tracks() {
        let catalog = test_catalog();
        let history = vec![listened("999", 5)];
        let implicit = extract_implicit(&history, &catalog, NOW);
        assert!(implicit.is_empty());
    }

    #[test]
    fn implicit_ties_break_deterministically() {
        let catalog = Catalog::parse(
            "ID\tA\tB\tC\tD\tTAGS\n\
             1\tx\tx\tx\tx\tgenre---zeta\tgenre---alpha\n",
        )
        .unwrap();
        let history = vec![listened("1", 3)];
        let a = extract_implicit(&history, &catalog, NOW);
        let b = extract_implicit(&history, &catalog, NOW);
        assert_eq!(a, b);
        // Equal scores: lexicographic order wins.
        assert_eq!(a.genres, vec!["alpha", "zeta"]);
    }
}
