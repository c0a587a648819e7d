//! Core tag vocabulary shared across the engine.
//!
//! Every track in the corpus is annotated with tags in four categories
//! (genre, instrument, mood, theme). The same shape is reused for listener
//! preference tag sets, so matching and similarity work on one type.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// The four tag categories the corpus annotates tracks with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Genre,
    Instrument,
    Mood,
    Theme,
}

impl Category {
    /// All categories, in corpus order.
    pub const ALL: [Category; 4] = [
        Category::Genre,
        Category::Instrument,
        Category::Mood,
        Category::Theme,
    ];

    /// Parses a user-facing category name. Accepts singular and plural forms.
    pub fn parse(name: &str) -> Option<Category> {
        match name.trim().to_ascii_lowercase().as_str() {
            "genre" | "genres" => Some(Category::Genre),
            "instrument" | "instruments" => Some(Category::Instrument),
            "mood" | "moods" => Some(Category::Mood),
            "theme" | "themes" => Some(Category::Theme),
            _ => None,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Category::Genre => "genres",
            Category::Instrument => "instruments",
            Category::Mood => "moods",
            Category::Theme => "themes",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered tag lists split by category.
///
/// Used both for a track's annotations and for preference tag sets
/// (explicit, implicit, merged, excluded). Missing fields deserialize to
/// empty lists: callers supplying partial records get a permissive,
/// uniform default rather than an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSets {
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub instruments: Vec<String>,
    #[serde(default)]
    pub moods: Vec<String>,
    #[serde(default)]
    pub themes: Vec<String>,
}

impl TagSets {
    #[must_use]
    pub fn get(&self, category: Category) -> &[String] {
        match category {
            Category::Genre => &self.genres,
            Category::Instrument => &self.instruments,
            Category::Mood => &self.moods,
            Category::Theme => &self.themes,
        }
    }

    pub fn get_mut(&mut self, category: Category) -> &mut Vec<String> {
        match category {
            Category::Genre => &mut self.genres,
            Category::Instrument => &mut self.instruments,
            Category::Mood => &mut self.moods,
            Category::Theme => &mut self.themes,
        }
    }

    /// True when no category holds any tag.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        Category::ALL.iter().all(|&c| self.get(c).is_empty())
    }

    /// Total tag count across all four categories.
    #[must_use]
    pub fn total(&self) -> usize {
        Category::ALL.iter().map(|&c| self.get(c).len()).sum()
    }

    /// Union of all tags regardless of category, for similarity math.
    #[must_use]
    pub fn all_tags(&self) -> HashSet<&str> {
        Category::ALL
            .iter()
            .flat_map(|&c| self.get(c).iter().map(String::as_str))
            .collect()
    }
}
