//! Track catalog loaded from the tagged corpus.
//!
//! The corpus is a tab-separated file: column 0 is the track id, columns 5
//! and beyond carry `category---`-prefixed tags. The catalog is loaded once
//! at startup into an immutable value owned by the engine; a failed load is
//! a fatal startup error, never a half-populated catalog.

use anyhow::{bail, Context, Result};
use log::info;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::tags::TagSets;

/// Canonical form of a track identifier.
///
/// Ids appear in two interchangeable textual forms, bare numeric (`1234`)
/// and prefixed (`track_1234`), sometimes with leading zeros. Both must
/// compare equal, so every boundary (catalog load, exclusion construction,
/// scoring, the store) goes through this one function.
#[must_use]
pub fn normalize_id(id: &str) -> String {
    let s = id.trim();
    let s = s.strip_prefix("track_").unwrap_or(s);
    let stripped = s.trim_start_matches('0');
    if stripped.is_empty() && !s.is_empty() {
        "0".to_string()
    } else {
        stripped.to_string()
    }
}

/// Immutable track catalog: the ordered id list plus a tag index keyed by
/// normalized id.
#[derive(Debug, Clone)]
pub struct Catalog {
    track_ids: Vec<String>,
    tags: HashMap<String, TagSets>,
}

impl Catalog {
    /// Reads and parses the corpus file.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or contains no tracks. Serving
    /// from a partial or empty catalog is never allowed.
    pub fn load(path: &Path) -> Result<Catalog> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog corpus at {}", path.display()))?;
        let catalog = Catalog::parse(&content)
            .with_context(|| format!("Failed to parse catalog corpus at {}", path.display()))?;
        info!(
            "Loaded {} tracks from {}",
            catalog.track_ids.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// Parses corpus content. The first line is a header and is skipped.
    ///
    /// Rows with fewer than six columns are still listed in the id order but
    /// resolve to no tags; callers treat that as "zero similarity
    /// contribution", not an error.
    ///
    /// # Errors
    ///
    /// Fails when no track rows are present.
    pub fn parse(content: &str) -> Result<Catalog> {
        let mut track_ids = Vec::new();
        let mut tags = HashMap::new();

        for line in content.lines().skip(1) {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let columns: Vec<&str> = line.split('\t').collect();
            let id = columns[0].trim();
            if id.is_empty() {
                continue;
            }
            track_ids.push(id.to_string());
            if columns.len() > 5 {
                tags.insert(normalize_id(id), parse_tag_columns(&columns[5..]));
            }
        }

        if track_ids.is_empty() {
            bail!("catalog corpus contains no tracks");
        }

        Ok(Catalog { track_ids, tags })
    }

    /// Resolves a track id in either textual form to its tags.
    /// Unknown ids return `None`, never an error.
    #[must_use]
    pub fn lookup(&self, id: &str) -> Option<&TagSets> {
        self.tags.get(&normalize_id(id))
    }

    /// All track ids in corpus order, in their original textual form.
    #[must_use]
    pub fn track_ids(&self) -> &[String] {
        &self.track_ids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.track_ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.track_ids.is_empty()
    }
}

/// Splits prefixed tags into categories.
///
/// The combined `mood/theme---` form is written only into the theme
/// category, and must be tested before the plain `mood---` prefix.
/// Unknown prefixes are ignored.
fn parse_tag_columns(columns: &[&str]) -> TagSets {
    let mut tags = TagSets::default();
    for raw in columns {
        let tag = raw.trim();
        if tag.is_empty() {
            continue;
        }
        if let Some(value) = tag.strip_prefix("mood/theme---") {
            tags.themes.push(value.to_string());
        } else if let Some(value) = tag.strip_prefix("genre---") {
            tags.genres.push(value.to_string());
        } else if let Some(value) = tag.strip_prefix("instrument---") {
            tags.instruments.push(value.to_string());
        } else if let Some(value) = tag.strip_prefix("mood---") {
            tags.moods.push(value.to_string());
        } else if let Some(value) = tag.strip_prefix("theme---") {
            tags.themes.push(value.to_string());
        }
    }
    tags
}
