//! Behavior records and the weighting of a single listening event.
//!
//! Each event turns into one scalar importance via [`behavior_weight`]:
//! rating and listen duration are bucketed, favoriting multiplies, and a
//! favorite placed within the last 24 hours gets a linearly decaying boost.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::catalog::normalize_id;

/// One listening event as the engine reads it: append-only, most recent
/// first. Missing fields deserialize to their documented defaults
/// (0 = unrated, 0 seconds, not favorited).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorRecord {
    pub track_id: String,
    /// 0–5; 0 means unrated.
    #[serde(default)]
    pub rating: u8,
    /// Seconds listened before the track changed.
    #[serde(default)]
    pub listen_duration: u32,
    #[serde(default)]
    pub favorited: bool,
    /// Unix timestamp in seconds.
    #[serde(default)]
    pub timestamp: i64,
}

/// Recency window inside which a favorite earns an extra boost.
const FAVORITE_RECENCY_WINDOW_HOURS: f64 = 24.0;

/// Importance of a single behavior record.
///
/// `favorite_count` is how often this record's track was favorited across
/// the entire supplied history (see [`favorite_counts`]); `now` is the unix
/// time the request is evaluated at.
///
/// Sub-weights:
/// - rating: 5→1.0, 4→0.8, 3→0.5, 2→0.2, else 0.1
/// - duration: ≥60s→1.0, ≥30s→0.7, ≥10s→0.4, else 0.1
/// - favorite: 1.0 baseline; favorited tracks start at 1.5 and gain 0.3 per
///   repeat favorite, times a recency boost of up to +50% that decays to
///   zero over 24 hours.
///
/// Final weight is `(rating×0.6 + duration×0.3) × favorite`.
#[must_use]
pub fn behavior_weight(record: &BehaviorRecord, favorite_count: u32, now: i64) -> f64 {
    let rating_weight = match record.rating {
        5 => 1.0,
        4 => 0.8,
        3 => 0.5,
        2 => 0.2,
        _ => 0.1,
    };

    let duration_weight = match record.listen_duration {
        d if d >= 60 => 1.0,
        d if d >= 30 => 0.7,
        d if d >= 10 => 0.4,
        _ => 0.1,
    };

    let mut favorite_weight = 1.0;
    if record.favorited {
        favorite_weight = 1.5 + 0.3 * f64::from(favorite_count.saturating_sub(1));

        // Clock skew can put records in the future; treat those as "just now".
        let hours_ago = ((now - record.timestamp) as f64 / 3600.0).max(0.0);
        if hours_ago < FAVORITE_RECENCY_WINDOW_HOURS {
            favorite_weight *= 1.0
                + (FAVORITE_RECENCY_WINDOW_HOURS - hours_ago) / FAVORITE_RECENCY_WINDOW_HOURS * 0.5;
        }
    }

    (rating_weight * 0.6 + duration_weight * 0.3) * favorite_weight
}

/// Favorite counts per normalized track id across the whole history.
///
/// Computed once, before any record is weighted, so that `track_123` and
/// `123` never double-count.
#[must_use]
pub fn favorite_counts(history: &[BehaviorRecord]) -> HashMap<String, u32> {
    let mut counts: HashMap<String, u32> = HashMap::new();
    for record in history {
        if record.favorited {
            *counts.entry(normalize_id(&record.track_id)).or_default() += 1;
        }
    }
    counts
}
