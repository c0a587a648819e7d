//! Command-line interface definitions.
//!
//! Clap derive structures only; routing lives in `main.rs`.
//!
//! ```bash
//! serenade prefer genre rock metal
//! serenade record track_1234 --rating 5 --duration 90 --favorite
//! serenade recommend --count 3 --exclude-tag mood:sad
//! serenade explain track_1234
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Main application arguments.
#[derive(Parser)]
#[command(name = "serenade")]
#[command(about = "Serenade: tag-driven music recommendations from listening behavior")]
#[command(version)]
pub struct Args {
    /// Path to the tagged track corpus (TSV).
    ///
    /// Defaults to `raw.tsv` in the working directory, then its parent.
    #[arg(long, global = true, value_name = "FILE")]
    pub catalog: Option<PathBuf>,

    /// Path to the listener store database.
    ///
    /// Defaults to the platform data directory.
    #[arg(long, global = true, value_name = "FILE")]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Declare preferred tags in a category
    ///
    /// New tags start at weight 1; declaring a tag again increments its
    /// weight, so repeated signals (favoriting similar tracks) accumulate.
    Prefer {
        /// Tag category: genre, instrument, mood or theme
        category: String,

        /// Tags to declare
        #[arg(required = true)]
        tags: Vec<String>,
    },

    /// Remove declared tags from a category
    Unprefer {
        /// Tag category: genre, instrument, mood or theme
        category: String,

        /// Tags to remove
        #[arg(required = true)]
        tags: Vec<String>,
    },

    /// Clear all declared preferences
    ///
    /// The behavior history is kept; only the declared tag snapshot is
    /// wiped.
    Reset,

    /// Record a listening event
    ///
    /// Appends one record to the behavior log. Favoriting also declares
    /// the track's tags as preferences, the strongest implicit signal.
    Record {
        /// Track id, bare (`1234`) or prefixed (`track_1234`)
        track_id: String,

        /// Rating 0-5 (0 = unrated)
        #[arg(long, default_value_t = 0)]
        rating: u8,

        /// Seconds listened
        #[arg(long, default_value_t = 0)]
        duration: u32,

        /// Mark the track as favorited
        #[arg(long)]
        favorite: bool,
    },

    /// Recommend tracks for the stored listener profile
    Recommend {
        /// Number of tracks to return
        #[arg(long, short = 'n', default_value_t = 3)]
        count: usize,

        /// Currently playing track, never recommended back
        #[arg(long, value_name = "TRACK_ID")]
        current: Option<String>,

        /// Disliked tag as `category:tag`; tracks carrying it are excluded
        #[arg(long = "exclude-tag", value_name = "CATEGORY:TAG")]
        exclude_tags: Vec<String>,

        /// Track ids to exclude, e.g. already-recommended ones
        #[arg(long = "exclude-id", value_name = "TRACK_ID")]
        exclude_ids: Vec<String>,
    },

    /// Explain why a track matches the stored listener profile
    Explain {
        /// Track id, bare or prefixed
        track_id: String,
    },

    /// Show the declared preference snapshot
    Prefs,

    /// Show the behavior history, most recent first
    History,
}
