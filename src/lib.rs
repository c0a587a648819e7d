//! Recommendation engine that selects which tracks to present next to a
//! listener, given a tagged track catalog, declared preferences, and a log
//! of past listening behavior.
//!
//! Core modules:
//! - [`catalog`] - Tagged track corpus and identifier normalization
//! - [`preference`] - Explicit snapshot, implicit extraction, merge
//! - [`behavior`] - Behavior records and event weighting
//! - [`scoring`] - Content and behavior scoring, ranking
//! - [`diversity`] - Pairwise-similarity filtering
//! - [`engine`] - Orchestration: exclusion, cold start, backfill, explain
//!
//! ### Supporting Modules
//!
//! - [`store`] - SQLite persistence of the listener profile
//! - [`config`] - Data directory and catalog path resolution
//! - [`cli`] - Command-line interface definitions
//!
//! ## Quick Start Example
//!
//! ```no_run
//! use serenade::catalog::Catalog;
//! use serenade::engine::Engine;
//! use serenade::tags::TagSets;
//! use anyhow::Result;
//!
//! # fn run() -> Result<()> {
//! let catalog = Catalog::load(std::path::Path::new("raw.tsv"))?;
//! let engine = Engine::new(catalog);
//!
//! let explicit = TagSets {
//!     genres: vec!["rock".to_string()],
//!     ..TagSets::default()
//! };
//! let recs = engine.recommend(&explicit, &[], None, 3, &TagSets::default(), &[]);
//! for (id, score) in recs.track_ids.iter().zip(&recs.scores) {
//!     println!("{id}: {score:.3}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Algorithm Outline
//!
//! A request scores every catalog track: a content score counts tag matches
//! against the merged (explicit ∪ implicit) preferences under per-category
//! weights with a coverage bonus, and a behavior score credits direct and
//! similarity-weighted engagement with the listening history. Excluded
//! tracks (current, already heard, already recommended, or carrying a
//! disliked tag) keep zero-score entries. Survivors are ranked, passed
//! through a greedy diversity filter, and backfilled to the requested count
//! when diversity under-delivers. With no preferences and no history the
//! engine falls back to small random scores so it still delivers.
//!
//! ## Error Handling
//!
//! Fallible operations return `anyhow::Result`. The only fatal condition
//! is a missing or empty catalog at startup; per-track resolution failures
//! are absences, not errors.

pub mod behavior;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod diversity;
pub mod engine;
pub mod preference;
pub mod scoring;
pub mod store;
pub mod tags;
