//! # Serenade
//!
//! Tag-driven music recommendations from listening behavior. The library
//! does the work; this binary wires the CLI to the engine and the listener
//! store.
//!
//! ```bash
//! # Declare what you like
//! serenade prefer genre rock
//!
//! # Log listening behavior
//! serenade record track_1234 --rating 5 --duration 90 --favorite
//!
//! # Ask for the next tracks
//! serenade recommend --count 3
//! ```
//!
//! Logging is controlled via `RUST_LOG`, e.g.
//! `RUST_LOG=serenade=debug serenade recommend`.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::info;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use serenade::behavior::BehaviorRecord;
use serenade::catalog::Catalog;
use serenade::cli::{self, Args};
use serenade::config;
use serenade::engine::Engine;
use serenade::store::Store;
use serenade::tags::{Category, TagSets};

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let store_path = match &args.store {
        Some(path) => path.clone(),
        None => config::store_path()?,
    };
    let mut store = Store::open(&store_path)?;

    match args.command {
        cli::Command::Prefer { category, tags } => {
            let category = parse_category(&category)?;
            let mut snapshot = store.load_preferences()?;
            for tag in &tags {
                snapshot.add(category, tag);
            }
            store.save_preferences(&snapshot)?;
            info!("Declared {} {} tag(s)", tags.len(), category);
            print_preferences(&store)?;
        }
        cli::Command::Unprefer { category, tags } => {
            let category = parse_category(&category)?;
            let mut snapshot = store.load_preferences()?;
            let mut removed = 0;
            for tag in &tags {
                if snapshot.remove(category, tag) {
                    removed += 1;
                }
            }
            store.save_preferences(&snapshot)?;
            info!("Removed {removed} {category} tag(s)");
            print_preferences(&store)?;
        }
        cli::Command::Reset => {
            store.clear_preferences()?;
            println!("Preferences cleared. Behavior history kept.");
        }
        cli::Command::Record {
            track_id,
            rating,
            duration,
            favorite,
        } => {
            if rating > 5 {
                return Err(anyhow!("Rating must be 0-5, got {rating}"));
            }
            let record = BehaviorRecord {
                track_id: track_id.clone(),
                rating,
                listen_duration: duration,
                favorited: favorite,
                timestamp: unix_now(),
            };
            store.append_behavior(&record)?;

            // Favoriting is the strongest declared-preference signal: fold
            // the track's tags into the snapshot, incrementing repeats.
            if favorite {
                let catalog = load_catalog(args.catalog.clone())?;
                if let Some(track_tags) = catalog.lookup(&track_id) {
                    let mut snapshot = store.load_preferences()?;
                    for category in Category::ALL {
                        for tag in track_tags.get(category) {
                            snapshot.add(category, tag);
                        }
                    }
                    store.save_preferences(&snapshot)?;
                    info!("Folded favorited track's tags into preferences");
                }
            }
            println!("Recorded {track_id} (rating {rating}, {duration}s, favorite: {favorite})");
        }
        cli::Command::Recommend {
            count,
            current,
            exclude_tags,
            exclude_ids,
        } => {
            let engine = Engine::new(load_catalog(args.catalog)?);
            let explicit = store.load_preferences()?.tag_sets();
            let history = store.load_history()?;
            let excluded_tags = parse_excluded_tags(&exclude_tags)?;

            let recs = engine.recommend(
                &explicit,
                &history,
                current.as_deref(),
                count,
                &excluded_tags,
                &exclude_ids,
            );
            for (track_id, score) in recs.track_ids.iter().zip(&recs.scores) {
                println!("{track_id}\t{score:.3}");
            }
        }
        cli::Command::Explain { track_id } => {
            let engine = Engine::new(load_catalog(args.catalog)?);
            let explicit = store.load_preferences()?.tag_sets();
            let history = store.load_history()?;
            let merged = engine.merged_preferences(&explicit, &history);

            match engine.explain(&merged, &history, &track_id) {
                Some(explanation) => {
                    println!("Track {track_id}");
                    println!("  content score:  {:.3}", explanation.content_score);
                    println!("  behavior score: {:.3}", explanation.behavior_score);
                    println!("  final score:    {:.3}", explanation.final_score);
                    print_tag_sets("  matched", &explanation.matched_tags);
                    print_tag_sets("  track", &explanation.track_tags);
                }
                None => println!("Track {track_id} is not in the catalog."),
            }
        }
        cli::Command::Prefs => {
            print_preferences(&store)?;
        }
        cli::Command::History => {
            let history = store.load_history()?;
            if history.is_empty() {
                println!("No behavior recorded yet.");
            }
            for record in history {
                println!(
                    "{}\trating {}\t{}s\tfavorite: {}\t@{}",
                    record.track_id,
                    record.rating,
                    record.listen_duration,
                    record.favorited,
                    record.timestamp
                );
            }
        }
    }

    Ok(())
}

/// Catalog load is the one blocking I/O step; a failed load aborts the
/// command instead of serving on an empty catalog.
fn load_catalog(explicit: Option<PathBuf>) -> Result<Catalog> {
    let path = config::resolve_catalog_path(explicit.as_deref())?;
    Catalog::load(&path)
}

fn parse_category(name: &str) -> Result<Category> {
    Category::parse(name)
        .ok_or_else(|| anyhow!("Unknown category `{name}'; use genre, instrument, mood or theme"))
}

/// Parses repeated `category:tag` options into per-category tag sets.
fn parse_excluded_tags(pairs: &[String]) -> Result<TagSets> {
    let mut excluded = TagSets::default();
    for pair in pairs {
        let (category, tag) = pair
            .split_once(':')
            .with_context(|| format!("Expected CATEGORY:TAG, got `{pair}'"))?;
        let category = parse_category(category)?;
        excluded.get_mut(category).push(tag.trim().to_string());
    }
    Ok(excluded)
}

fn print_preferences(store: &Store) -> Result<()> {
    let snapshot = store.load_preferences()?;
    if snapshot.is_empty() {
        println!("No preferences declared.");
        return Ok(());
    }
    for category in Category::ALL {
        let tags: Vec<String> = snapshot
            .iter()
            .filter(|(c, _, _)| *c == category)
            .map(|(_, tag, weight)| format!("{tag}({weight})"))
            .collect();
        if !tags.is_empty() {
            println!("{}: {}", category, tags.join(", "));
        }
    }
    Ok(())
}

fn print_tag_sets(label: &str, tags: &TagSets) {
    for category in Category::ALL {
        let list = tags.get(category);
        if !list.is_empty() {
            println!("{label} {}: {}", category, list.join(", "));
        }
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
