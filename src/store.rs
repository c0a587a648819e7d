//! SQLite persistence for the listener's preference snapshot and behavior
//! log.
//!
//! The engine itself never touches the database: the CLI loads a consistent
//! snapshot here and hands plain structs to the engine. Callers that need
//! "already recommended" exclusion to hold under concurrent writers must
//! serialize access themselves; this store takes no locks beyond SQLite's.

use anyhow::{Context, Result};
use log::trace;
use rusqlite::Connection;
use std::path::Path;

use crate::behavior::BehaviorRecord;
use crate::preference::PreferenceSnapshot;
use crate::tags::Category;

pub struct Store {
    conn: Connection,
}

impl Store {
    /// Opens (and if necessary creates) the store at `path`.
    pub fn open(path: &Path) -> Result<Store> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open listener store at {}", path.display()))?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS preference (
                id       INTEGER PRIMARY KEY,
                category TEXT    NOT NULL,
                tag      TEXT    NOT NULL,
                weight   INTEGER NOT NULL,
                position INTEGER NOT NULL,
                UNIQUE(category, tag)
            );
            CREATE TABLE IF NOT EXISTS behavior (
                id              INTEGER PRIMARY KEY,
                track_id        TEXT    NOT NULL,
                rating          INTEGER NOT NULL DEFAULT 0,
                listen_duration INTEGER NOT NULL DEFAULT 0,
                favorited       INTEGER NOT NULL DEFAULT 0,
                timestamp       INTEGER NOT NULL
            );",
        )
        .context("Failed to initialize listener store schema")?;

        Ok(Store { conn })
    }

    /// Loads the persisted preference snapshot, in declaration order.
    pub fn load_preferences(&self) -> Result<PreferenceSnapshot> {
        let mut stmt = self
            .conn
            .prepare("SELECT category, tag, weight FROM preference ORDER BY position")
            .context("Failed to prepare preference SELECT")?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, u32>(2)?,
                ))
            })
            .context("Cannot query preferences")?;

        let mut snapshot = PreferenceSnapshot::default();
        for row in rows {
            let (category, tag, weight) = row.context("Queried preference row failed")?;
            if let Some(category) = Category::parse(&category) {
                snapshot.insert_weighted(category, &tag, weight);
            } else {
                trace!("Skipping preference row with unknown category `{category}'");
            }
        }
        Ok(snapshot)
    }

    /// Replaces the stored snapshot with `snapshot`, atomically.
    pub fn save_preferences(&mut self, snapshot: &PreferenceSnapshot) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            tx.execute("DELETE FROM preference", ())
                .context("Failed to clear old preference snapshot")?;
            let mut stmt = tx.prepare(
                "INSERT INTO preference (category, tag, weight, position) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (position, (category, tag, weight)) in snapshot.iter().enumerate() {
                stmt.execute((category.name(), tag, weight, position as i64))
                    .with_context(|| {
                        format!("Failed to INSERT preference `{category}/{tag}'")
                    })?;
            }
        }
        tx.commit().context("Committing preference snapshot failed")?;
        Ok(())
    }

    /// Drops all declared preferences. The behavior log is untouched; a
    /// reset listener keeps their history.
    pub fn clear_preferences(&self) -> Result<()> {
        self.conn
            .execute("DELETE FROM preference", ())
            .context("Failed to clear preferences")?;
        Ok(())
    }

    /// Appends one behavior record. The log is append-only from the
    /// engine's point of view.
    pub fn append_behavior(&self, record: &BehaviorRecord) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO behavior (track_id, rating, listen_duration, favorited, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (
                    &record.track_id,
                    record.rating,
                    record.listen_duration,
                    record.favorited,
                    record.timestamp,
                ),
            )
            .with_context(|| format!("Failed to INSERT behavior for `{}'", record.track_id))?;
        Ok(())
    }

    /// The whole behavior log, most recent first.
    pub fn load_history(&self) -> Result<Vec<BehaviorRecord>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT track_id, rating, listen_duration, favorited, timestamp
                 FROM behavior ORDER BY timestamp DESC, id DESC",
            )
            .context("Failed to prepare behavior SELECT")?;

        let rows = stmt
            .query_map([], |row| {
                Ok(BehaviorRecord {
                    track_id: row.get(0)?,
                    rating: row.get(1)?,
                    listen_duration: row.get(2)?,
                    favorited: row.get(3)?,
                    timestamp: row.get(4)?,
                })
            })
            .context("Cannot query behavior history")?;

        let mut history = Vec::new();
        for record in rows {
            history.push(record.context("Queried behavior row failed")?);
        }
        Ok(history)
    }
}
