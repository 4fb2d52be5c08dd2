use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::preferences::UserPreferences;
use crate::error::{Result, ShowcaseError};

/// Storage key of the persisted preference blob
pub const BLOB_KEY: &str = "rm-app";
/// Schema version of the blob; any other version is discarded on load
pub const SCHEMA_VERSION: u32 = 1;
/// Storage key of the manual performance-mode toggle
const PERF_MODE_KEY: &str = "perf-mode-enabled";

/// Versioned envelope around the whitelisted preferences
#[derive(Serialize, Deserialize, Debug)]
struct PersistedBlob {
    version: u32,
    user_preferences: UserPreferences,
}

/// The PreferenceLibrary manages the SQLite key-value store that keeps user
/// preferences across sessions. Filters and catalog state are never stored.
pub struct PreferenceLibrary {
    conn: Connection,
    db_path: Option<PathBuf>,
}

impl PreferenceLibrary {
    /// Open the library in the user's data directory:
    /// - Linux: ~/.local/share/estate-showcase/showcase.db
    /// - macOS: ~/Library/Application Support/estate-showcase/showcase.db
    /// - Windows: %APPDATA%\estate-showcase\showcase.db
    pub fn new() -> Result<Self> {
        let db_path = Self::default_db_path()?;
        Self::open(&db_path)
    }

    /// Open or create the library at `path`
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        info!(path = %path.display(), "preference library opened");

        let library = PreferenceLibrary {
            conn,
            db_path: Some(path.to_path_buf()),
        };
        library.init_schema()?;
        Ok(library)
    }

    /// Library that lives only as long as this value (tests, private sessions)
    pub fn open_in_memory() -> Result<Self> {
        let library = PreferenceLibrary {
            conn: Connection::open_in_memory()?,
            db_path: None,
        };
        library.init_schema()?;
        Ok(library)
    }

    fn default_db_path() -> Result<PathBuf> {
        let mut path = dirs::data_dir()
            .or_else(dirs::home_dir)
            .ok_or(ShowcaseError::NoDataDir)?;

        path.push("estate-showcase");
        path.push("showcase.db");
        Ok(path)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS preferences (
                key             TEXT PRIMARY KEY,
                value           TEXT NOT NULL,
                updated_at      INTEGER NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    /// Path of the database file (None for in-memory libraries)
    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    // ========== Raw key-value access ==========

    pub fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM preferences WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn set_raw(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO preferences (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            rusqlite::params![key, value, chrono::Utc::now().timestamp()],
        )?;
        Ok(())
    }

    pub fn remove_raw(&self, key: &str) -> Result<()> {
        self.conn.execute("DELETE FROM preferences WHERE key = ?1", [key])?;
        Ok(())
    }

    // ========== Preference blob ==========

    /// Load saved preferences.
    ///
    /// A missing blob yields the defaults. A blob from another schema version
    /// or one that no longer decodes is discarded and the defaults returned.
    pub fn load(&self) -> Result<UserPreferences> {
        let Some(json) = self.get_raw(BLOB_KEY)? else {
            debug!("no saved preferences, using defaults");
            return Ok(UserPreferences::default());
        };

        match serde_json::from_str::<PersistedBlob>(&json) {
            Ok(blob) if blob.version == SCHEMA_VERSION => Ok(blob.user_preferences),
            Ok(blob) => {
                warn!(
                    found = blob.version,
                    expected = SCHEMA_VERSION,
                    "preference schema changed, resetting preferences"
                );
                self.remove_raw(BLOB_KEY)?;
                Ok(UserPreferences::default())
            }
            Err(e) => {
                warn!(error = %e, "saved preferences unreadable, resetting preferences");
                self.remove_raw(BLOB_KEY)?;
                Ok(UserPreferences::default())
            }
        }
    }

    /// Persist preferences under the current schema version
    pub fn save(&self, preferences: &UserPreferences) -> Result<()> {
        let blob = serde_json::json!({
            "version": SCHEMA_VERSION,
            "user_preferences": preferences,
        });
        self.set_raw(BLOB_KEY, &blob.to_string())?;
        debug!("preferences saved");
        Ok(())
    }

    // ========== Performance mode ==========

    /// Manual performance-mode toggle; None if the user never touched it
    pub fn performance_mode(&self) -> Result<Option<bool>> {
        Ok(self.get_raw(PERF_MODE_KEY)?.map(|v| v == "1"))
    }

    pub fn set_performance_mode(&self, enabled: bool) -> Result<()> {
        self.set_raw(PERF_MODE_KEY, if enabled { "1" } else { "0" })
    }
}

// Implement Debug for better error messages
impl std::fmt::Debug for PreferenceLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreferenceLibrary")
            .field("db_path", &self.db_path)
            .finish()
    }
}
