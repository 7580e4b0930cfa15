use rusqlite::{Connection, OptionalExtension};
use std::path::{Path, PathBuf};

use super::data::{SessionSnapshot, SourceImage, DEFAULT_MIME_TYPE};
use super::poses::CameraPose;

/// Fixed logical names for everything the session persists.
pub mod keys {
    /// Pose collection (settings tier, JSON)
    pub const CAMERAS: &str = "viewshift_cameras";
    /// Active pose id (settings tier)
    pub const ACTIVE_CAM_ID: &str = "viewshift_active_id";
    /// Original upload (blob tier, raw base64)
    pub const ORIGINAL_IMG: &str = "viewshift_orig";
    /// Latest generated image (blob tier, data URL)
    pub const GENERATED_IMG: &str = "viewshift_gen";
    /// MIME type of the original upload (settings tier)
    pub const MIME_TYPE: &str = "viewshift_mime";
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("could not encode or decode poses: {0}")]
    Json(#[from] serde_json::Error),

    #[error("could not create data directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("background storage task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// The Library manages the SQLite session database.
///
/// It has two tiers: `settings` holds small values (pose collection, active
/// id, MIME type) and `images` holds base64 image blobs. Both are keyed by
/// the names in [`keys`].
pub struct Library {
    conn: Connection,
    db_path: Option<PathBuf>,
}

impl Library {
    /// Open (or create) the session database at `db_path`.
    pub fn open(db_path: &Path) -> StorageResult<Self> {
        // Ensure the parent directory exists
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path)?;
        log::info!("📁 Session database at: {}", db_path.display());

        let library = Library {
            conn,
            db_path: Some(db_path.to_path_buf()),
        };
        library.init_schema()?;
        Ok(library)
    }

    /// A database that lives only as long as the process.
    ///
    /// Used when the on-disk database cannot be opened, so the UI keeps
    /// working without persistence.
    pub fn in_memory() -> StorageResult<Self> {
        let library = Library {
            conn: Connection::open_in_memory()?,
            db_path: None,
        };
        library.init_schema()?;
        Ok(library)
    }

    /// Default database location:
    /// - Linux: ~/.local/share/viewshift/viewshift.db
    /// - macOS: ~/Library/Application Support/viewshift/viewshift.db
    /// - Windows: %APPDATA%\viewshift\viewshift.db
    pub fn default_path() -> PathBuf {
        let mut path = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        path.push("viewshift");
        path.push("viewshift.db");
        path
    }

    /// Create both tiers if they don't exist
    fn init_schema(&self) -> StorageResult<()> {
        Self::create_tables(&self.conn)?;
        log::debug!("Session schema initialized");
        Ok(())
    }

    fn create_tables(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS settings (
                key     TEXT PRIMARY KEY,
                value   TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS images (
                key     TEXT PRIMARY KEY,
                data    TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    /// Path of the database file, `None` for an in-memory database
    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    // ========== Settings tier ==========

    pub fn set_setting(&self, key: &str, value: &str) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            rusqlite::params![key, value],
        )?;
        Ok(())
    }

    pub fn get_setting(&self, key: &str) -> StorageResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Persist the pose collection and active id
    pub fn save_poses(&self, poses: &[CameraPose], active_id: &str) -> StorageResult<()> {
        let json = serde_json::to_string(poses)?;
        self.set_setting(keys::CAMERAS, &json)?;
        self.set_setting(keys::ACTIVE_CAM_ID, active_id)?;
        Ok(())
    }

    pub fn save_mime_type(&self, mime_type: &str) -> StorageResult<()> {
        self.set_setting(keys::MIME_TYPE, mime_type)
    }

    /// Drop every small value. Blobs are left to [`Library::clear_images`].
    pub fn clear_settings(&self) -> StorageResult<()> {
        self.conn.execute("DELETE FROM settings", [])?;
        Ok(())
    }

    // ========== Blob tier ==========

    pub fn save_image(&self, key: &str, data: &str) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO images (key, data) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET data = excluded.data",
            rusqlite::params![key, data],
        )?;
        Ok(())
    }

    pub fn load_image(&self, key: &str) -> StorageResult<Option<String>> {
        let data = self
            .conn
            .query_row("SELECT data FROM images WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(data)
    }

    pub fn delete_image(&self, key: &str) -> StorageResult<()> {
        self.conn
            .execute("DELETE FROM images WHERE key = ?1", [key])?;
        Ok(())
    }

    pub fn clear_images(&self) -> StorageResult<()> {
        self.conn.execute("DELETE FROM images", [])?;
        Ok(())
    }

    /// Wipe both tiers on the calling thread.
    ///
    /// Blob writes queued after this call always land after the delete.
    /// Both deletes are attempted; the first failure is returned.
    pub fn clear_all(&self) -> StorageResult<()> {
        let settings = self.clear_settings();
        let images = self.clear_images();
        settings.and(images)
    }

    // ========== Session ==========

    /// Read back everything a previous session left behind.
    ///
    /// Missing keys are not errors; they just leave the matching snapshot
    /// field empty. An unreadable pose list is logged and treated as absent.
    pub fn restore(&self) -> StorageResult<SessionSnapshot> {
        let poses = match self.get_setting(keys::CAMERAS)? {
            Some(json) => serde_json::from_str::<Vec<CameraPose>>(&json).unwrap_or_else(|e| {
                log::warn!("⚠️  Ignoring unreadable pose list: {}", e);
                Vec::new()
            }),
            None => Vec::new(),
        };
        let active_id = self.get_setting(keys::ACTIVE_CAM_ID)?;
        let mime_type = self
            .get_setting(keys::MIME_TYPE)?
            .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());

        let original = self
            .load_image(keys::ORIGINAL_IMG)?
            .map(|base64| SourceImage { base64, mime_type });
        let generated = self.load_image(keys::GENERATED_IMG)?;

        Ok(SessionSnapshot {
            poses,
            active_id,
            original,
            generated,
        })
    }
}

/// Store a blob off the UI thread.
///
/// rusqlite::Connection is not Send, so the background task opens its own
/// connection to the same database file.
pub async fn save_image_async(db_path: PathBuf, key: &'static str, data: String) -> StorageResult<()> {
    tokio::task::spawn_blocking(move || {
        let conn = Connection::open(&db_path)?;
        Library::create_tables(&conn)?;
        conn.execute(
            "INSERT INTO images (key, data) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET data = excluded.data",
            rusqlite::params![key, data],
        )?;
        Ok::<_, StorageError>(())
    })
    .await?
}

/// Remove one blob off the UI thread
pub async fn delete_image_async(db_path: PathBuf, key: &'static str) -> StorageResult<()> {
    tokio::task::spawn_blocking(move || {
        let library = Library::open(&db_path)?;
        library.delete_image(key)
    })
    .await?
}

/// Restore a session off the UI thread.
///
/// Any failure is logged and yields an empty snapshot: a broken database
/// means "no prior session", never a startup error.
pub async fn restore_async(db_path: Option<PathBuf>) -> SessionSnapshot {
    let Some(db_path) = db_path else {
        return SessionSnapshot::default();
    };

    let result = tokio::task::spawn_blocking(move || Library::open(&db_path)?.restore()).await;

    match result {
        Ok(Ok(snapshot)) => snapshot,
        Ok(Err(e)) => {
            log::error!("Failed to restore session: {}", e);
            SessionSnapshot::default()
        }
        Err(e) => {
            log::error!("Session restore task failed: {}", e);
            SessionSnapshot::default()
        }
    }
}

// Implement Debug for better error messages
impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("db_path", &self.db_path)
            .finish()
    }
}
