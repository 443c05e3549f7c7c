use async_lock::Mutex;
use download_tasks::{DownloadedSong, Settings, DEFAULT_DOWNLOAD_DIR, DEFAULT_QUALITY};
use rusqlite::{params, Connection, Transaction};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

const DATABASE_FILENAME: &str = "app_data.db";

const DOWNLOAD_DIR_KEY: &str = "downloadDir";
const QUALITY_KEY: &str = "quality";

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS settings (
        key TEXT PRIMARY KEY,
        value TEXT
    );
    CREATE TABLE IF NOT EXISTS library (
        id TEXT NOT NULL,
        source TEXT NOT NULL,
        name TEXT,
        artist TEXT,
        album TEXT,
        filename TEXT,
        path TEXT,
        time TEXT,
        PRIMARY KEY (id, source)
    );
    CREATE TABLE IF NOT EXISTS playlists (
        id TEXT NOT NULL,
        source TEXT NOT NULL,
        name TEXT,
        author TEXT,
        PRIMARY KEY (id, source)
    );
    CREATE TABLE IF NOT EXISTS playlist_songs (
        playlist_id TEXT NOT NULL,
        playlist_source TEXT NOT NULL,
        song_id TEXT NOT NULL,
        position INTEGER NOT NULL,
        name TEXT,
        artist TEXT,
        album TEXT,
        types TEXT,
        PRIMARY KEY (playlist_id, playlist_source, song_id),
        FOREIGN KEY (playlist_id, playlist_source)
            REFERENCES playlists (id, source) ON DELETE CASCADE
    );
";

#[derive(Debug, thiserror::Error)]
pub(crate) enum CatalogError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct PlaylistSong {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) artist: String,
    pub(crate) album: String,
    pub(crate) types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Playlist {
    pub(crate) id: String,
    pub(crate) source: String,
    pub(crate) name: String,
    pub(crate) author: String,
    pub(crate) songs: Vec<PlaylistSong>,
}

/// Durable settings, library and imported playlists.
///
/// A single long-lived connection sits behind an async mutex, so every
/// operation sees either all or none of another one. SQLite work runs on the
/// blocking pool.
pub(crate) struct CatalogStore {
    conn: Arc<Mutex<Connection>>,
}

impl CatalogStore {
    pub(crate) fn open(data_dir: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let data_dir = data_dir.as_ref();

        std::fs::create_dir_all(data_dir)?;

        let db_path = data_dir.join(DATABASE_FILENAME);
        let conn = Connection::open(&db_path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        conn.execute(
            "INSERT OR IGNORE INTO settings (key, value) VALUES (?1, ?2), (?3, ?4)",
            params![
                DOWNLOAD_DIR_KEY,
                DEFAULT_DOWNLOAD_DIR,
                QUALITY_KEY,
                DEFAULT_QUALITY
            ],
        )?;

        info!(path = ?db_path, "Catalog store opened");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Never fails; a read error yields the defaults.
    pub(crate) async fn get_settings(&self) -> Settings {
        match self.with_connection(|conn| read_settings(conn)).await {
            Ok(settings) => settings,
            Err(error) => {
                warn!(?error, "Unable to read settings, using defaults");
                Settings::default()
            }
        }
    }

    /// Empty fields keep their current value. Returns the stored settings.
    pub(crate) async fn update_settings(
        &self,
        download_dir: &str,
        quality: &str,
    ) -> Result<Settings, CatalogError> {
        let download_dir = download_dir.to_string();
        let quality = quality.to_string();

        let settings = self
            .with_connection(move |conn| {
                let mut settings = read_settings(conn)?;
                if !download_dir.is_empty() {
                    settings.download_dir = download_dir;
                }
                if !quality.is_empty() {
                    settings.quality = quality;
                }

                let tx = conn.transaction()?;
                for (key, value) in [
                    (DOWNLOAD_DIR_KEY, &settings.download_dir),
                    (QUALITY_KEY, &settings.quality),
                ] {
                    tx.execute(
                        "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
                        params![key, value],
                    )?;
                }
                tx.commit()?;

                Ok(settings)
            })
            .await?;

        debug!(download_dir = %settings.download_dir, quality = %settings.quality, "Settings updated");

        Ok(settings)
    }

    pub(crate) async fn get_library(&self) -> Result<Vec<DownloadedSong>, CatalogError> {
        self.with_connection(|conn| read_library(conn)).await
    }

    /// Replaces the whole library atomically.
    pub(crate) async fn set_library(&self, songs: &[DownloadedSong]) -> Result<(), CatalogError> {
        let songs = songs.to_vec();

        self.with_connection(move |conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM library", [])?;
            insert_songs(&tx, &songs)?;
            tx.commit()?;

            Ok(())
        })
        .await
    }

    pub(crate) async fn is_in_library(&self, id: &str, source: &str) -> Result<bool, CatalogError> {
        let id = id.to_string();
        let source = source.to_string();

        self.with_connection(move |conn| {
            let exists = conn.query_row(
                "SELECT EXISTS (SELECT 1 FROM library WHERE id = ?1 AND source = ?2)",
                params![id, source],
                |row| row.get(0),
            )?;

            Ok(exists)
        })
        .await
    }

    /// Deletes rows whose file is not found. Other stat errors keep the row.
    pub(crate) async fn validate_library(&self) -> Result<usize, CatalogError> {
        let removed = self
            .with_connection(|conn| {
                let mut missing = vec![];
                for song in read_library(conn)? {
                    match std::fs::metadata(&song.path) {
                        Err(error) if error.kind() == ErrorKind::NotFound => missing.push(song),
                        Err(error) => {
                            warn!(?error, path = %song.path, "Unable to check library file, keeping it")
                        }
                        Ok(_) => (),
                    }
                }

                if missing.is_empty() {
                    return Ok(0);
                }

                let tx = conn.transaction()?;
                for song in &missing {
                    tx.execute(
                        "DELETE FROM library WHERE id = ?1 AND source = ?2",
                        params![song.id, song.source],
                    )?;
                }
                tx.commit()?;

                Ok(missing.len())
            })
            .await?;

        if removed > 0 {
            info!(removed, "Removed missing files from library");
        }

        Ok(removed)
    }

    pub(crate) async fn get_playlists(&self) -> Result<Vec<Playlist>, CatalogError> {
        self.with_connection(|conn| read_playlists(conn)).await
    }

    /// Replaces any playlist stored under the same `(id, source)`.
    pub(crate) async fn add_playlist(&self, playlist: &Playlist) -> Result<(), CatalogError> {
        let playlist = playlist.clone();

        self.with_connection(move |conn| {
            let tx = conn.transaction()?;
            delete_playlist_rows(&tx, &playlist.id, &playlist.source)?;
            tx.execute(
                "INSERT INTO playlists (id, source, name, author) VALUES (?1, ?2, ?3, ?4)",
                params![playlist.id, playlist.source, playlist.name, playlist.author],
            )?;
            {
                // A song listed twice keeps its first position.
                let mut stmt = tx.prepare(
                    "INSERT OR IGNORE INTO playlist_songs
                        (playlist_id, playlist_source, song_id, position, name, artist, album, types)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                )?;
                for (position, song) in playlist.songs.iter().enumerate() {
                    stmt.execute(params![
                        playlist.id,
                        playlist.source,
                        song.id,
                        position as i64,
                        song.name,
                        song.artist,
                        song.album,
                        serde_json::to_string(&song.types)?,
                    ])?;
                }
            }
            tx.commit()?;

            debug!(
                id = %playlist.id,
                source = %playlist.source,
                songs = playlist.songs.len(),
                "Playlist saved"
            );

            Ok(())
        })
        .await
    }

    pub(crate) async fn delete_playlist(&self, id: &str, source: &str) -> Result<(), CatalogError> {
        let id = id.to_string();
        let source = source.to_string();

        self.with_connection(move |conn| {
            let tx = conn.transaction()?;
            delete_playlist_rows(&tx, &id, &source)?;
            tx.commit()?;

            Ok(())
        })
        .await
    }

    async fn with_connection<T, F>(&self, operation: F) -> Result<T, CatalogError>
    where
        F: FnOnce(&mut Connection) -> Result<T, CatalogError> + Send + 'static,
        T: Send + 'static,
    {
        let mut conn = self.conn.lock_arc().await;

        tokio::task::spawn_blocking(move || operation(&mut conn)).await?
    }
}

fn read_settings(conn: &Connection) -> Result<Settings, CatalogError> {
    let mut settings = Settings::default();

    let mut stmt = conn.prepare("SELECT key, value FROM settings")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
    })?;

    for row in rows {
        match row? {
            (key, Some(value)) if key == DOWNLOAD_DIR_KEY && !value.is_empty() => {
                settings.download_dir = value
            }
            (key, Some(value)) if key == QUALITY_KEY && !value.is_empty() => {
                settings.quality = value
            }
            _ => (),
        }
    }

    Ok(settings)
}

fn read_library(conn: &Connection) -> Result<Vec<DownloadedSong>, CatalogError> {
    let mut stmt = conn.prepare(
        "SELECT id, source, name, artist, album, filename, path, time FROM library ORDER BY rowid",
    )?;
    let songs = stmt
        .query_map([], |row| {
            Ok(DownloadedSong {
                id: row.get(0)?,
                source: row.get(1)?,
                name: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                artist: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                album: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                filename: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
                path: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
                time: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(songs)
}

fn insert_songs(tx: &Transaction, songs: &[DownloadedSong]) -> Result<(), CatalogError> {
    let mut stmt = tx.prepare(
        "INSERT INTO library (id, source, name, artist, album, filename, path, time)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )?;

    for song in songs {
        stmt.execute(params![
            song.id,
            song.source,
            song.name,
            song.artist,
            song.album,
            song.filename,
            song.path,
            song.time,
        ])?;
    }

    Ok(())
}

fn read_playlists(conn: &Connection) -> Result<Vec<Playlist>, CatalogError> {
    let mut playlists = conn
        .prepare("SELECT id, source, name, author FROM playlists ORDER BY rowid")?
        .query_map([], |row| {
            Ok(Playlist {
                id: row.get(0)?,
                source: row.get(1)?,
                name: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                author: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                songs: vec![],
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare(
        "SELECT song_id, name, artist, album, types FROM playlist_songs
         WHERE playlist_id = ?1 AND playlist_source = ?2
         ORDER BY position",
    )?;

    for playlist in playlists.iter_mut() {
        let rows = stmt
            .query_map(params![playlist.id, playlist.source], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                    row.get::<_, Option<String>>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        for (id, name, artist, album, types) in rows {
            let types = match types {
                Some(types) if !types.is_empty() => serde_json::from_str(&types)?,
                _ => vec![],
            };

            playlist.songs.push(PlaylistSong {
                id,
                name,
                artist,
                album,
                types,
            });
        }
    }

    Ok(playlists)
}

fn delete_playlist_rows(tx: &Transaction, id: &str, source: &str) -> Result<(), CatalogError> {
    tx.execute(
        "DELETE FROM playlist_songs WHERE playlist_id = ?1 AND playlist_source = ?2",
        params![id, source],
    )?;
    tx.execute(
        "DELETE FROM playlists WHERE id = ?1 AND source = ?2",
        params![id, source],
    )?;

    Ok(())
}
