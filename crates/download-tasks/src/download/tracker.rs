use crate::download::traits::{
    LibraryStorage, LibraryStorageError, TrackSource, TrackSourceError, TrackStream,
};
use crate::download::types::{
    compute_progress, track_filename, DownloadRequest, DownloadStatus, DownloadTask,
    DownloadedSong, RequestOutcome,
};
use crate::TaskId;
use async_lock::RwLock;
use futures_util::StreamExt;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, thiserror::Error)]
pub enum RequestDownloadError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error(transparent)]
    LibraryStorageError(#[from] LibraryStorageError),
}

// Display text is what clients see in `DownloadTask::error`.
#[derive(Debug, thiserror::Error)]
enum DownloadFailure {
    #[error("request failed")]
    Request(#[source] TrackSourceError),
    #[error("failed to create file")]
    CreateFile(#[source] std::io::Error),
    #[error("write failed")]
    Stream(#[source] TrackSourceError),
    #[error("write failed")]
    Write(#[source] std::io::Error),
}

/// Runs background downloads and mirrors the persisted library in memory.
///
/// Tasks live for the whole process unless [`DownloadTracker::clear_finished_tasks`]
/// is called explicitly. Nothing is evicted automatically, so a failed task
/// keeps its id (and blocks a retry under that id) until then.
#[derive(Clone)]
pub struct DownloadTracker {
    library_storage: Arc<dyn LibraryStorage + Send + Sync>,
    track_source: Arc<dyn TrackSource + Send + Sync>,
    tasks: Arc<RwLock<HashMap<TaskId, DownloadTask>>>,
    library: Arc<RwLock<Vec<DownloadedSong>>>,
}

impl DownloadTracker {
    pub fn new(
        library_storage: Arc<dyn LibraryStorage + Send + Sync>,
        track_source: Arc<dyn TrackSource + Send + Sync>,
    ) -> Self {
        Self {
            library_storage,
            track_source,
            tasks: Arc::new(RwLock::new(HashMap::new())),
            library: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Loads the persisted library into memory and drops entries whose file is gone.
    pub async fn load_library(&self) -> Result<usize, LibraryStorageError> {
        let songs = self.library_storage.get_library().await?;
        let count = songs.len();

        *self.library.write().await = songs;

        info!(count, "Library loaded");

        self.validate_library().await
    }

    pub async fn request_download(
        &self,
        request: DownloadRequest,
    ) -> Result<RequestOutcome, RequestDownloadError> {
        if request.source.is_empty() {
            return Err(RequestDownloadError::MissingParameter("source"));
        }
        if request.id.is_empty() {
            return Err(RequestDownloadError::MissingParameter("id"));
        }

        let task_id = TaskId::new(&request.source, &request.id);

        if self
            .library_storage
            .is_in_library(&request.id, &request.source)
            .await?
        {
            debug!(%task_id, "Track is already in the library");
            return Ok(RequestOutcome::AlreadyDownloaded(task_id));
        }

        let quality = match request.quality.clone().filter(|q| !q.is_empty()) {
            Some(quality) => quality,
            None => self.library_storage.get_settings().await.quality,
        };

        match self.tasks.write().await.entry(task_id.clone()) {
            Entry::Occupied(entry) => {
                debug!(%task_id, status = ?entry.get().status, "Task already exists");
                return Ok(RequestOutcome::InProgress(task_id));
            }
            Entry::Vacant(entry) => {
                entry.insert(DownloadTask::pending(task_id.clone(), &request));
            }
        }

        info!(
            %task_id,
            name = %request.name,
            artist = %request.artist,
            %quality,
            "Download task created"
        );

        self.spawn_task(task_id.clone(), request, quality);

        Ok(RequestOutcome::Queued(task_id))
    }

    pub async fn list_tasks(&self) -> Vec<DownloadTask> {
        self.tasks.read().await.values().cloned().collect()
    }

    pub async fn get_task(&self, task_id: &TaskId) -> Option<DownloadTask> {
        self.tasks.read().await.get(task_id).cloned()
    }

    /// Forgets tasks in `success` or `failed`. Never called implicitly.
    pub async fn clear_finished_tasks(&self) -> usize {
        let mut tasks = self.tasks.write().await;
        let before = tasks.len();

        tasks.retain(|_, task| !task.status.is_finished());

        before - tasks.len()
    }

    pub async fn library(&self) -> Vec<DownloadedSong> {
        self.library.read().await.clone()
    }

    /// Prunes rows whose file no longer exists, both in storage and in memory.
    ///
    /// The library lock is held for the whole operation so a download that
    /// completes meanwhile cannot re-persist a pruned row.
    pub async fn validate_library(&self) -> Result<usize, LibraryStorageError> {
        let mut library = self.library.write().await;

        let removed = self.library_storage.validate_library().await?;

        let mut kept = Vec::with_capacity(library.len());

        for song in library.drain(..) {
            if is_missing(Path::new(&song.path)).await {
                debug!(id = %song.id, source = %song.source, "Dropping missing song from library");
            } else {
                kept.push(song);
            }
        }

        *library = kept;

        if removed > 0 {
            info!(removed, "Library validated");
        }

        Ok(removed)
    }

    /// A stale library row whose file is gone counts as not downloaded, but is
    /// left in place until the next validation.
    pub async fn is_downloaded(&self, ids: &[String], source: &str) -> HashMap<String, bool> {
        let library = self.library.read().await;
        let mut result = HashMap::with_capacity(ids.len());

        for id in ids {
            let downloaded = match library.iter().find(|song| song.is_same_track(id, source)) {
                Some(song) => tokio::fs::try_exists(&song.path).await.unwrap_or(false),
                None => false,
            };

            result.insert(id.clone(), downloaded);
        }

        result
    }

    fn spawn_task(&self, task_id: TaskId, request: DownloadRequest, quality: String) {
        actix_rt::spawn({
            let tracker = self.clone();

            async move {
                tracker.execute(task_id, request, quality).await;
            }
        });
    }

    async fn execute(&self, task_id: TaskId, request: DownloadRequest, quality: String) {
        self.update_task(&task_id, |task| {
            task.status = DownloadStatus::Downloading;
            task.progress = 0;
        })
        .await;

        match self.download(&task_id, &request, &quality).await {
            Ok(song) => {
                self.update_task(&task_id, |task| {
                    task.status = DownloadStatus::Success;
                    task.progress = 100;
                })
                .await;

                info!(%task_id, path = %song.path, "Download finished");

                self.publish(song).await;
            }
            Err(failure) => {
                error!(%task_id, error = ?failure, "Download failed");

                self.update_task(&task_id, |task| {
                    task.status = DownloadStatus::Failed;
                    task.error = Some(failure.to_string());
                })
                .await;
            }
        }
    }

    async fn download(
        &self,
        task_id: &TaskId,
        request: &DownloadRequest,
        quality: &str,
    ) -> Result<DownloadedSong, DownloadFailure> {
        let TrackStream {
            content_length,
            mut chunks,
        } = self
            .track_source
            .open_track(&request.source, &request.id, quality)
            .await
            .map_err(DownloadFailure::Request)?;

        let download_dir = PathBuf::from(self.library_storage.get_settings().await.download_dir);

        if let Err(error) = tokio::fs::create_dir_all(&download_dir).await {
            warn!(?error, ?download_dir, "Unable to create download directory");
        }

        let filename = track_filename(&request.artist, &request.name, quality);
        let path = download_dir.join(&filename);

        let mut file = File::create(&path)
            .await
            .map_err(DownloadFailure::CreateFile)?;

        let total = content_length.unwrap_or(0);
        let mut written = 0u64;

        debug!(%task_id, ?path, total, "Streaming track to disk");

        // A partially written file stays on disk if streaming fails.
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk.map_err(DownloadFailure::Stream)?;

            file.write_all(&chunk)
                .await
                .map_err(DownloadFailure::Write)?;
            written += chunk.len() as u64;

            if let Some(progress) = compute_progress(written, total) {
                self.update_task(task_id, |task| task.progress = progress)
                    .await;
            }
        }

        file.flush().await.map_err(DownloadFailure::Write)?;

        Ok(DownloadedSong {
            id: request.id.clone(),
            name: request.name.clone(),
            artist: request.artist.clone(),
            album: request.album.clone(),
            source: request.source.clone(),
            filename,
            path: path.to_string_lossy().to_string(),
            time: chrono::Local::now().format(TIME_FORMAT).to_string(),
        })
    }

    // Re-persists the whole library, as a full replace, on every completion.
    async fn publish(&self, song: DownloadedSong) {
        let mut library = self.library.write().await;

        library.retain(|existing| !existing.is_same_track(&song.id, &song.source));
        library.push(song);

        if let Err(error) = self.library_storage.set_library(&library).await {
            error!(?error, "Unable to persist library after download");
        }
    }

    async fn update_task(&self, task_id: &TaskId, update: impl FnOnce(&mut DownloadTask)) {
        if let Some(task) = self.tasks.write().await.get_mut(task_id) {
            update(task);
        }
    }
}

async fn is_missing(path: &Path) -> bool {
    matches!(
        tokio::fs::metadata(path).await,
        Err(error) if error.kind() == ErrorKind::NotFound
    )
}
