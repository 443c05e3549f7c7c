use crate::TaskId;
use serde::{Deserialize, Serialize};

pub const DEFAULT_DOWNLOAD_DIR: &str = "./downloads";
pub const DEFAULT_QUALITY: &str = "320k";

const LOSSLESS_QUALITIES: [&str; 2] = ["flac", "flac24bit"];
const RESERVED_FILENAME_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(rename = "downloadDir")]
    pub download_dir: String,
    pub quality: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            download_dir: DEFAULT_DOWNLOAD_DIR.to_string(),
            quality: DEFAULT_QUALITY.to_string(),
        }
    }
}

/// Library entry. At most one per `(id, source)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadedSong {
    pub id: String,
    pub name: String,
    pub artist: String,
    pub album: String,
    pub source: String,
    pub filename: String,
    pub path: String,
    pub time: String,
}

impl DownloadedSong {
    pub fn is_same_track(&self, id: &str, source: &str) -> bool {
        self.id == id && self.source == source
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadStatus {
    Pending,
    Downloading,
    Success,
    Failed,
}

impl DownloadStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, DownloadStatus::Success | DownloadStatus::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadTask {
    pub id: TaskId,
    pub name: String,
    pub artist: String,
    pub source: String,
    pub status: DownloadStatus,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DownloadTask {
    pub(crate) fn pending(id: TaskId, request: &DownloadRequest) -> Self {
        Self {
            id,
            name: request.name.clone(),
            artist: request.artist.clone(),
            source: request.source.clone(),
            status: DownloadStatus::Pending,
            progress: 0,
            error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DownloadRequest {
    pub source: String,
    pub id: String,
    pub name: String,
    pub artist: String,
    pub album: String,
    /// Falls back to the configured quality when absent.
    pub quality: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    AlreadyDownloaded(TaskId),
    InProgress(TaskId),
    Queued(TaskId),
}

impl RequestOutcome {
    pub fn task_id(&self) -> &TaskId {
        match self {
            RequestOutcome::AlreadyDownloaded(task_id)
            | RequestOutcome::InProgress(task_id)
            | RequestOutcome::Queued(task_id) => task_id,
        }
    }
}

pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if RESERVED_FILENAME_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect()
}

pub(crate) fn file_extension(quality: &str) -> &'static str {
    if LOSSLESS_QUALITIES.contains(&quality) {
        ".flac"
    } else {
        ".mp3"
    }
}

pub(crate) fn track_filename(artist: &str, name: &str, quality: &str) -> String {
    sanitize_filename(&format!("{} - {}{}", artist, name, file_extension(quality)))
}

/// `None` while the total size is unknown.
pub(crate) fn compute_progress(written: u64, total: u64) -> Option<u8> {
    if total == 0 {
        return None;
    }

    Some((written.saturating_mul(100) / total).min(100) as u8)
}
