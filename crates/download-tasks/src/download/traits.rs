use crate::download::types::{DownloadedSong, Settings};
use async_trait::async_trait;
use futures_util::stream::BoxStream;

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct LibraryStorageError(pub Box<dyn std::error::Error + Send + Sync>);

#[async_trait]
pub trait LibraryStorage {
    /// Never fails; falls back to defaults.
    async fn get_settings(&self) -> Settings;
    async fn get_library(&self) -> Result<Vec<DownloadedSong>, LibraryStorageError>;
    async fn set_library(&self, songs: &[DownloadedSong]) -> Result<(), LibraryStorageError>;
    async fn is_in_library(&self, id: &str, source: &str) -> Result<bool, LibraryStorageError>;
    async fn validate_library(&self) -> Result<usize, LibraryStorageError>;
}

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct TrackSourceError(pub Box<dyn std::error::Error + Send + Sync>);

pub type TrackChunks = BoxStream<'static, Result<Vec<u8>, TrackSourceError>>;

pub struct TrackStream {
    pub content_length: Option<u64>,
    pub chunks: TrackChunks,
}

#[async_trait]
pub trait TrackSource {
    async fn open_track(
        &self,
        source: &str,
        id: &str,
        quality: &str,
    ) -> Result<TrackStream, TrackSourceError>;
}
