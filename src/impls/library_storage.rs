use crate::storage::CatalogStore;
use async_trait::async_trait;
use download_tasks::{DownloadedSong, LibraryStorage, LibraryStorageError, Settings};

#[async_trait]
impl LibraryStorage for CatalogStore {
    async fn get_settings(&self) -> Settings {
        CatalogStore::get_settings(self).await
    }

    async fn get_library(&self) -> Result<Vec<DownloadedSong>, LibraryStorageError> {
        CatalogStore::get_library(self)
            .await
            .map_err(|error| LibraryStorageError(Box::new(error)))
    }

    async fn set_library(&self, songs: &[DownloadedSong]) -> Result<(), LibraryStorageError> {
        CatalogStore::set_library(self, songs)
            .await
            .map_err(|error| LibraryStorageError(Box::new(error)))
    }

    async fn is_in_library(&self, id: &str, source: &str) -> Result<bool, LibraryStorageError> {
        CatalogStore::is_in_library(self, id, source)
            .await
            .map_err(|error| LibraryStorageError(Box::new(error)))
    }

    async fn validate_library(&self) -> Result<usize, LibraryStorageError> {
        CatalogStore::validate_library(self)
            .await
            .map_err(|error| LibraryStorageError(Box::new(error)))
    }
}
