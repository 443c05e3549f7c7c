use crate::http::response::{passthrough, with_data, with_message, ApiError};
use crate::storage::{CatalogStore, Playlist, PlaylistSong};
use actix_web::web::{Data, Query};
use actix_web::HttpResponse;
use music_api::{MusicApiClient, PlaylistLookup};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

#[derive(Deserialize)]
pub(crate) struct PlaylistQuery {
    #[serde(default)]
    source: String,
    #[serde(default)]
    id: String,
}

impl PlaylistQuery {
    fn validate(&self) -> Result<(), ApiError> {
        if self.source.is_empty() || self.id.is_empty() {
            return Err(ApiError::MissingParameters);
        }

        Ok(())
    }
}

pub(crate) async fn list_playlists(
    catalog: Data<Arc<CatalogStore>>,
) -> Result<HttpResponse, ApiError> {
    let playlists = catalog
        .get_playlists()
        .await
        .map_err(ApiError::storage("failed to read playlists"))?;

    Ok(with_data(playlists))
}

pub(crate) async fn import_playlist(
    catalog: Data<Arc<CatalogStore>>,
    music_api: Data<Arc<MusicApiClient>>,
    query: Query<PlaylistQuery>,
) -> Result<HttpResponse, ApiError> {
    query.validate()?;

    let details = match music_api.playlist(&query.source, &query.id).await? {
        PlaylistLookup::Found(details) => details,
        PlaylistLookup::Upstream(response) => return Ok(passthrough(response)),
    };

    let playlist = Playlist {
        id: query.id.clone(),
        source: query.source.clone(),
        name: details.info.name,
        author: details.info.author,
        songs: details
            .list
            .into_iter()
            .map(|track| PlaylistSong {
                id: track.id,
                name: track.name,
                artist: track.artist,
                album: track.album,
                types: track.types,
            })
            .collect(),
    };

    catalog
        .add_playlist(&playlist)
        .await
        .map_err(ApiError::storage("failed to save playlist"))?;

    info!(id = %playlist.id, source = %playlist.source, "Playlist imported");

    Ok(HttpResponse::Ok().json(json!({
        "code": 200,
        "message": "playlist imported",
        "data": playlist,
    })))
}

pub(crate) async fn delete_playlist(
    catalog: Data<Arc<CatalogStore>>,
    query: Query<PlaylistQuery>,
) -> Result<HttpResponse, ApiError> {
    query.validate()?;

    catalog
        .delete_playlist(&query.id, &query.source)
        .await
        .map_err(ApiError::storage("failed to delete playlist"))?;

    Ok(with_message("playlist deleted"))
}
