use crate::http::response::{with_data, ApiError};
use actix_web::web::{Data, Query};
use actix_web::HttpResponse;
use download_tasks::{DownloadRequest, DownloadTracker, RequestOutcome};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Deserialize)]
pub(crate) struct DownloadQuery {
    #[serde(default)]
    source: String,
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    artist: String,
    #[serde(default)]
    album: String,
    br: Option<String>,
}

pub(crate) async fn request_download(
    tracker: Data<Arc<DownloadTracker>>,
    query: Query<DownloadQuery>,
) -> Result<HttpResponse, ApiError> {
    let query = query.into_inner();

    let outcome = tracker
        .request_download(DownloadRequest {
            source: query.source,
            id: query.id,
            name: query.name,
            artist: query.artist,
            album: query.album,
            quality: query.br,
        })
        .await?;

    let message = match &outcome {
        RequestOutcome::AlreadyDownloaded(_) => "already downloaded",
        RequestOutcome::InProgress(_) => "download in progress",
        RequestOutcome::Queued(_) => "added to download queue",
    };

    Ok(HttpResponse::Ok().json(json!({
        "code": 200,
        "message": message,
        "taskId": outcome.task_id(),
    })))
}

pub(crate) async fn list_downloads(tracker: Data<Arc<DownloadTracker>>) -> HttpResponse {
    with_data(tracker.list_tasks().await)
}

pub(crate) async fn clear_downloads(tracker: Data<Arc<DownloadTracker>>) -> HttpResponse {
    let removed = tracker.clear_finished_tasks().await;

    HttpResponse::Ok().json(json!({
        "code": 200,
        "message": "finished tasks cleared",
        "removed": removed,
    }))
}
