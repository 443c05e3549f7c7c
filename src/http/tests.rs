use crate::storage::{CatalogStore, Playlist, PlaylistSong};
use actix_web::http::{Method, StatusCode};
use actix_web::web::{self, Data, Query};
use actix_web::{test, App, HttpRequest, HttpResponse, HttpServer};
use download_tasks::{DownloadTracker, DownloadedSong, Settings};
use music_api::MusicApiClient;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;

// Nothing listens on the discard port, so upstream calls fail fast.
const UNREACHABLE_ENDPOINT: &str = "http://127.0.0.1:9";

struct TestContext {
    catalog: Arc<CatalogStore>,
    tracker: Arc<DownloadTracker>,
    music_api: Arc<MusicApiClient>,
    dir: TempDir,
}

impl TestContext {
    fn new() -> Self {
        Self::with_endpoint(UNREACHABLE_ENDPOINT)
    }

    fn with_endpoint(endpoint: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let catalog = Arc::new(CatalogStore::open(dir.path().join("data")).unwrap());
        let music_api = Arc::new(MusicApiClient::create(endpoint).unwrap());
        let tracker = Arc::new(DownloadTracker::new(
            catalog.clone(),
            Arc::new(crate::impls::ApiTrackSource(music_api.clone())),
        ));

        Self {
            catalog,
            tracker,
            music_api,
            dir,
        }
    }
}

const TRACK_SIZE: usize = 4096;

// Redirects `id=found` to an audio file; every other lookup is a 404.
async fn upstream_api(req: HttpRequest, query: Query<HashMap<String, String>>) -> HttpResponse {
    let location = format!("http://{}/files/track.mp3", req.connection_info().host());

    match query.get("id").map(String::as_str) {
        Some("found") => HttpResponse::Found()
            .insert_header(("Location", location))
            .finish(),
        _ => HttpResponse::NotFound().json(json!({ "code": 404, "message": "not found" })),
    }
}

async fn upstream_track() -> HttpResponse {
    HttpResponse::Ok().body(vec![7u8; TRACK_SIZE])
}

fn start_upstream() -> String {
    let server = HttpServer::new(|| {
        App::new()
            .route("/api/", web::get().to(upstream_api))
            .route("/files/track.mp3", web::get().to(upstream_track))
    })
    .workers(1)
    .disable_signals()
    .bind(("127.0.0.1", 0))
    .unwrap();

    let addr = server.addrs()[0];
    actix_rt::spawn(server.run());

    format!("http://{}", addr)
}

// Polls the task list until the first task reaches the given status.
macro_rules! wait_for_task {
    ($app:expr, $status:expr) => {{
        let mut task = Value::Null;
        for _ in 0..200 {
            let request = test::TestRequest::get().uri("/api/v1/downloads").to_request();
            let body: Value = test::call_and_read_body_json(&$app, request).await;
            task = body["data"][0].clone();
            if task["status"] == $status {
                break;
            }
            actix_rt::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        task
    }};
}

macro_rules! init_app {
    ($ctx:expr) => {
        test::init_service(
            App::new()
                .app_data(Data::new(Arc::clone(&$ctx.catalog)))
                .app_data(Data::new(Arc::clone(&$ctx.music_api)))
                .app_data(Data::new(Arc::clone(&$ctx.tracker)))
                .wrap_fn(|req, srv| super::preflight(req, srv))
                .wrap(super::cors_headers())
                .configure(super::configure),
        )
        .await
    };
}

#[actix_rt::test]
async fn test_ping() {
    let ctx = TestContext::new();
    let app = init_app!(ctx);

    let response = test::call_service(&app, test::TestRequest::get().uri("/ping").to_request()).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("Access-Control-Allow-Origin").unwrap(),
        "*"
    );

    let body: Value = test::read_body_json(response).await;
    assert_eq!(body, json!({ "message": "pong" }));
}

#[actix_rt::test]
async fn test_preflight_is_answered_with_no_content() {
    let ctx = TestContext::new();
    let app = init_app!(ctx);

    let request = test::TestRequest::default()
        .method(Method::OPTIONS)
        .uri("/api/v1/search")
        .to_request();
    let response = test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        response.headers().get("Access-Control-Allow-Methods").unwrap(),
        "GET, POST, PUT, DELETE, OPTIONS"
    );
}

#[actix_rt::test]
async fn test_missing_parameters_are_rejected() {
    let ctx = TestContext::new();
    let app = init_app!(ctx);

    for uri in [
        "/api/v1/search?source=qq",
        "/api/v1/url?id=1",
        "/api/v1/download?source=qq",
        "/api/v1/toplists",
        "/api/v1/toplist?source=qq",
        "/api/v1/playlist/import?id=1",
    ] {
        let response = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);

        let body: Value = test::read_body_json(response).await;
        assert_eq!(body, json!({ "code": 400, "message": "missing parameters" }));
    }
}

#[actix_rt::test]
async fn test_unreachable_upstream_is_reported() {
    let ctx = TestContext::new();
    let app = init_app!(ctx);

    let request = test::TestRequest::get()
        .uri("/api/v1/search?source=qq&keyword=hello")
        .to_request();
    let response = test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = test::read_body_json(response).await;
    assert_eq!(body, json!({ "code": 500, "message": "request failed" }));
}

#[actix_rt::test]
async fn test_invalid_limit_is_rejected() {
    let ctx = TestContext::new();
    let app = init_app!(ctx);

    let request = test::TestRequest::get()
        .uri("/api/v1/search?source=qq&keyword=hello&limit=many")
        .to_request();
    let response = test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
async fn test_settings_update_keeps_empty_fields() {
    let ctx = TestContext::new();
    let app = init_app!(ctx);

    let request = test::TestRequest::post()
        .uri("/api/v1/settings")
        .set_json(json!({ "downloadDir": "/srv/music", "quality": "" }))
        .to_request();
    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let request = test::TestRequest::get().uri("/api/v1/settings").to_request();
    let body: Value = test::call_and_read_body_json(&app, request).await;

    assert_eq!(
        body,
        json!({
            "code": 200,
            "data": { "downloadDir": "/srv/music", "quality": "320k" }
        })
    );
    assert_eq!(
        ctx.catalog.get_settings().await,
        Settings {
            download_dir: "/srv/music".into(),
            quality: "320k".into(),
        }
    );
}

#[actix_rt::test]
async fn test_malformed_settings_body_is_rejected() {
    let ctx = TestContext::new();
    let app = init_app!(ctx);

    let request = test::TestRequest::post()
        .uri("/api/v1/settings")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let response = test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(ctx.catalog.get_settings().await, Settings::default());
}

#[actix_rt::test]
async fn test_download_of_library_song_is_not_queued() {
    let ctx = TestContext::new();
    let path = ctx.dir.path().join("Artist - Song.mp3");
    std::fs::write(&path, b"audio").unwrap();
    ctx.catalog
        .set_library(&[DownloadedSong {
            id: "123".into(),
            name: "Song".into(),
            artist: "Artist".into(),
            album: "Album".into(),
            source: "qq".into(),
            filename: "Artist - Song.mp3".into(),
            path: path.to_string_lossy().to_string(),
            time: "2024-05-01 09:30".into(),
        }])
        .await
        .unwrap();
    ctx.tracker.load_library().await.unwrap();
    let app = init_app!(ctx);

    let request = test::TestRequest::get()
        .uri("/api/v1/download?source=qq&id=123&name=Song&artist=Artist")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, request).await;

    assert_eq!(
        body,
        json!({ "code": 200, "message": "already downloaded", "taskId": "qq_123" })
    );

    let request = test::TestRequest::get().uri("/api/v1/downloads").to_request();
    let body: Value = test::call_and_read_body_json(&app, request).await;
    assert_eq!(body, json!({ "code": 200, "data": [] }));

    let request = test::TestRequest::get()
        .uri("/api/v1/downloaded?ids=123,456&source=qq")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, request).await;
    assert_eq!(
        body,
        json!({ "code": 200, "data": { "123": true, "456": false } })
    );
}

#[actix_rt::test]
async fn test_failed_download_is_listed_and_clearable() {
    let ctx = TestContext::new();
    let app = init_app!(ctx);

    let request = test::TestRequest::get()
        .uri("/api/v1/download?source=qq&id=1&name=Song&artist=Artist")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, request).await;
    assert_eq!(body["message"], "added to download queue");
    assert_eq!(body["taskId"], "qq_1");

    let task = wait_for_task!(app, "failed");
    assert_eq!(task["status"], "failed");
    assert_eq!(task["error"], "request failed");

    let request = test::TestRequest::delete().uri("/api/v1/downloads").to_request();
    let body: Value = test::call_and_read_body_json(&app, request).await;
    assert_eq!(body["removed"], 1);
    assert!(ctx.tracker.list_tasks().await.is_empty());
}

#[actix_rt::test]
async fn test_library_refresh_drops_missing_files() {
    let ctx = TestContext::new();
    let kept = ctx.dir.path().join("kept.mp3");
    std::fs::write(&kept, b"audio").unwrap();
    let song = |id: &str, path: &std::path::Path| DownloadedSong {
        id: id.into(),
        name: "Song".into(),
        artist: "Artist".into(),
        album: String::new(),
        source: "kw".into(),
        filename: "Song.mp3".into(),
        path: path.to_string_lossy().to_string(),
        time: "2024-05-01 09:30".into(),
    };
    let gone = ctx.dir.path().join("gone.mp3");
    std::fs::write(&gone, b"audio").unwrap();
    ctx.catalog
        .set_library(&[song("1", &kept), song("2", &gone)])
        .await
        .unwrap();
    ctx.tracker.load_library().await.unwrap();
    std::fs::remove_file(&gone).unwrap();
    let app = init_app!(ctx);

    let request = test::TestRequest::post()
        .uri("/api/v1/library/refresh")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, request).await;

    assert_eq!(body["removed"], 1);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["id"], "1");

    let request = test::TestRequest::get().uri("/api/v1/library").to_request();
    let body: Value = test::call_and_read_body_json(&app, request).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[actix_rt::test]
async fn test_playlists_are_listed_and_deleted() {
    let ctx = TestContext::new();
    ctx.catalog
        .add_playlist(&Playlist {
            id: "42".into(),
            source: "netease".into(),
            name: "Late Night Drive".into(),
            author: "nightowl".into(),
            songs: vec![PlaylistSong {
                id: "7".into(),
                name: "Night Call".into(),
                artist: "Kavinsky".into(),
                album: "OutRun".into(),
                types: vec!["320k".into()],
            }],
        })
        .await
        .unwrap();
    let app = init_app!(ctx);

    let request = test::TestRequest::get().uri("/api/v1/playlists").to_request();
    let body: Value = test::call_and_read_body_json(&app, request).await;
    assert_eq!(body["data"][0]["name"], "Late Night Drive");
    assert_eq!(body["data"][0]["songs"][0]["types"], json!(["320k"]));

    let request = test::TestRequest::delete()
        .uri("/api/v1/playlist?source=netease&id=42")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, request).await;
    assert_eq!(body, json!({ "code": 200, "message": "playlist deleted" }));
    assert!(ctx.catalog.get_playlists().await.unwrap().is_empty());
}

#[actix_rt::test]
async fn test_track_url_without_source_switch_is_empty_string() {
    let endpoint = start_upstream();
    let ctx = TestContext::with_endpoint(&endpoint);
    let app = init_app!(ctx);

    let request = test::TestRequest::get()
        .uri("/api/v1/url?source=qq&id=found")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, request).await;

    assert_eq!(
        body,
        json!({
            "code": 200,
            "url": format!("{}/files/track.mp3", endpoint),
            "sourceSwitch": "",
        })
    );
}

#[actix_rt::test]
async fn test_download_follows_redirect_into_library() {
    let endpoint = start_upstream();
    let ctx = TestContext::with_endpoint(&endpoint);
    let music_dir = ctx.dir.path().join("music");
    ctx.catalog
        .update_settings(&music_dir.to_string_lossy(), "")
        .await
        .unwrap();
    let app = init_app!(ctx);

    let request = test::TestRequest::get()
        .uri("/api/v1/download?source=qq&id=found&name=Song&artist=Artist")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, request).await;
    assert_eq!(body["message"], "added to download queue");

    let task = wait_for_task!(app, "success");
    assert_eq!(task["status"], "success");
    assert_eq!(task["progress"], 100);

    // The library is persisted right after the task turns successful.
    let mut library = vec![];
    for _ in 0..200 {
        library = ctx.catalog.get_library().await.unwrap();
        if !library.is_empty() {
            break;
        }
        actix_rt::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(library.len(), 1);
    assert_eq!(library[0].id, "found");
    assert!(library[0].path.starts_with(&*music_dir.to_string_lossy()));
    assert_eq!(std::fs::read(&library[0].path).unwrap(), vec![7u8; TRACK_SIZE]);
}

#[actix_rt::test]
async fn test_upstream_not_found_fails_download() {
    let endpoint = start_upstream();
    let ctx = TestContext::with_endpoint(&endpoint);
    let app = init_app!(ctx);

    let request = test::TestRequest::get()
        .uri("/api/v1/download?source=qq&id=missing&name=Song&artist=Artist")
        .to_request();
    test::call_service(&app, request).await;

    let task = wait_for_task!(app, "failed");
    assert_eq!(task["status"], "failed");
    assert_eq!(task["error"], "request failed");
    assert!(ctx.catalog.get_library().await.unwrap().is_empty());
}
