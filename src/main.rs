use crate::config::Config;
use crate::storage::CatalogStore;
use actix_rt::signal::unix;
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use download_tasks::DownloadTracker;
use futures_lite::FutureExt;
use music_api::MusicApiClient;
use std::sync::Arc;
use tracing::{error, info};

mod config;
mod http;
mod impls;
mod storage;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[actix_rt::main]
async fn main() -> std::io::Result<()> {
    let mut terminate = unix::signal(unix::SignalKind::terminate())?;
    let mut interrupt = unix::signal(unix::SignalKind::interrupt())?;

    dotenv::dotenv().ok();
    env_logger::init();

    let config = Arc::from(Config::from_env());

    info!(version = VERSION, "Starting application...");

    let catalog_store = Arc::new(
        CatalogStore::open(&config.data_directory).expect("Unable to open catalog store"),
    );
    let music_api_client = Arc::new(
        MusicApiClient::create(&config.music_api_endpoint)
            .expect("Unable to initialize music API client"),
    );

    let download_tracker = Arc::new(DownloadTracker::new(
        catalog_store.clone(),
        Arc::new(crate::impls::ApiTrackSource(music_api_client.clone())),
    ));

    match download_tracker.load_library().await {
        Ok(removed) => info!(
            songs = download_tracker.library().await.len(),
            removed,
            "Library ready"
        ),
        Err(error) => error!(?error, "Unable to load library"),
    }

    let shutdown_timeout = config.shutdown_timeout;
    let bind_address = config.bind_address.clone();

    let server = HttpServer::new({
        move || {
            App::new()
                .app_data(Data::new(Arc::clone(&catalog_store)))
                .app_data(Data::new(Arc::clone(&music_api_client)))
                .app_data(Data::new(Arc::clone(&download_tracker)))
                .wrap_fn(|req, srv| http::preflight(req, srv))
                .wrap(http::cors_headers())
                .configure(http::configure)
        }
    })
    .shutdown_timeout(shutdown_timeout)
    .bind(&bind_address)?
    .run();

    let server_handle = server.handle();

    actix_rt::spawn({
        async move {
            if let Err(error) = server.await {
                error!(?error, "Error on http server");
            }
        }
    });

    info!(%bind_address, "Application started");

    interrupt.recv().or(terminate.recv()).await;

    info!("Received shutdown signal. Shutting down gracefully...");

    server_handle.stop(true).await;

    Ok(())
}
