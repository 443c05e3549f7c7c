mod downloads;
mod health;
mod library;
mod music;
mod playlists;
mod response;
mod settings;

use crate::http::response::ApiError;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse};
use actix_web::http::Method;
use actix_web::middleware::DefaultHeaders;
use actix_web::{web, HttpResponse};
use futures_util::future::{ready, Either, Ready};

#[cfg(test)]
mod tests;

pub(crate) fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::QueryConfig::default().error_handler(|_, _| ApiError::InvalidParameters.into()),
    )
    .app_data(
        web::JsonConfig::default().error_handler(|_, _| ApiError::InvalidParameters.into()),
    )
    .route("/ping", web::get().to(health::ping))
    .service(
        web::scope("/api/v1")
            .route("/search", web::get().to(music::search))
            .route("/url", web::get().to(music::track_url))
            .route("/toplists", web::get().to(music::toplists))
            .route("/toplist", web::get().to(music::toplist))
            .route("/download", web::get().to(downloads::request_download))
            .service(
                web::resource("/downloads")
                    .route(web::get().to(downloads::list_downloads))
                    .route(web::delete().to(downloads::clear_downloads)),
            )
            .route("/library", web::get().to(library::get_library))
            .route("/library/refresh", web::post().to(library::refresh_library))
            .route("/downloaded", web::get().to(library::downloaded))
            .service(
                web::resource("/settings")
                    .route(web::get().to(settings::get_settings))
                    .route(web::post().to(settings::update_settings)),
            )
            .route("/playlists", web::get().to(playlists::list_playlists))
            .route("/playlist/import", web::get().to(playlists::import_playlist))
            .route("/playlist", web::delete().to(playlists::delete_playlist)),
    );
}

pub(crate) fn cors_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("Access-Control-Allow-Origin", "*"))
        .add((
            "Access-Control-Allow-Methods",
            "GET, POST, PUT, DELETE, OPTIONS",
        ))
        .add(("Access-Control-Allow-Headers", "Content-Type, Authorization"))
        .add(("X-Frame-Options", "ALLOWALL"))
        .add(("Content-Security-Policy", "frame-ancestors *"))
}

/// Answers every `OPTIONS` request with `204` before routing.
pub(crate) fn preflight<S>(
    req: ServiceRequest,
    service: &S,
) -> Either<Ready<Result<ServiceResponse, actix_web::Error>>, S::Future>
where
    S: Service<ServiceRequest, Response = ServiceResponse, Error = actix_web::Error>,
{
    if req.method() == Method::OPTIONS {
        return Either::Left(ready(Ok(
            req.into_response(HttpResponse::NoContent().finish())
        )));
    }

    Either::Right(service.call(req))
}
