use actix_web::{HttpResponse, Responder};
use serde_json::json;

pub(crate) async fn ping() -> impl Responder {
    HttpResponse::Ok().json(json!({ "message": "pong" }))
}
