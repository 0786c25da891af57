use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use backend::axum_http::error_responses::error_response;
use tracing::info;

pub async fn not_found() -> Response {
    info!("worker router: not_found handler invoked");
    error_response(StatusCode::NOT_FOUND, "Not found")
}

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK").into_response()
}
