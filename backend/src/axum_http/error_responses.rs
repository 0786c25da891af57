use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::{
        StatusCode,
        header::{CONTENT_LENGTH, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{debug, error};

use crate::usecases::{admin::AdminError, leads::LeadError, payments::PaymentError};

pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse<T: Serialize> {
    pub success: bool,
    #[serde(flatten)]
    pub data: T,
}

pub fn success<T: Serialize>(data: T) -> Response {
    Json(SuccessResponse {
        success: true,
        data,
    })
    .into_response()
}

pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let body = Json(ErrorResponse {
        success: false,
        error: message.into(),
    });

    (status, body).into_response()
}

pub fn invalid_json(rejection: JsonRejection) -> Response {
    debug!(rejection = %rejection.body_text(), "http: invalid json body");
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return error_response(StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large");
    }
    error_response(StatusCode::BAD_REQUEST, "Invalid JSON body")
}

/// Rewrites error responses produced outside the handlers (405 from the
/// router, 408 from the timeout layer, 413 from the body limit) into the
/// `{success: false, error}` envelope.
pub async fn envelope_errors(response: Response) -> Response {
    let status = response.status();
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));

    if is_json || !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let (mut parts, _) = response.into_parts();
    parts.headers.remove(CONTENT_TYPE);
    parts.headers.remove(CONTENT_LENGTH);

    let mut enveloped = error_response(
        status,
        status.canonical_reason().unwrap_or("Request failed"),
    );
    enveloped.headers_mut().extend(parts.headers);
    enveloped
}

pub fn invalid_query(rejection: QueryRejection) -> Response {
    debug!(rejection = %rejection.body_text(), "http: invalid query string");
    error_response(StatusCode::BAD_REQUEST, "Invalid query parameters")
}

fn internal(err: &anyhow::Error) -> Response {
    // Don't leak internal error detail to the client
    error!(error = ?err, "http: internal error");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE)
}

impl IntoResponse for PaymentError {
    fn into_response(self) -> Response {
        match &self {
            PaymentError::Internal(err) => internal(err),
            _ => error_response(self.status_code(), self.to_string()),
        }
    }
}

impl IntoResponse for LeadError {
    fn into_response(self) -> Response {
        match &self {
            LeadError::Internal(err) => internal(err),
            _ => error_response(self.status_code(), self.to_string()),
        }
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        match &self {
            AdminError::Internal(err) => internal(err),
            _ => error_response(self.status_code(), self.to_string()),
        }
    }
}
