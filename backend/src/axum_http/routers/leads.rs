use crate::{
    axum_http::{
        client_ip::ClientIp,
        error_responses::{invalid_json, success},
        rate_limit::enforce_rate_limit,
    },
    usecases::{leads::LeadsUseCase, rate_limiter::RateLimiter},
};
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    middleware,
    response::{IntoResponse, Response},
    routing::post,
};
use crates::domain::value_objects::leads::{ContactFormModel, SystemRequestFormModel};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

pub const THANK_YOU_MESSAGE: &str = "Thank you! We will get back to you shortly.";

#[derive(Serialize)]
struct LeadReceived {
    id: Uuid,
    message: &'static str,
}

pub fn routes(
    usecase: Arc<LeadsUseCase>,
    contact_limiter: Arc<dyn RateLimiter>,
    system_request_limiter: Arc<dyn RateLimiter>,
) -> Router {
    Router::new()
        .route(
            "/contact",
            post(submit_contact).layer(middleware::from_fn_with_state(
                contact_limiter,
                enforce_rate_limit,
            )),
        )
        .route(
            "/system-request",
            post(submit_system_request).layer(middleware::from_fn_with_state(
                system_request_limiter,
                enforce_rate_limit,
            )),
        )
        .with_state(usecase)
}

pub async fn submit_contact(
    State(usecase): State<Arc<LeadsUseCase>>,
    ClientIp(client_ip): ClientIp,
    body: Result<Json<ContactFormModel>, JsonRejection>,
) -> Response {
    let Json(form) = match body {
        Ok(body) => body,
        Err(rejection) => return invalid_json(rejection),
    };

    match usecase.submit_contact(form, &client_ip).await {
        Ok(id) => success(LeadReceived {
            id,
            message: THANK_YOU_MESSAGE,
        }),
        Err(err) => err.into_response(),
    }
}

pub async fn submit_system_request(
    State(usecase): State<Arc<LeadsUseCase>>,
    ClientIp(client_ip): ClientIp,
    body: Result<Json<SystemRequestFormModel>, JsonRejection>,
) -> Response {
    let Json(form) = match body {
        Ok(body) => body,
        Err(rejection) => return invalid_json(rejection),
    };

    match usecase.submit_system_request(form, &client_ip).await {
        Ok(id) => success(LeadReceived {
            id,
            message: THANK_YOU_MESSAGE,
        }),
        Err(err) => err.into_response(),
    }
}
