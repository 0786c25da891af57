use crate::{
    auth::merchant::{AuthMerchant, MerchantAuthenticator},
    axum_http::{
        error_responses::{error_response, invalid_json, invalid_query, success},
        rate_limit::enforce_rate_limit,
    },
    usecases::{payments::PaymentsUseCase, rate_limiter::RateLimiter},
};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{
        FromRef, Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use crates::domain::value_objects::payments::{
    CreatePaymentModel, ListPaymentsQuery, PaymentDto, RejectPaymentModel,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct PaymentsState {
    pub usecase: Arc<PaymentsUseCase>,
    pub authenticator: Arc<MerchantAuthenticator>,
}

impl FromRef<PaymentsState> for Arc<MerchantAuthenticator> {
    fn from_ref(state: &PaymentsState) -> Self {
        Arc::clone(&state.authenticator)
    }
}

#[derive(Serialize)]
struct SinglePayment {
    payment: PaymentDto,
}

pub fn routes(state: PaymentsState, limiter: Arc<dyn RateLimiter>) -> Router {
    Router::new()
        .route("/create", post(create_payment))
        .route("/list", get(list_payments))
        .route("/:id", get(get_payment))
        .route("/:id/confirm", post(confirm_payment))
        .route("/:id/reject", post(reject_payment))
        .with_state(state)
        .layer(middleware::from_fn_with_state(limiter, enforce_rate_limit))
}

pub async fn create_payment(
    State(state): State<PaymentsState>,
    AuthMerchant(merchant): AuthMerchant,
    body: Result<Json<CreatePaymentModel>, JsonRejection>,
) -> Response {
    let Json(model) = match body {
        Ok(body) => body,
        Err(rejection) => return invalid_json(rejection),
    };

    info!(merchant_id = %merchant.id, "payments: create request received");
    match state.usecase.create(&merchant, model).await {
        Ok(created) => success(created),
        Err(err) => err.into_response(),
    }
}

pub async fn list_payments(
    State(state): State<PaymentsState>,
    AuthMerchant(merchant): AuthMerchant,
    query: Result<Query<ListPaymentsQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return invalid_query(rejection),
    };

    match state.usecase.list(merchant.id, query).await {
        Ok(list) => success(list),
        Err(err) => err.into_response(),
    }
}

pub async fn get_payment(
    State(state): State<PaymentsState>,
    AuthMerchant(merchant): AuthMerchant,
    Path(id): Path<String>,
) -> Response {
    match state.usecase.get(merchant.id, &id).await {
        Ok(payment) => success(SinglePayment { payment }),
        Err(err) => err.into_response(),
    }
}

pub async fn confirm_payment(
    State(state): State<PaymentsState>,
    AuthMerchant(merchant): AuthMerchant,
    Path(id): Path<String>,
) -> Response {
    info!(merchant_id = %merchant.id, token = %id, "payments: confirm request received");
    match state.usecase.confirm(merchant.id, &id).await {
        Ok(payment) => success(SinglePayment { payment }),
        Err(err) => err.into_response(),
    }
}

/// The body is optional; an empty body rejects without a reason.
pub async fn reject_payment(
    State(state): State<PaymentsState>,
    AuthMerchant(merchant): AuthMerchant,
    Path(id): Path<String>,
    body: Bytes,
) -> Response {
    let model = if body.iter().all(u8::is_ascii_whitespace) {
        RejectPaymentModel::default()
    } else {
        match serde_json::from_slice::<RejectPaymentModel>(&body) {
            Ok(model) => model,
            Err(_) => return error_response(StatusCode::BAD_REQUEST, "Invalid JSON body"),
        }
    };

    info!(merchant_id = %merchant.id, token = %id, "payments: reject request received");
    match state.usecase.reject(merchant.id, &id, model).await {
        Ok(payment) => success(SinglePayment { payment }),
        Err(err) => err.into_response(),
    }
}
