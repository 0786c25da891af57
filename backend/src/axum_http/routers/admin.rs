use crate::{
    auth::admin::{ADMIN_COOKIE, AdminTokens, AuthAdmin},
    axum_http::{
        error_responses::{invalid_json, invalid_query, success},
        rate_limit::enforce_rate_limit,
    },
    usecases::{
        admin::{AdminLoginModel, AdminUseCase},
        leads::LeadsUseCase,
        rate_limiter::RateLimiter,
    },
};
use axum::{
    Json, Router,
    extract::{
        FromRef, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::CookieJar;
use cookie::{Cookie, SameSite};
use crates::domain::value_objects::leads::LeadPageQuery;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct AdminState {
    pub usecase: Arc<AdminUseCase>,
    pub tokens: Arc<AdminTokens>,
    pub leads: Arc<LeadsUseCase>,
    /// Adds the `Secure` attribute to the session cookie.
    pub secure_cookie: bool,
}

impl FromRef<AdminState> for Arc<AdminTokens> {
    fn from_ref(state: &AdminState) -> Self {
        Arc::clone(&state.tokens)
    }
}

#[derive(Serialize)]
struct AdminProfile {
    email: String,
    expires_at: i64,
}

#[derive(Serialize)]
struct Me {
    admin: AdminProfile,
}

#[derive(Serialize)]
struct Leads<T: Serialize> {
    leads: Vec<T>,
}

#[derive(Serialize)]
struct Message {
    message: &'static str,
}

pub fn routes(state: AdminState, login_limiter: Arc<dyn RateLimiter>) -> Router {
    Router::new()
        .route(
            "/login",
            post(login).layer(middleware::from_fn_with_state(
                login_limiter,
                enforce_rate_limit,
            )),
        )
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/leads/contact", get(list_contact_messages))
        .route("/leads/system-requests", get(list_system_requests))
        .with_state(state)
}

pub async fn login(
    State(state): State<AdminState>,
    jar: CookieJar,
    body: Result<Json<AdminLoginModel>, JsonRejection>,
) -> Response {
    let Json(model) = match body {
        Ok(body) => body,
        Err(rejection) => return invalid_json(rejection),
    };

    let (session, issued) = match state.usecase.login(model).await {
        Ok(result) => result,
        Err(err) => return err.into_response(),
    };

    let max_age = cookie::time::Duration::seconds(state.tokens.ttl().num_seconds());
    let session_cookie = Cookie::build((ADMIN_COOKIE, issued.token))
        .path("/")
        .http_only(true)
        .secure(state.secure_cookie)
        .same_site(SameSite::Strict)
        .max_age(max_age);

    (jar.add(session_cookie), success(session)).into_response()
}

pub async fn logout(jar: CookieJar) -> Response {
    let jar = jar.remove(Cookie::build(ADMIN_COOKIE).path("/"));
    (
        jar,
        success(Message {
            message: "Logged out",
        }),
    )
        .into_response()
}

pub async fn me(admin: AuthAdmin) -> Response {
    success(Me {
        admin: AdminProfile {
            email: admin.email,
            expires_at: admin.expires_at,
        },
    })
}

pub async fn list_contact_messages(
    State(state): State<AdminState>,
    admin: AuthAdmin,
    query: Result<Query<LeadPageQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return invalid_query(rejection),
    };

    info!(admin = %admin.email, "admin: listing contact messages");
    match state.leads.list_contact_messages(query).await {
        Ok(leads) => success(Leads { leads }),
        Err(err) => err.into_response(),
    }
}

pub async fn list_system_requests(
    State(state): State<AdminState>,
    admin: AuthAdmin,
    query: Result<Query<LeadPageQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return invalid_query(rejection),
    };

    info!(admin = %admin.email, "admin: listing system requests");
    match state.leads.list_system_requests(query).await {
        Ok(leads) => success(Leads { leads }),
        Err(err) => err.into_response(),
    }
}
