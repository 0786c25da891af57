use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderName, HeaderValue, StatusCode, header::RETRY_AFTER},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::{
    axum_http::{client_ip::ClientIp, error_responses::error_response},
    usecases::{payments::PaymentError, rate_limiter::RateLimiter},
};

pub const REMAINING_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

/// Rejects the request with 429 once the client's window is used up; runs
/// before any extractor of the wrapped handler.
pub async fn enforce_rate_limit(
    State(limiter): State<Arc<dyn RateLimiter>>,
    ClientIp(client_ip): ClientIp,
    request: Request,
    next: Next,
) -> Response {
    let decision = limiter.check(&client_ip);

    if !decision.allowed {
        warn!(
            %client_ip,
            path = %request.uri().path(),
            "rate_limit: request rejected"
        );
        let retry_after = (decision.retry_after.as_secs_f64().ceil() as u64).max(1);
        let mut response = error_response(
            StatusCode::TOO_MANY_REQUESTS,
            PaymentError::RateLimited.to_string(),
        );
        response
            .headers_mut()
            .insert(RETRY_AFTER, HeaderValue::from(retry_after));
        response
            .headers_mut()
            .insert(REMAINING_HEADER, HeaderValue::from(0u32));
        return response;
    }

    let mut response = next.run(request).await.into_response();
    response
        .headers_mut()
        .insert(REMAINING_HEADER, HeaderValue::from(decision.remaining));
    response
}
