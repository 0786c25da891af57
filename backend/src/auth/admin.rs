use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::CookieJar;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{auth::bearer_token, usecases::admin::AdminError};

pub const ADMIN_COOKIE: &str = "admin_token";
pub const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdminClaims {
    pub sub: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Signs and checks HS256 admin session tokens.
pub struct AdminTokens {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl AdminTokens {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, email: &str, now: DateTime<Utc>) -> anyhow::Result<IssuedToken> {
        let expires_at = now + self.ttl;
        let claims = AdminClaims {
            sub: email.to_string(),
            role: ADMIN_ROLE.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        Ok(IssuedToken { token, expires_at })
    }

    pub fn validate(&self, token: &str) -> Result<AdminClaims, AdminError> {
        let validation = Validation::new(Algorithm::HS256);
        let token_data = decode::<AdminClaims>(token, &self.decoding_key, &validation)
            .map_err(|_| AdminError::Unauthorized)?;

        if token_data.claims.role != ADMIN_ROLE {
            return Err(AdminError::Unauthorized);
        }
        Ok(token_data.claims)
    }
}

#[derive(Debug, Clone)]
pub struct AuthAdmin {
    pub email: String,
    pub expires_at: i64,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthAdmin
where
    Arc<AdminTokens>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AdminError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .or_else(|| {
                CookieJar::from_headers(&parts.headers)
                    .get(ADMIN_COOKIE)
                    .map(|cookie| cookie.value().to_string())
            })
            .filter(|token| !token.is_empty())
            .ok_or(AdminError::Unauthorized)?;

        let tokens = Arc::<AdminTokens>::from_ref(state);
        let claims = tokens.validate(&token)?;

        Ok(AuthAdmin {
            email: claims.sub,
            expires_at: claims.exp,
        })
    }
}
