use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use chrono::Utc;
use crates::domain::value_objects::payments::format_timestamp;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::auth::admin::{AdminTokens, IssuedToken};

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Unauthorized")]
    Unauthorized,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AdminError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            AdminError::InvalidCredentials | AdminError::Unauthorized => StatusCode::UNAUTHORIZED,
            AdminError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminLoginModel {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Clone)]
pub struct AdminCredentials {
    pub email: String,
    /// Argon2 PHC string.
    pub password_hash: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminSessionDto {
    pub token: String,
    pub email: String,
    pub expires_at: String,
}

pub struct AdminUseCase {
    credentials: AdminCredentials,
    tokens: Arc<AdminTokens>,
}

impl AdminUseCase {
    pub fn new(credentials: AdminCredentials, tokens: Arc<AdminTokens>) -> Self {
        Self {
            credentials,
            tokens,
        }
    }

    pub async fn login(
        &self,
        model: AdminLoginModel,
    ) -> Result<(AdminSessionDto, IssuedToken), AdminError> {
        let email = model.email.unwrap_or_default().trim().to_ascii_lowercase();
        let password = model.password.unwrap_or_default();
        if email.is_empty() || password.is_empty() {
            return Err(AdminError::InvalidCredentials);
        }

        let configured_email = self.credentials.email.trim().to_ascii_lowercase();
        let email_matches: bool = email.as_bytes().ct_eq(configured_email.as_bytes()).into();
        let password_matches = self.verify_password(password).await?;

        if !(email_matches && password_matches) {
            warn!("admin: failed login attempt");
            return Err(AdminError::InvalidCredentials);
        }

        let issued = self.tokens.issue(&configured_email, Utc::now()).map_err(|err| {
            error!(error = ?err, "admin: failed to sign session token");
            AdminError::Internal(err)
        })?;

        info!("admin: login succeeded");
        Ok((
            AdminSessionDto {
                token: issued.token.clone(),
                email: configured_email,
                expires_at: format_timestamp(issued.expires_at),
            },
            issued,
        ))
    }

    /// Argon2 is CPU-bound; it runs on the blocking pool.
    async fn verify_password(&self, password: String) -> Result<bool, AdminError> {
        let password_hash = self.credentials.password_hash.clone();

        tokio::task::spawn_blocking(move || {
            let parsed = PasswordHash::new(&password_hash).map_err(|err| {
                error!(error = %err, "admin: configured password hash is malformed");
                AdminError::Internal(anyhow::anyhow!("malformed admin password hash"))
            })?;

            Ok(Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok())
        })
        .await
        .map_err(|err| AdminError::Internal(anyhow::anyhow!("password check aborted: {err}")))?
    }
}
