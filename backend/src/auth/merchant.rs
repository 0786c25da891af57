use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, request::Parts},
};
use crates::{
    domain::{entities::merchants::MerchantEntity, repositories::merchants::MerchantRepository},
    payments::api_keys::hash_api_key,
};
use subtle::ConstantTimeEq;
use tracing::{error, info};

use crate::{auth::bearer_token, usecases::payments::PaymentError};

pub const API_KEY_HEADER: &str = "x-api-key";

/// Credential from `Authorization: Bearer`, falling back to `X-API-Key`.
pub fn extract_credential(headers: &HeaderMap) -> Option<String> {
    bearer_token(headers).or_else(|| {
        headers
            .get(API_KEY_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    })
}

pub struct MerchantAuthenticator {
    merchant_repository: Arc<dyn MerchantRepository + Send + Sync>,
}

impl MerchantAuthenticator {
    pub fn new(merchant_repository: Arc<dyn MerchantRepository + Send + Sync>) -> Self {
        Self {
            merchant_repository,
        }
    }

    pub async fn authenticate(&self, credential: Option<&str>) -> Result<MerchantEntity, PaymentError> {
        let credential = credential.ok_or(PaymentError::Unauthenticated)?;
        let api_key_hash = hash_api_key(credential);

        let merchant = self
            .merchant_repository
            .find_by_api_key_hash(&api_key_hash)
            .await
            .map_err(|err| {
                error!(db_error = ?err, "auth: merchant lookup failed");
                PaymentError::Internal(err)
            })?
            .ok_or_else(|| {
                info!("auth: unknown api key");
                PaymentError::InvalidCredential
            })?;

        let hashes_match: bool = merchant
            .api_key_hash
            .as_bytes()
            .ct_eq(api_key_hash.as_bytes())
            .into();
        if !hashes_match {
            info!(merchant_id = %merchant.id, "auth: api key hash mismatch");
            return Err(PaymentError::InvalidCredential);
        }

        if !merchant.is_active {
            info!(merchant_id = %merchant.id, "auth: merchant is inactive");
            return Err(PaymentError::InvalidCredential);
        }

        Ok(merchant)
    }
}

/// The merchant behind the request's API credential.
#[derive(Debug, Clone)]
pub struct AuthMerchant(pub MerchantEntity);

#[async_trait]
impl<S> FromRequestParts<S> for AuthMerchant
where
    Arc<MerchantAuthenticator>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = PaymentError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let credential = extract_credential(&parts.headers);
        let authenticator = Arc::<MerchantAuthenticator>::from_ref(state);
        let merchant = authenticator.authenticate(credential.as_deref()).await?;
        Ok(AuthMerchant(merchant))
    }
}
