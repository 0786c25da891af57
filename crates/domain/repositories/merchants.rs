use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::merchants::MerchantEntity;

#[automock]
#[async_trait]
pub trait MerchantRepository {
    async fn find_by_api_key_hash(&self, api_key_hash: &str) -> Result<Option<MerchantEntity>>;
    async fn find_by_id(&self, merchant_id: Uuid) -> Result<Option<MerchantEntity>>;
}
