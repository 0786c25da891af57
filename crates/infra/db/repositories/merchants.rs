use anyhow::Result;
use async_trait::async_trait;
use diesel::{RunQueryDsl, prelude::*};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::merchants},
};
use domain::{entities::merchants::MerchantEntity, repositories::merchants::MerchantRepository};

pub struct MerchantPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl MerchantPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl MerchantRepository for MerchantPostgres {
    async fn find_by_api_key_hash(&self, api_key_hash: &str) -> Result<Option<MerchantEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let merchant = merchants::table
            .filter(merchants::api_key_hash.eq(api_key_hash))
            .select(MerchantEntity::as_select())
            .first::<MerchantEntity>(&mut conn)
            .optional()?;

        Ok(merchant)
    }

    async fn find_by_id(&self, merchant_id: Uuid) -> Result<Option<MerchantEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let merchant = merchants::table
            .filter(merchants::id.eq(merchant_id))
            .select(MerchantEntity::as_select())
            .first::<MerchantEntity>(&mut conn)
            .optional()?;

        Ok(merchant)
    }
}
