use anyhow::Result;
use async_trait::async_trait;
use diesel::{RunQueryDsl, insert_into, prelude::*};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{contact_messages, system_requests},
    },
};
use domain::{
    entities::leads::{
        ContactMessageEntity, InsertContactMessageEntity, InsertSystemRequestEntity,
        SystemRequestEntity,
    },
    repositories::leads::LeadRepository,
    value_objects::leads::LeadPage,
};

pub struct LeadPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl LeadPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl LeadRepository for LeadPostgres {
    async fn insert_contact_message(&self, message: InsertContactMessageEntity) -> Result<Uuid> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let id = insert_into(contact_messages::table)
            .values(&message)
            .returning(contact_messages::id)
            .get_result::<Uuid>(&mut conn)?;

        Ok(id)
    }

    async fn insert_system_request(&self, request: InsertSystemRequestEntity) -> Result<Uuid> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let id = insert_into(system_requests::table)
            .values(&request)
            .returning(system_requests::id)
            .get_result::<Uuid>(&mut conn)?;

        Ok(id)
    }

    async fn list_contact_messages(&self, page: LeadPage) -> Result<Vec<ContactMessageEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = contact_messages::table
            .order(contact_messages::created_at.desc())
            .limit(page.limit)
            .offset(page.offset)
            .select(ContactMessageEntity::as_select())
            .load::<ContactMessageEntity>(&mut conn)?;

        Ok(results)
    }

    async fn list_system_requests(&self, page: LeadPage) -> Result<Vec<SystemRequestEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = system_requests::table
            .order(system_requests::created_at.desc())
            .limit(page.limit)
            .offset(page.offset)
            .select(SystemRequestEntity::as_select())
            .load::<SystemRequestEntity>(&mut conn)?;

        Ok(results)
    }
}
