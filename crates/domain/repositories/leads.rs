use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::leads::{
        ContactMessageEntity, InsertContactMessageEntity, InsertSystemRequestEntity,
        SystemRequestEntity,
    },
    value_objects::leads::LeadPage,
};

#[automock]
#[async_trait]
pub trait LeadRepository {
    async fn insert_contact_message(&self, message: InsertContactMessageEntity) -> Result<Uuid>;
    async fn insert_system_request(&self, request: InsertSystemRequestEntity) -> Result<Uuid>;
    async fn list_contact_messages(&self, page: LeadPage) -> Result<Vec<ContactMessageEntity>>;
    async fn list_system_requests(&self, page: LeadPage) -> Result<Vec<SystemRequestEntity>>;
}
