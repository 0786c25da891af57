use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    entities::leads::{ContactMessageEntity, SystemRequestEntity},
    value_objects::payments::format_timestamp,
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactFormModel {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SystemRequestFormModel {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub system_type: Option<String>,
    pub budget: Option<String>,
    pub timeline: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContactMessageDto {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub message: String,
    pub created_at: String,
}

impl From<ContactMessageEntity> for ContactMessageDto {
    fn from(value: ContactMessageEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            email: value.email,
            phone: value.phone,
            subject: value.subject,
            message: value.message,
            created_at: format_timestamp(value.created_at),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemRequestDto {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub system_type: String,
    pub budget: Option<String>,
    pub timeline: Option<String>,
    pub description: String,
    pub created_at: String,
}

impl From<SystemRequestEntity> for SystemRequestDto {
    fn from(value: SystemRequestEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            email: value.email,
            phone: value.phone,
            company: value.company,
            system_type: value.system_type,
            budget: value.budget,
            timeline: value.timeline,
            description: value.description,
            created_at: format_timestamp(value.created_at),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeadPage {
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeadPageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl LeadPageQuery {
    pub fn normalize(&self) -> LeadPage {
        LeadPage {
            limit: self.limit.unwrap_or(50).clamp(1, 200),
            offset: self.offset.unwrap_or(0).max(0),
        }
    }
}
