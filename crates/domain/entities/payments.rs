use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    domain::value_objects::enums::payment_statuses::PaymentStatus,
    infra::db::postgres::schema::payments,
};

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = payments)]
pub struct PaymentEntity {
    pub id: Uuid,
    pub merchant_id: Uuid,
    pub reference_code: String,
    pub external_id: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    pub payment_method: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub description: Option<String>,
    pub metadata: serde_json::Value,
    pub source: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
}

impl PaymentEntity {
    /// Unknown status strings are treated as expired so they can never be confirmed.
    pub fn status(&self) -> PaymentStatus {
        PaymentStatus::parse(&self.status).unwrap_or(PaymentStatus::Expired)
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.status().is_terminal() && self.expires_at <= now
    }
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = payments)]
pub struct InsertPaymentEntity {
    pub id: Uuid,
    pub merchant_id: Uuid,
    pub reference_code: String,
    pub external_id: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    pub payment_method: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub description: Option<String>,
    pub metadata: serde_json::Value,
    pub source: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl InsertPaymentEntity {
    pub fn into_entity(self) -> PaymentEntity {
        PaymentEntity {
            id: self.id,
            merchant_id: self.merchant_id,
            reference_code: self.reference_code,
            external_id: self.external_id,
            amount: self.amount,
            currency: self.currency,
            payment_method: self.payment_method,
            customer_phone: self.customer_phone,
            customer_email: self.customer_email,
            description: self.description,
            metadata: self.metadata,
            source: self.source,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
            expires_at: self.expires_at,
            confirmed_at: None,
            rejected_at: None,
        }
    }
}
