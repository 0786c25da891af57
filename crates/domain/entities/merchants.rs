use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::merchants;

/// A merchant allowed to call the payment API. Rows are provisioned by an
/// operator; the API only reads them.
#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = merchants)]
pub struct MerchantEntity {
    pub id: Uuid,
    pub name: String,
    /// Hex SHA-256 of the API credential. The plain credential is never stored.
    pub api_key_hash: String,
    pub mtn_momo_number: Option<String>,
    pub bank_account: Option<String>,
    pub webhook_url: Option<String>,
    pub webhook_secret: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
