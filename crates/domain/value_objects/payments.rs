use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    entities::{merchants::MerchantEntity, payments::PaymentEntity},
    value_objects::enums::{payment_methods::PaymentMethod, payment_statuses::PaymentStatus},
};

pub const DEFAULT_CURRENCY: &str = "SSP";
pub const SOURCE_API: &str = "api";
pub const DEFAULT_LIST_LIMIT: i64 = 20;
pub const MAX_LIST_LIMIT: i64 = 100;

/// Amounts are sent as JSON numbers, so at most 15 significant digits
/// (13 integer + 2 decimal) survive the trip through `f64` exactly.
pub const MAX_AMOUNT_EXCLUSIVE: i64 = 10_000_000_000_000;

/// Body of `POST /payments/create` as sent by the merchant. Every field is
/// optional here so that missing values surface as validation errors rather
/// than deserialization failures.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreatePaymentModel {
    /// Accepted as a JSON number or a numeric string.
    pub amount: Option<serde_json::Value>,
    pub currency: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub payment_method: Option<String>,
    pub description: Option<String>,
    pub external_id: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub expires_in_hours: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RejectPaymentModel {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListPaymentsQuery {
    pub status: Option<String>,
    pub customer_phone: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListPaymentsFilter {
    pub status: Option<PaymentStatus>,
    pub customer_phone: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentPage {
    pub payments: Vec<PaymentEntity>,
    pub total: i64,
}

/// Result of an insert. Uniqueness violations are reported as values so the
/// caller can regenerate a reference code or reject a duplicate external id.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentInsertOutcome {
    Inserted(PaymentEntity),
    DuplicateReferenceCode,
    DuplicateExternalId,
}

/// Compare-and-swap status change: applied only while the stored status is
/// one of `expected`.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentTransitionModel {
    pub merchant_id: Uuid,
    pub payment_id: Uuid,
    pub expected: Vec<PaymentStatus>,
    pub target: PaymentStatus,
    pub at: DateTime<Utc>,
    /// Replaces the stored metadata when set.
    pub metadata: Option<serde_json::Value>,
}

pub fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// External representation of a payment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentDto {
    pub id: Uuid,
    pub reference_code: String,
    pub external_id: Option<String>,
    pub amount: f64,
    pub currency: String,
    pub payment_method: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub description: Option<String>,
    pub metadata: serde_json::Value,
    pub source: String,
    pub status: String,
    pub created_at: String,
    pub expires_at: String,
    pub confirmed_at: Option<String>,
    pub rejected_at: Option<String>,
}

impl From<PaymentEntity> for PaymentDto {
    fn from(value: PaymentEntity) -> Self {
        Self {
            id: value.id,
            reference_code: value.reference_code,
            external_id: value.external_id,
            amount: amount_as_f64(value.amount),
            currency: value.currency,
            payment_method: value.payment_method,
            customer_phone: value.customer_phone,
            customer_email: value.customer_email,
            description: value.description,
            metadata: value.metadata,
            source: value.source,
            status: value.status,
            created_at: format_timestamp(value.created_at),
            expires_at: format_timestamp(value.expires_at),
            confirmed_at: value.confirmed_at.map(format_timestamp),
            rejected_at: value.rejected_at.map(format_timestamp),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaginationDto {
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub has_more: bool,
}

impl PaginationDto {
    pub fn new(total: i64, limit: i64, offset: i64) -> Self {
        Self {
            total,
            limit,
            offset,
            has_more: offset.saturating_add(limit) < total,
        }
    }
}

/// What the merchant shows its customer so the payment can be made and matched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentInstructionsDto {
    pub payment_method: String,
    pub reference_code: String,
    pub amount: f64,
    pub currency: String,
    pub pay_to: Option<String>,
    pub message: String,
}

impl PaymentInstructionsDto {
    pub fn build(payment: &PaymentEntity, merchant: &MerchantEntity) -> Self {
        let method = PaymentMethod::parse(&payment.payment_method).unwrap_or_default();
        let amount = format_amount(payment.amount);

        let pay_to = match method {
            PaymentMethod::MtnMomo => merchant.mtn_momo_number.clone(),
            PaymentMethod::BankTransfer => merchant.bank_account.clone(),
            PaymentMethod::Cash => None,
        };

        let message = match (method, pay_to.as_deref()) {
            (PaymentMethod::MtnMomo, Some(number)) => format!(
                "Send {} {} via MTN MoMo to {} ({}) and use reference {}",
                amount, payment.currency, number, merchant.name, payment.reference_code
            ),
            (PaymentMethod::BankTransfer, Some(account)) => format!(
                "Transfer {} {} to {} ({}) and use reference {}",
                amount, payment.currency, account, merchant.name, payment.reference_code
            ),
            _ => format!(
                "Pay {} {} to {} and quote reference {}",
                amount, payment.currency, merchant.name, payment.reference_code
            ),
        };

        Self {
            payment_method: method.to_string(),
            reference_code: payment.reference_code.clone(),
            amount: amount_as_f64(payment.amount),
            currency: payment.currency.clone(),
            pay_to,
            message,
        }
    }
}

fn format_amount(amount: Decimal) -> String {
    amount.normalize().to_string()
}

/// Nearest `f64` to the decimal text; exact below `MAX_AMOUNT_EXCLUSIVE`.
fn amount_as_f64(amount: Decimal) -> f64 {
    format_amount(amount).parse().unwrap_or_default()
}
