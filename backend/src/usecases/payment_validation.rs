use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use crates::domain::{
    entities::payments::InsertPaymentEntity,
    value_objects::{
        enums::{payment_methods::PaymentMethod, payment_statuses::PaymentStatus},
        payments::{
            CreatePaymentModel, DEFAULT_CURRENCY, DEFAULT_LIST_LIMIT, ListPaymentsFilter,
            ListPaymentsQuery, MAX_AMOUNT_EXCLUSIVE, MAX_LIST_LIMIT, SOURCE_API,
        },
    },
};
use rust_decimal::Decimal;
use serde_json::Value;
use uuid::Uuid;

pub const MIN_EXPIRES_IN_HOURS: i64 = 1;
pub const MAX_EXPIRES_IN_HOURS: i64 = 720;
pub const MAX_DESCRIPTION_CHARS: usize = 500;
pub const MAX_EXTERNAL_ID_CHARS: usize = 128;
pub const MAX_REJECTION_REASON_CHARS: usize = 500;

/// A create request that passed every check, ready to be turned into a row.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPayment {
    pub amount: Decimal,
    pub currency: String,
    pub payment_method: PaymentMethod,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub description: Option<String>,
    pub external_id: Option<String>,
    pub metadata: Value,
    pub expires_in_hours: i64,
}

impl ValidatedPayment {
    pub fn to_insert_entity(
        &self,
        merchant_id: Uuid,
        reference_code: String,
        now: DateTime<Utc>,
    ) -> InsertPaymentEntity {
        InsertPaymentEntity {
            id: Uuid::new_v4(),
            merchant_id,
            reference_code,
            external_id: self.external_id.clone(),
            amount: self.amount,
            currency: self.currency.clone(),
            payment_method: self.payment_method.to_string(),
            customer_phone: self.customer_phone.clone(),
            customer_email: self.customer_email.clone(),
            description: self.description.clone(),
            metadata: self.metadata.clone(),
            source: SOURCE_API.to_string(),
            status: PaymentStatus::Pending.to_string(),
            created_at: now,
            updated_at: now,
            expires_at: now + Duration::hours(self.expires_in_hours),
        }
    }
}

pub fn validate_create_payment(
    model: CreatePaymentModel,
    default_expiry_hours: i64,
) -> Result<ValidatedPayment, String> {
    let amount = parse_amount(model.amount.as_ref())?;

    let currency = match non_empty(model.currency) {
        None => DEFAULT_CURRENCY.to_string(),
        Some(currency) if currency.len() == 3 && currency.chars().all(|c| c.is_ascii_alphabetic()) => {
            currency.to_ascii_uppercase()
        }
        Some(_) => return Err("currency must be a 3-letter code".to_string()),
    };

    let customer_phone =
        non_empty(model.customer_phone).ok_or_else(|| "customer_phone is required".to_string())?;
    if !is_valid_phone(&customer_phone) {
        return Err("customer_phone must contain 7 to 15 digits".to_string());
    }

    let customer_email = non_empty(model.customer_email);
    if let Some(email) = customer_email.as_deref() {
        if !is_valid_email(email) {
            return Err("customer_email is not a valid email address".to_string());
        }
    }

    let payment_method = match non_empty(model.payment_method) {
        None => PaymentMethod::default(),
        Some(method) => PaymentMethod::parse(&method).ok_or_else(|| {
            "payment_method must be one of mtn_momo, bank_transfer, cash".to_string()
        })?,
    };

    let description = non_empty(model.description);
    if description
        .as_deref()
        .is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_CHARS)
    {
        return Err(format!(
            "description must be at most {MAX_DESCRIPTION_CHARS} characters"
        ));
    }

    let external_id = non_empty(model.external_id);
    if external_id
        .as_deref()
        .is_some_and(|id| id.chars().count() > MAX_EXTERNAL_ID_CHARS)
    {
        return Err(format!(
            "external_id must be at most {MAX_EXTERNAL_ID_CHARS} characters"
        ));
    }

    let metadata = match model.metadata {
        None | Some(Value::Null) => Value::Object(Default::default()),
        Some(Value::Object(map)) => Value::Object(map),
        Some(_) => return Err("metadata must be a JSON object".to_string()),
    };

    let expires_in_hours = model.expires_in_hours.unwrap_or(default_expiry_hours);
    if !(MIN_EXPIRES_IN_HOURS..=MAX_EXPIRES_IN_HOURS).contains(&expires_in_hours) {
        return Err(format!(
            "expires_in_hours must be between {MIN_EXPIRES_IN_HOURS} and {MAX_EXPIRES_IN_HOURS}"
        ));
    }

    Ok(ValidatedPayment {
        amount,
        currency,
        payment_method,
        customer_phone,
        customer_email,
        description,
        external_id,
        metadata,
        expires_in_hours,
    })
}

pub fn normalize_list_query(query: ListPaymentsQuery) -> Result<ListPaymentsFilter, String> {
    let status = match non_empty(query.status) {
        None => None,
        Some(status) => Some(PaymentStatus::parse(&status).ok_or_else(|| {
            "status must be one of pending, matched, confirmed, rejected, expired".to_string()
        })?),
    };

    let offset = query.offset.unwrap_or(0);
    if offset < 0 {
        return Err("offset must not be negative".to_string());
    }

    Ok(ListPaymentsFilter {
        status,
        customer_phone: non_empty(query.customer_phone),
        limit: query
            .limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT),
        offset,
    })
}

pub fn normalize_rejection_reason(reason: Option<String>) -> Result<Option<String>, String> {
    let reason = non_empty(reason);
    if reason
        .as_deref()
        .is_some_and(|r| r.chars().count() > MAX_REJECTION_REASON_CHARS)
    {
        return Err(format!(
            "reason must be at most {MAX_REJECTION_REASON_CHARS} characters"
        ));
    }
    Ok(reason)
}

fn parse_amount(raw: Option<&Value>) -> Result<Decimal, String> {
    let amount = match raw {
        None | Some(Value::Null) => return Err("amount is required".to_string()),
        Some(Value::Number(number)) => {
            let text = number.to_string();
            Decimal::from_str(&text).or_else(|_| Decimal::from_scientific(&text))
        }
        Some(Value::String(text)) => Decimal::from_str(text.trim()),
        Some(_) => return Err("amount must be a number".to_string()),
    }
    .map_err(|_| "amount must be a number".to_string())?;

    if amount <= Decimal::ZERO {
        return Err("amount must be greater than 0".to_string());
    }
    if amount.normalize().scale() > 2 {
        return Err("amount must have at most 2 decimal places".to_string());
    }
    if amount >= Decimal::from(MAX_AMOUNT_EXCLUSIVE) {
        return Err("amount is too large".to_string());
    }

    Ok(amount.round_dp(2))
}

fn is_valid_phone(phone: &str) -> bool {
    let trimmed = phone.trim();
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let digits: String = unsigned
        .chars()
        .filter(|c| *c != ' ' && *c != '-')
        .collect();

    (7..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
}

pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !email.chars().any(char::is_whitespace)
        && !domain.contains('@')
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
