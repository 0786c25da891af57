use serde::Serialize;

use crate::domain::value_objects::{enums::webhook_events::WebhookEvent, payments::PaymentDto};

pub const EVENT_HEADER: &str = "X-PaySSD-Event";
pub const TIMESTAMP_HEADER: &str = "X-PaySSD-Timestamp";
pub const SIGNATURE_HEADER: &str = "X-PaySSD-Signature";

#[derive(Debug, Clone, Serialize)]
pub struct WebhookPayload {
    pub event: WebhookEvent,
    pub payment: PaymentDto,
    pub timestamp: i64,
}

/// A fully prepared outbound delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}
