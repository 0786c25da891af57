use std::fmt::Display;

use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum WebhookEvent {
    #[serde(rename = "payment.created")]
    PaymentCreated,
    #[serde(rename = "payment.confirmed")]
    PaymentConfirmed,
    #[serde(rename = "payment.rejected")]
    PaymentRejected,
}

impl WebhookEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookEvent::PaymentCreated => "payment.created",
            WebhookEvent::PaymentConfirmed => "payment.confirmed",
            WebhookEvent::PaymentRejected => "payment.rejected",
        }
    }
}

impl Display for WebhookEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
