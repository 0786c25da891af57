use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::value_objects::webhooks::WebhookRequest;

/// Outbound transport for merchant webhooks.
#[automock]
#[async_trait]
pub trait WebhookSender {
    /// Performs the POST and returns the HTTP status code. Transport failures
    /// (connect error, timeout) are errors; non-2xx statuses are not.
    async fn send(&self, request: WebhookRequest) -> Result<u16>;
}
