use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::{
    Client,
    header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue},
};
use std::time::Duration;

use crate::domain::{repositories::webhooks::WebhookSender, value_objects::webhooks::WebhookRequest};

pub struct ReqwestWebhookSender {
    client: Client,
}

impl ReqwestWebhookSender {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(concat!("payssd-webhooks/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl WebhookSender for ReqwestWebhookSender {
    async fn send(&self, request: WebhookRequest) -> Result<u16> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for (name, value) in &request.headers {
            headers.insert(
                HeaderName::from_bytes(name.as_bytes())?,
                HeaderValue::from_str(value)?,
            );
        }

        let response = self
            .client
            .post(&request.url)
            .headers(headers)
            .body(request.body)
            .send()
            .await
            .map_err(sanitize_reqwest_error)?;

        Ok(response.status().as_u16())
    }
}

/// Merchant endpoints may embed credentials in their URL, so the URL is kept
/// out of the error text.
fn sanitize_reqwest_error(error: reqwest::Error) -> anyhow::Error {
    if error.is_timeout() {
        return anyhow!("webhook request timed out");
    }
    if error.is_connect() {
        return anyhow!("webhook connection failed");
    }
    anyhow!("webhook request failed")
}
