use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use crates::{
    domain::{
        entities::merchants::MerchantEntity,
        repositories::{merchants::MerchantRepository, webhooks::WebhookSender},
        value_objects::{
            enums::webhook_events::WebhookEvent,
            payments::PaymentDto,
            webhooks::{
                EVENT_HEADER, SIGNATURE_HEADER, TIMESTAMP_HEADER, WebhookPayload, WebhookRequest,
            },
        },
    },
    payments::webhook_signature::sign_payload,
};
use tokio::{
    sync::{Semaphore, mpsc},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Queues a payment event for delivery. Never blocks and never fails the caller.
#[cfg_attr(test, mockall::automock)]
pub trait WebhookDispatch: Send + Sync {
    fn dispatch(&self, merchant_id: Uuid, event: WebhookEvent, payment: PaymentDto);
}

#[derive(Debug, Clone)]
pub struct WebhookJob {
    pub merchant_id: Uuid,
    pub event: WebhookEvent,
    pub payment: PaymentDto,
}

#[derive(Debug, Clone, Copy)]
pub struct WebhookDispatcherSettings {
    pub queue_capacity: usize,
    pub max_concurrency: usize,
}

impl Default for WebhookDispatcherSettings {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            max_concurrency: 16,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered(u16),
    NonSuccessStatus(u16),
    Failed,
    Skipped,
}

pub struct WebhookDispatcher {
    queue: mpsc::Sender<WebhookJob>,
}

impl WebhookDispatcher {
    /// Starts the background consumer. The handle finishes once every
    /// dispatcher clone is dropped and the queue has drained.
    pub fn spawn(
        merchant_repository: Arc<dyn MerchantRepository + Send + Sync>,
        sender: Arc<dyn WebhookSender + Send + Sync>,
        settings: WebhookDispatcherSettings,
    ) -> (Self, JoinHandle<()>) {
        let (queue, receiver) = mpsc::channel(settings.queue_capacity.max(1));
        let delivery = Arc::new(WebhookDelivery::new(merchant_repository, sender));
        let handle = tokio::spawn(run_consumer(
            receiver,
            delivery,
            settings.max_concurrency.max(1),
        ));

        (Self { queue }, handle)
    }
}

impl WebhookDispatch for WebhookDispatcher {
    fn dispatch(&self, merchant_id: Uuid, event: WebhookEvent, payment: PaymentDto) {
        let payment_id = payment.id;
        let job = WebhookJob {
            merchant_id,
            event,
            payment,
        };

        match self.queue.try_send(job) {
            Ok(()) => debug!(%merchant_id, %payment_id, %event, "webhooks: event queued"),
            Err(mpsc::error::TrySendError::Full(_)) => warn!(
                %merchant_id,
                %payment_id,
                %event,
                "webhooks: queue full, event dropped"
            ),
            Err(mpsc::error::TrySendError::Closed(_)) => error!(
                %merchant_id,
                %payment_id,
                %event,
                "webhooks: consumer stopped, event dropped"
            ),
        }
    }
}

async fn run_consumer(
    mut receiver: mpsc::Receiver<WebhookJob>,
    delivery: Arc<WebhookDelivery>,
    max_concurrency: usize,
) {
    let permits = Arc::new(Semaphore::new(max_concurrency));
    let mut in_flight = tokio::task::JoinSet::new();

    while let Some(job) = receiver.recv().await {
        let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
            break;
        };
        let delivery = Arc::clone(&delivery);
        in_flight.spawn(async move {
            delivery.deliver(job).await;
            drop(permit);
        });

        while in_flight.try_join_next().is_some() {}
    }

    while in_flight.join_next().await.is_some() {}
    info!("webhooks: consumer stopped");
}

/// Performs a single delivery: merchant lookup, signing, POST, logging.
pub struct WebhookDelivery {
    merchant_repository: Arc<dyn MerchantRepository + Send + Sync>,
    sender: Arc<dyn WebhookSender + Send + Sync>,
}

impl WebhookDelivery {
    pub fn new(
        merchant_repository: Arc<dyn MerchantRepository + Send + Sync>,
        sender: Arc<dyn WebhookSender + Send + Sync>,
    ) -> Self {
        Self {
            merchant_repository,
            sender,
        }
    }

    pub async fn deliver(&self, job: WebhookJob) -> DeliveryOutcome {
        let merchant_id = job.merchant_id;
        let payment_id = job.payment.id;
        let event = job.event;

        let merchant = match self.merchant_repository.find_by_id(merchant_id).await {
            Ok(Some(merchant)) => merchant,
            Ok(None) => {
                warn!(%merchant_id, %payment_id, %event, "webhooks: merchant not found");
                return DeliveryOutcome::Skipped;
            }
            Err(err) => {
                error!(
                    %merchant_id,
                    %payment_id,
                    %event,
                    db_error = ?err,
                    "webhooks: failed to load merchant"
                );
                return DeliveryOutcome::Failed;
            }
        };

        let request = match build_request(&merchant, job, Utc::now().timestamp()) {
            Ok(Some(request)) => request,
            Ok(None) => {
                debug!(%merchant_id, %payment_id, %event, "webhooks: no webhook url configured");
                return DeliveryOutcome::Skipped;
            }
            Err(err) => {
                error!(%merchant_id, %payment_id, %event, error = ?err, "webhooks: failed to build payload");
                return DeliveryOutcome::Failed;
            }
        };

        match self.sender.send(request).await {
            Ok(status) if (200..300).contains(&status) => {
                info!(%merchant_id, %payment_id, %event, status, "webhooks: delivered");
                DeliveryOutcome::Delivered(status)
            }
            Ok(status) => {
                warn!(
                    %merchant_id,
                    %payment_id,
                    %event,
                    status,
                    "webhooks: merchant endpoint answered with a non-success status"
                );
                DeliveryOutcome::NonSuccessStatus(status)
            }
            Err(err) => {
                warn!(%merchant_id, %payment_id, %event, error = %err, "webhooks: delivery failed");
                DeliveryOutcome::Failed
            }
        }
    }
}

/// `None` when the merchant has no webhook url.
pub fn build_request(
    merchant: &MerchantEntity,
    job: WebhookJob,
    timestamp: i64,
) -> Result<Option<WebhookRequest>> {
    let Some(url) = merchant
        .webhook_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
    else {
        return Ok(None);
    };

    let payload = WebhookPayload {
        event: job.event,
        payment: job.payment,
        timestamp,
    };
    let body = serde_json::to_vec(&payload)?;

    let mut headers = vec![
        (EVENT_HEADER.to_string(), job.event.to_string()),
        (TIMESTAMP_HEADER.to_string(), timestamp.to_string()),
    ];
    if let Some(secret) = merchant
        .webhook_secret
        .as_deref()
        .filter(|secret| !secret.is_empty())
    {
        headers.push((
            SIGNATURE_HEADER.to_string(),
            sign_payload(secret, timestamp, &body)?,
        ));
    }

    Ok(Some(WebhookRequest {
        url: url.to_string(),
        headers,
        body,
    }))
}
