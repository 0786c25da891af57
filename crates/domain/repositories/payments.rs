use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::payments::{InsertPaymentEntity, PaymentEntity},
    value_objects::payments::{
        ListPaymentsFilter, PaymentInsertOutcome, PaymentPage, PaymentTransitionModel,
    },
};

/// Persistence over the `payments` collection. Every lookup is scoped by
/// merchant; no method returns another merchant's row.
#[automock]
#[async_trait]
pub trait PaymentRepository {
    async fn insert(&self, payment: InsertPaymentEntity) -> Result<PaymentInsertOutcome>;

    async fn find_by_id(&self, merchant_id: Uuid, payment_id: Uuid)
    -> Result<Option<PaymentEntity>>;

    async fn find_by_reference_code(
        &self,
        merchant_id: Uuid,
        reference_code: &str,
    ) -> Result<Option<PaymentEntity>>;

    async fn find_by_external_id(
        &self,
        merchant_id: Uuid,
        external_id: &str,
    ) -> Result<Option<PaymentEntity>>;

    async fn list(&self, merchant_id: Uuid, filter: &ListPaymentsFilter) -> Result<PaymentPage>;

    /// Returns the updated row, or `None` when the stored status was no longer
    /// one of `transition.expected`.
    async fn transition_status(
        &self,
        transition: PaymentTransitionModel,
    ) -> Result<Option<PaymentEntity>>;

    /// Marks every open payment whose `expires_at` is at or before `now` as
    /// expired and returns how many rows changed.
    async fn expire_overdue(&self, now: DateTime<Utc>) -> Result<usize>;
}
