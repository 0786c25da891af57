use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{
    RunQueryDsl, dsl::count_star, insert_into, prelude::*,
    result::{DatabaseErrorKind, Error as DieselError},
    update,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::payments},
};
use domain::{
    entities::payments::{InsertPaymentEntity, PaymentEntity},
    repositories::payments::PaymentRepository,
    value_objects::{
        enums::payment_statuses::PaymentStatus,
        payments::{ListPaymentsFilter, PaymentInsertOutcome, PaymentPage, PaymentTransitionModel},
    },
};

/// Unique index names created by the payments migration.
const REFERENCE_CODE_CONSTRAINT: &str = "payments_reference_code_key";
const EXTERNAL_ID_CONSTRAINT: &str = "payments_merchant_id_external_id_key";

#[derive(Debug, AsChangeset)]
#[diesel(table_name = payments)]
struct PaymentStatusChangeset {
    status: String,
    updated_at: DateTime<Utc>,
    confirmed_at: Option<DateTime<Utc>>,
    rejected_at: Option<DateTime<Utc>>,
    metadata: Option<serde_json::Value>,
}

impl From<&PaymentTransitionModel> for PaymentStatusChangeset {
    fn from(value: &PaymentTransitionModel) -> Self {
        Self {
            status: value.target.to_string(),
            updated_at: value.at,
            confirmed_at: (value.target == PaymentStatus::Confirmed).then_some(value.at),
            rejected_at: (value.target == PaymentStatus::Rejected).then_some(value.at),
            metadata: value.metadata.clone(),
        }
    }
}

pub struct PaymentPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PaymentPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl PaymentRepository for PaymentPostgres {
    async fn insert(&self, payment: InsertPaymentEntity) -> Result<PaymentInsertOutcome> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = insert_into(payments::table)
            .values(&payment)
            .returning(PaymentEntity::as_returning())
            .get_result::<PaymentEntity>(&mut conn);

        match result {
            Ok(entity) => Ok(PaymentInsertOutcome::Inserted(entity)),
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info)) => {
                match info.constraint_name() {
                    Some(REFERENCE_CODE_CONSTRAINT) => Ok(PaymentInsertOutcome::DuplicateReferenceCode),
                    Some(EXTERNAL_ID_CONSTRAINT) => Ok(PaymentInsertOutcome::DuplicateExternalId),
                    other => Err(anyhow!(
                        "unexpected unique violation on payments (constraint: {:?})",
                        other
                    )),
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn find_by_id(
        &self,
        merchant_id: Uuid,
        payment_id: Uuid,
    ) -> Result<Option<PaymentEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = payments::table
            .filter(payments::id.eq(payment_id))
            .filter(payments::merchant_id.eq(merchant_id))
            .select(PaymentEntity::as_select())
            .first::<PaymentEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn find_by_reference_code(
        &self,
        merchant_id: Uuid,
        reference_code: &str,
    ) -> Result<Option<PaymentEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = payments::table
            .filter(payments::reference_code.eq(reference_code))
            .filter(payments::merchant_id.eq(merchant_id))
            .select(PaymentEntity::as_select())
            .first::<PaymentEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn find_by_external_id(
        &self,
        merchant_id: Uuid,
        external_id: &str,
    ) -> Result<Option<PaymentEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = payments::table
            .filter(payments::external_id.eq(external_id))
            .filter(payments::merchant_id.eq(merchant_id))
            .select(PaymentEntity::as_select())
            .first::<PaymentEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn list(&self, merchant_id: Uuid, filter: &ListPaymentsFilter) -> Result<PaymentPage> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let mut query = payments::table
            .filter(payments::merchant_id.eq(merchant_id))
            .into_boxed();
        let mut count_query = payments::table
            .filter(payments::merchant_id.eq(merchant_id))
            .into_boxed();

        if let Some(status) = filter.status {
            query = query.filter(payments::status.eq(status.as_str()));
            count_query = count_query.filter(payments::status.eq(status.as_str()));
        }

        if let Some(customer_phone) = filter.customer_phone.as_deref() {
            query = query.filter(payments::customer_phone.eq(customer_phone));
            count_query = count_query.filter(payments::customer_phone.eq(customer_phone));
        }

        let total = count_query.select(count_star()).first::<i64>(&mut conn)?;

        let payments = query
            .order(payments::created_at.desc())
            .limit(filter.limit)
            .offset(filter.offset)
            .select(PaymentEntity::as_select())
            .load::<PaymentEntity>(&mut conn)?;

        Ok(PaymentPage { payments, total })
    }

    async fn transition_status(
        &self,
        transition: PaymentTransitionModel,
    ) -> Result<Option<PaymentEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let expected = transition
            .expected
            .iter()
            .map(|status| status.to_string())
            .collect::<Vec<_>>();
        let changeset = PaymentStatusChangeset::from(&transition);

        // The status guard makes this a compare-and-swap: of two concurrent
        // transitions on the same row only one matches.
        let updated = update(payments::table)
            .filter(payments::id.eq(transition.payment_id))
            .filter(payments::merchant_id.eq(transition.merchant_id))
            .filter(payments::status.eq_any(expected))
            .set(&changeset)
            .returning(PaymentEntity::as_returning())
            .get_result::<PaymentEntity>(&mut conn)
            .optional()?;

        Ok(updated)
    }

    async fn expire_overdue(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let open = PaymentStatus::open()
            .iter()
            .map(|status| status.to_string())
            .collect::<Vec<_>>();

        let expired = update(payments::table)
            .filter(payments::status.eq_any(open))
            .filter(payments::expires_at.le(now))
            .set((
                payments::status.eq(PaymentStatus::Expired.to_string()),
                payments::updated_at.eq(now),
            ))
            .execute(&mut conn)?;

        Ok(expired)
    }
}
