use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use crates::domain::repositories::payments::PaymentRepository;
use tracing::{error, info};

/// Moves every pending or matched payment past its `expires_at` to expired.
pub struct ExpirePaymentsUseCase {
    payment_repository: Arc<dyn PaymentRepository + Send + Sync>,
}

impl ExpirePaymentsUseCase {
    pub fn new(payment_repository: Arc<dyn PaymentRepository + Send + Sync>) -> Self {
        Self { payment_repository }
    }

    pub async fn expire_overdue(&self) -> Result<usize> {
        self.expire_overdue_at(Utc::now()).await
    }

    pub async fn expire_overdue_at(&self, now: DateTime<Utc>) -> Result<usize> {
        let expired = self
            .payment_repository
            .expire_overdue(now)
            .await
            .inspect_err(|err| error!(db_error = ?err, "expiry: sweep failed"))?;

        if expired > 0 {
            info!(expired, "expiry: overdue payments expired");
        }
        Ok(expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use chrono::TimeZone;
    use crates::domain::repositories::payments::MockPaymentRepository;

    #[tokio::test]
    async fn passes_the_sweep_time_and_returns_the_count() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let mut repo = MockPaymentRepository::new();
        repo.expect_expire_overdue()
            .withf(move |at| *at == now)
            .times(1)
            .returning(|_| Ok(3));

        let usecase = ExpirePaymentsUseCase::new(Arc::new(repo));

        assert_eq!(usecase.expire_overdue_at(now).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn nothing_overdue_is_not_an_error() {
        let mut repo = MockPaymentRepository::new();
        repo.expect_expire_overdue().returning(|_| Ok(0));

        let usecase = ExpirePaymentsUseCase::new(Arc::new(repo));

        assert_eq!(usecase.expire_overdue().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn database_errors_are_returned() {
        let mut repo = MockPaymentRepository::new();
        repo.expect_expire_overdue()
            .returning(|_| Err(anyhow!("connection refused")));

        let usecase = ExpirePaymentsUseCase::new(Arc::new(repo));

        assert!(usecase.expire_overdue().await.is_err());
    }
}
