use std::{sync::Arc, time::Duration};

use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::usecases::expire_overdue_payments::ExpirePaymentsUseCase;

/// Runs the expiry sweep every `interval`, forever. A failed sweep is logged
/// and retried on the next tick.
pub async fn run_expiry_loop(usecase: Arc<ExpirePaymentsUseCase>, interval: Duration) {
    info!(interval_secs = interval.as_secs(), "expiry: loop started");

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        sweep_once(&usecase).await;
    }
}

/// One sweep; returns the number of payments expired, 0 on failure.
pub async fn sweep_once(usecase: &ExpirePaymentsUseCase) -> usize {
    match usecase.expire_overdue().await {
        Ok(expired) => expired,
        Err(err) => {
            error!(error = ?err, "expiry: sweep will be retried on the next tick");
            0
        }
    }
}
