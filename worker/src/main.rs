use anyhow::Result;
use crates::{
    domain::repositories::payments::PaymentRepository,
    infra::db::{postgres::postgres_connection, repositories::payments::PaymentPostgres},
};
use std::{sync::Arc, time::Duration};
use tracing::{error, info};
use worker::{
    axum_http::http_serve, config::config_loader, services::worker_loop::run_expiry_loop,
    usecases::expire_overdue_payments::ExpirePaymentsUseCase,
};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        error!("Worker exited with error: {:?}", error);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    crates::observability::init_observability("worker")?;

    let dotenvy_env = Arc::new(config_loader::load()?);
    info!(stage = %dotenvy_env.stage, "ENV has been loaded");

    let postgres_pool = postgres_connection::establish_connection(
        &dotenvy_env.database.url,
        dotenvy_env.database.max_connections,
    )?;
    info!("Postgres connection has been established");

    let payment_repository: Arc<dyn PaymentRepository + Send + Sync> =
        Arc::new(PaymentPostgres::new(Arc::new(postgres_pool)));
    let expire_usecase = Arc::new(ExpirePaymentsUseCase::new(payment_repository));

    let expiry_loop = tokio::spawn(run_expiry_loop(
        expire_usecase,
        Duration::from_secs(dotenvy_env.expiry.sweep_interval_secs),
    ));
    let server = tokio::spawn(http_serve::start(Arc::clone(&dotenvy_env)));

    tokio::select! {
        result = server => result??,
        result = expiry_loop => result?,
    };
    Ok(())
}
