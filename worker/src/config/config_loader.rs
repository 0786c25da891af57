use std::str::FromStr;

use anyhow::{Context, Result, bail};
use backend::config::config_loader::get_stage;

use super::config_model::{Database, DotEnvyConfig, Expiry, WorkerServer};

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let worker_server = WorkerServer {
        port: required_parse("SERVER_PORT_WORKER")?,
        body_limit: optional_parse("SERVER_BODY_LIMIT", 1)?,
        timeout: optional_parse("SERVER_TIMEOUT", 30)?,
    };

    let database = Database {
        url: std::env::var("DATABASE_URL").context("DATABASE_URL is invalid")?,
        max_connections: optional_parse("DATABASE_MAX_CONNECTIONS", 2)?,
    };

    let sweep_interval_secs = optional_parse("EXPIRY_SWEEP_INTERVAL_SECS", 60)?;
    if sweep_interval_secs == 0 {
        bail!("EXPIRY_SWEEP_INTERVAL_SECS must be greater than 0");
    }

    Ok(DotEnvyConfig {
        stage: get_stage(),
        worker_server,
        database,
        expiry: Expiry {
            sweep_interval_secs,
        },
    })
}

fn required_parse<T>(key: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    std::env::var(key)
        .with_context(|| format!("{key} is invalid"))?
        .trim()
        .parse()
        .with_context(|| format!("{key} is invalid"))
}

fn optional_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} is invalid")),
        _ => Ok(default),
    }
}
