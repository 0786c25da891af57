use std::str::FromStr;

use anyhow::{Context, Result};

use crate::config::{
    config_model::{
        Admin, BackendServer, Database, DotEnvyConfig, Payments, RateLimits, Webhooks,
    },
    stage::Stage,
};

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let backend_server = BackendServer {
        port: required_parse("SERVER_PORT_BACKEND")?,
        body_limit: optional_parse("SERVER_BODY_LIMIT", 2)?,
        timeout: optional_parse("SERVER_TIMEOUT", 30)?,
    };

    let database = Database {
        url: required("DATABASE_URL")?,
        max_connections: optional_parse("DATABASE_MAX_CONNECTIONS", 10)?,
    };

    let payments = Payments {
        default_expiry_hours: optional_parse("PAYMENT_DEFAULT_EXPIRY_HOURS", 24)?,
        rate_limit_per_minute: optional_parse("PAYMENT_API_RATE_LIMIT_PER_MINUTE", 120)?,
    };

    let webhooks = Webhooks {
        timeout_secs: optional_parse("WEBHOOK_TIMEOUT_SECS", 10)?,
        queue_capacity: optional_parse("WEBHOOK_QUEUE_CAPACITY", 1024)?,
        max_concurrency: optional_parse("WEBHOOK_MAX_CONCURRENCY", 16)?,
    };

    let rate_limits = RateLimits {
        contact_per_minute: optional_parse("CONTACT_RATE_LIMIT_PER_MINUTE", 5)?,
        system_request_per_hour: optional_parse("SYSTEM_REQUEST_RATE_LIMIT_PER_HOUR", 10)?,
        admin_login_per_hour: optional_parse("ADMIN_LOGIN_RATE_LIMIT_PER_HOUR", 10)?,
        sweep_interval_secs: optional_parse("RATE_LIMIT_SWEEP_INTERVAL_SECS", 300)?,
    };

    let admin = Admin {
        email: required("ADMIN_EMAIL")?,
        password_hash: required("ADMIN_PASSWORD_HASH")?,
        jwt_secret: required("JWT_ADMIN_SECRET")?,
        token_ttl_hours: optional_parse("ADMIN_TOKEN_TTL_HOURS", 12)?,
    };

    Ok(DotEnvyConfig {
        stage: get_stage(),
        backend_server,
        database,
        payments,
        webhooks,
        rate_limits,
        admin,
    })
}

pub fn get_stage() -> Stage {
    dotenvy::dotenv().ok();

    let stage_str = std::env::var("STAGE").unwrap_or_default();
    Stage::try_from(stage_str.as_str()).unwrap_or_default()
}

fn required(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("{key} is invalid"))
}

fn required_parse<T>(key: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    required(key)?
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
