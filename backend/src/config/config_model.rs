use crate::config::stage::Stage;

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub stage: Stage,
    pub backend_server: BackendServer,
    pub database: Database,
    pub payments: Payments,
    pub webhooks: Webhooks,
    pub rate_limits: RateLimits,
    pub admin: Admin,
}

#[derive(Debug, Clone)]
pub struct BackendServer {
    pub port: u16,
    /// MiB
    pub body_limit: u64,
    /// seconds
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct Payments {
    pub default_expiry_hours: i64,
    pub rate_limit_per_minute: u32,
}

#[derive(Debug, Clone)]
pub struct Webhooks {
    pub timeout_secs: u64,
    pub queue_capacity: usize,
    pub max_concurrency: usize,
}

#[derive(Debug, Clone)]
pub struct RateLimits {
    pub contact_per_minute: u32,
    pub system_request_per_hour: u32,
    pub admin_login_per_hour: u32,
    pub sweep_interval_secs: u64,
}

#[derive(Clone)]
pub struct Admin {
    pub email: String,
    /// Argon2 PHC string.
    pub password_hash: String,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

// Secrets stay out of logs.
impl std::fmt::Debug for Admin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Admin")
            .field("email", &self.email)
            .field("token_ttl_hours", &self.token_ttl_hours)
            .finish_non_exhaustive()
    }
}
