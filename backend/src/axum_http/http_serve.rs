use crate::{
    auth::{admin::AdminTokens, merchant::MerchantAuthenticator},
    axum_http::{
        default_routers,
        error_responses::envelope_errors,
        routers::{
            self,
            admin::AdminState,
            payments::PaymentsState,
        },
    },
    config::{config_model::DotEnvyConfig, stage::Stage},
    usecases::{
        admin::{AdminCredentials, AdminUseCase},
        leads::LeadsUseCase,
        payments::PaymentsUseCase,
        rate_limiter::{InMemoryRateLimiter, RateLimitPolicy, RateLimiter, spawn_sweeper},
        webhook_dispatcher::{WebhookDispatcher, WebhookDispatcherSettings},
    },
};
use anyhow::Result;
use axum::{
    Router,
    middleware,
    http::{
        HeaderName, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::get,
};
use crates::{
    domain::repositories::{
        leads::LeadRepository, merchants::MerchantRepository, payments::PaymentRepository,
        webhooks::WebhookSender,
    },
    infra::{
        db::{
            postgres::postgres_connection::PgPoolSquad,
            repositories::{
                leads::LeadPostgres, merchants::MerchantPostgres, payments::PaymentPostgres,
            },
        },
        webhooks::http_sender::ReqwestWebhookSender,
    },
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::{net::TcpListener, task::JoinHandle};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

#[derive(Clone)]
pub struct RateLimiters {
    pub payments: Arc<InMemoryRateLimiter>,
    pub contact: Arc<InMemoryRateLimiter>,
    pub system_request: Arc<InMemoryRateLimiter>,
    pub admin_login: Arc<InMemoryRateLimiter>,
}

impl RateLimiters {
    pub fn from_config(config: &DotEnvyConfig) -> Self {
        let limits = &config.rate_limits;
        Self {
            payments: Arc::new(InMemoryRateLimiter::new(RateLimitPolicy::per_minute(
                config.payments.rate_limit_per_minute,
            ))),
            contact: Arc::new(InMemoryRateLimiter::new(RateLimitPolicy::per_minute(
                limits.contact_per_minute,
            ))),
            system_request: Arc::new(InMemoryRateLimiter::new(RateLimitPolicy::per_hour(
                limits.system_request_per_hour,
            ))),
            admin_login: Arc::new(InMemoryRateLimiter::new(RateLimitPolicy::per_hour(
                limits.admin_login_per_hour,
            ))),
        }
    }

    pub fn all(&self) -> Vec<Arc<InMemoryRateLimiter>> {
        vec![
            Arc::clone(&self.payments),
            Arc::clone(&self.contact),
            Arc::clone(&self.system_request),
            Arc::clone(&self.admin_login),
        ]
    }
}

/// Everything the HTTP layer needs, independent of how it was built.
#[derive(Clone)]
pub struct AppDependencies {
    pub payments: PaymentsState,
    pub leads: Arc<LeadsUseCase>,
    pub admin: AdminState,
    pub limiters: RateLimiters,
}

/// Postgres-backed dependencies plus the background webhook consumer.
pub fn build_dependencies(
    config: &DotEnvyConfig,
    db_pool: Arc<PgPoolSquad>,
) -> Result<(AppDependencies, JoinHandle<()>)> {
    let payment_repository: Arc<dyn PaymentRepository + Send + Sync> =
        Arc::new(PaymentPostgres::new(Arc::clone(&db_pool)));
    let merchant_repository: Arc<dyn MerchantRepository + Send + Sync> =
        Arc::new(MerchantPostgres::new(Arc::clone(&db_pool)));
    let lead_repository: Arc<dyn LeadRepository + Send + Sync> =
        Arc::new(LeadPostgres::new(Arc::clone(&db_pool)));
    let webhook_sender: Arc<dyn WebhookSender + Send + Sync> = Arc::new(
        ReqwestWebhookSender::new(Duration::from_secs(config.webhooks.timeout_secs))?,
    );

    let (dispatcher, dispatcher_handle) = WebhookDispatcher::spawn(
        Arc::clone(&merchant_repository),
        webhook_sender,
        WebhookDispatcherSettings {
            queue_capacity: config.webhooks.queue_capacity,
            max_concurrency: config.webhooks.max_concurrency,
        },
    );

    let payments_usecase = PaymentsUseCase::new(
        payment_repository,
        Arc::new(dispatcher),
        config.payments.default_expiry_hours,
    );
    let leads_usecase = Arc::new(LeadsUseCase::new(lead_repository));

    let admin_tokens = Arc::new(AdminTokens::new(
        &config.admin.jwt_secret,
        chrono::Duration::hours(config.admin.token_ttl_hours),
    ));
    let admin_usecase = AdminUseCase::new(
        AdminCredentials {
            email: config.admin.email.clone(),
            password_hash: config.admin.password_hash.clone(),
        },
        Arc::clone(&admin_tokens),
    );

    let dependencies = AppDependencies {
        payments: PaymentsState {
            usecase: Arc::new(payments_usecase),
            authenticator: Arc::new(MerchantAuthenticator::new(merchant_repository)),
        },
        leads: Arc::clone(&leads_usecase),
        admin: AdminState {
            usecase: Arc::new(admin_usecase),
            tokens: admin_tokens,
            leads: leads_usecase,
            secure_cookie: config.stage == Stage::Production,
        },
        limiters: RateLimiters::from_config(config),
    };

    Ok((dependencies, dispatcher_handle))
}

pub fn app(dependencies: AppDependencies) -> Router {
    let limiters = dependencies.limiters;
    let payments_limiter: Arc<dyn RateLimiter> = limiters.payments;
    let contact_limiter: Arc<dyn RateLimiter> = limiters.contact;
    let system_request_limiter: Arc<dyn RateLimiter> = limiters.system_request;
    let admin_login_limiter: Arc<dyn RateLimiter> = limiters.admin_login;

    Router::new()
        .fallback(default_routers::not_found)
        .nest(
            "/api/v1/payments",
            routers::payments::routes(dependencies.payments, payments_limiter),
        )
        .nest(
            "/api/v1/admin",
            routers::admin::routes(dependencies.admin, admin_login_limiter),
        )
        .nest(
            "/api/v1",
            routers::leads::routes(dependencies.leads, contact_limiter, system_request_limiter),
        )
        .route("/api/v1/health-check", get(default_routers::health_check))
}

/// Transport concerns around the routes; every error leaving this stack is
/// a JSON envelope.
pub fn with_http_layers(router: Router, body_limit_bytes: usize, timeout: Duration) -> Router {
    router
        .layer(TimeoutLayer::new(timeout))
        .layer(RequestBodyLimitLayer::new(body_limit_bytes))
        .layer(middleware::map_response(envelope_errors))
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([
                    AUTHORIZATION,
                    CONTENT_TYPE,
                    HeaderName::from_static("x-api-key"),
                ])
                .allow_origin(Any),
        )
        .layer(TraceLayer::new_for_http())
}

pub async fn start(config: Arc<DotEnvyConfig>, dependencies: AppDependencies) -> Result<()> {
    let sweeper = spawn_sweeper(
        dependencies.limiters.all(),
        Duration::from_secs(config.rate_limits.sweep_interval_secs.max(1)),
    );

    let app = with_http_layers(
        app(dependencies),
        (config.backend_server.body_limit * 1024 * 1024).try_into()?,
        Duration::from_secs(config.backend_server.timeout),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.backend_server.port));
    let listener = TcpListener::bind(addr).await?;

    info!("Server is running on port {}", config.backend_server.port);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    sweeper.abort();
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to install CTRL+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install SIGTERM signal handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}
