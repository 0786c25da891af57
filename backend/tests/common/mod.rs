#![allow(dead_code)]

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::{Result, anyhow};
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode},
};
use backend::{
    auth::{admin::AdminTokens, merchant::MerchantAuthenticator},
    axum_http::{
        http_serve::{AppDependencies, RateLimiters, app, with_http_layers},
        routers::{admin::AdminState, payments::PaymentsState},
    },
    usecases::{
        admin::{AdminCredentials, AdminUseCase},
        leads::LeadsUseCase,
        payments::PaymentsUseCase,
        rate_limiter::{InMemoryRateLimiter, RateLimitPolicy},
        webhook_dispatcher::{WebhookDispatcher, WebhookDispatcherSettings},
    },
};
use chrono::{DateTime, Utc};
use crates::{
    domain::{
        entities::{
            leads::{
                ContactMessageEntity, InsertContactMessageEntity, InsertSystemRequestEntity,
                SystemRequestEntity,
            },
            merchants::MerchantEntity,
            payments::{InsertPaymentEntity, PaymentEntity},
        },
        repositories::{
            leads::LeadRepository, merchants::MerchantRepository, payments::PaymentRepository,
            webhooks::WebhookSender,
        },
        value_objects::{
            enums::payment_statuses::PaymentStatus,
            leads::LeadPage,
            payments::{ListPaymentsFilter, PaymentInsertOutcome, PaymentPage, PaymentTransitionModel},
            webhooks::WebhookRequest,
        },
    },
    payments::api_keys::hash_api_key,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

pub const ADMIN_EMAIL: &str = "owner@studio.dev";
pub const ADMIN_PASSWORD: &str = "correct horse battery";
pub const ADMIN_SECRET: &str = "integration-test-admin-secret";
pub const BODY_LIMIT_BYTES: usize = 64 * 1024;

#[derive(Default)]
pub struct InMemoryPayments {
    rows: Mutex<Vec<PaymentEntity>>,
}

impl InMemoryPayments {
    pub fn snapshot(&self) -> Vec<PaymentEntity> {
        self.rows.lock().unwrap().clone()
    }

    pub fn set_expires_at(&self, payment_id: Uuid, expires_at: DateTime<Utc>) {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|row| row.id == payment_id) {
            row.expires_at = expires_at;
        }
    }
}

#[async_trait]
impl PaymentRepository for InMemoryPayments {
    async fn insert(&self, payment: InsertPaymentEntity) -> Result<PaymentInsertOutcome> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|row| row.reference_code == payment.reference_code) {
            return Ok(PaymentInsertOutcome::DuplicateReferenceCode);
        }
        if payment.external_id.is_some()
            && rows.iter().any(|row| {
                row.merchant_id == payment.merchant_id && row.external_id == payment.external_id
            })
        {
            return Ok(PaymentInsertOutcome::DuplicateExternalId);
        }

        let entity = payment.into_entity();
        rows.push(entity.clone());
        Ok(PaymentInsertOutcome::Inserted(entity))
    }

    async fn find_by_id(&self, merchant_id: Uuid, payment_id: Uuid) -> Result<Option<PaymentEntity>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|row| row.merchant_id == merchant_id && row.id == payment_id)
            .cloned())
    }

    async fn find_by_reference_code(
        &self,
        merchant_id: Uuid,
        reference_code: &str,
    ) -> Result<Option<PaymentEntity>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|row| row.merchant_id == merchant_id && row.reference_code == reference_code)
            .cloned())
    }

    async fn find_by_external_id(
        &self,
        merchant_id: Uuid,
        external_id: &str,
    ) -> Result<Option<PaymentEntity>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|row| {
                row.merchant_id == merchant_id && row.external_id.as_deref() == Some(external_id)
            })
            .cloned())
    }

    async fn list(&self, merchant_id: Uuid, filter: &ListPaymentsFilter) -> Result<PaymentPage> {
        let rows = self.rows.lock().unwrap();
        let mut matching: Vec<PaymentEntity> = rows
            .iter()
            .filter(|row| row.merchant_id == merchant_id)
            .filter(|row| filter.status.is_none_or(|status| row.status() == status))
            .filter(|row| {
                filter
                    .customer_phone
                    .as_deref()
                    .is_none_or(|phone| row.customer_phone == phone)
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len() as i64;
        let payments = matching
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .collect();

        Ok(PaymentPage { payments, total })
    }

    async fn transition_status(
        &self,
        transition: PaymentTransitionModel,
    ) -> Result<Option<PaymentEntity>> {
        let mut rows = self.rows.lock().unwrap();
        let Some(row) = rows.iter_mut().find(|row| {
            row.merchant_id == transition.merchant_id && row.id == transition.payment_id
        }) else {
            return Ok(None);
        };
        if !transition.expected.contains(&row.status()) {
            return Ok(None);
        }

        row.status = transition.target.to_string();
        row.updated_at = transition.at;
        match transition.target {
            PaymentStatus::Confirmed => row.confirmed_at = Some(transition.at),
            PaymentStatus::Rejected => row.rejected_at = Some(transition.at),
            _ => {}
        }
        if let Some(metadata) = transition.metadata {
            row.metadata = metadata;
        }
        Ok(Some(row.clone()))
    }

    async fn expire_overdue(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut rows = self.rows.lock().unwrap();
        let mut expired = 0;
        for row in rows.iter_mut().filter(|row| row.is_overdue(now)) {
            row.status = PaymentStatus::Expired.to_string();
            row.updated_at = now;
            expired += 1;
        }
        Ok(expired)
    }
}

#[derive(Default)]
pub struct InMemoryMerchants {
    rows: Mutex<Vec<MerchantEntity>>,
}

impl InMemoryMerchants {
    pub fn add(&self, api_key: &str, webhook_url: Option<&str>) -> MerchantEntity {
        let now = Utc::now();
        let merchant = MerchantEntity {
            id: Uuid::new_v4(),
            name: format!("Merchant {api_key}"),
            api_key_hash: hash_api_key(api_key),
            mtn_momo_number: Some("0921111111".to_string()),
            bank_account: Some("Equity Bank 0012345".to_string()),
            webhook_url: webhook_url.map(str::to_string),
            webhook_secret: Some(format!("whsec_{api_key}")),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().unwrap().push(merchant.clone());
        merchant
    }

    pub fn deactivate(&self, merchant_id: Uuid) {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|row| row.id == merchant_id) {
            row.is_active = false;
        }
    }
}

#[async_trait]
impl MerchantRepository for InMemoryMerchants {
    async fn find_by_api_key_hash(&self, api_key_hash: &str) -> Result<Option<MerchantEntity>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|row| row.api_key_hash == api_key_hash)
            .cloned())
    }

    async fn find_by_id(&self, merchant_id: Uuid) -> Result<Option<MerchantEntity>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|row| row.id == merchant_id)
            .cloned())
    }
}

#[derive(Default)]
pub struct InMemoryLeads {
    contact: Mutex<Vec<ContactMessageEntity>>,
    system: Mutex<Vec<SystemRequestEntity>>,
}

#[async_trait]
impl LeadRepository for InMemoryLeads {
    async fn insert_contact_message(&self, message: InsertContactMessageEntity) -> Result<Uuid> {
        let id = Uuid::new_v4();
        self.contact.lock().unwrap().push(ContactMessageEntity {
            id,
            name: message.name,
            email: message.email,
            phone: message.phone,
            subject: message.subject,
            message: message.message,
            client_ip: message.client_ip,
            created_at: message.created_at,
        });
        Ok(id)
    }

    async fn insert_system_request(&self, request: InsertSystemRequestEntity) -> Result<Uuid> {
        let id = Uuid::new_v4();
        self.system.lock().unwrap().push(SystemRequestEntity {
            id,
            name: request.name,
            email: request.email,
            phone: request.phone,
            company: request.company,
            system_type: request.system_type,
            budget: request.budget,
            timeline: request.timeline,
            description: request.description,
            client_ip: request.client_ip,
            created_at: request.created_at,
        });
        Ok(id)
    }

    async fn list_contact_messages(&self, page: LeadPage) -> Result<Vec<ContactMessageEntity>> {
        let rows = self.contact.lock().unwrap();
        Ok(rows
            .iter()
            .rev()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .cloned()
            .collect())
    }

    async fn list_system_requests(&self, page: LeadPage) -> Result<Vec<SystemRequestEntity>> {
        let rows = self.system.lock().unwrap();
        Ok(rows
            .iter()
            .rev()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .cloned()
            .collect())
    }
}

/// Records every outbound webhook; optionally fails them all.
#[derive(Default)]
pub struct RecordingSender {
    pub requests: Mutex<Vec<WebhookRequest>>,
    pub fail: bool,
}

#[async_trait]
impl WebhookSender for RecordingSender {
    async fn send(&self, request: WebhookRequest) -> Result<u16> {
        self.requests.lock().unwrap().push(request);
        if self.fail {
            Err(anyhow!("webhook connection failed"))
        } else {
            Ok(200)
        }
    }
}

pub struct TestLimits {
    pub payments_per_minute: u32,
    pub contact_per_minute: u32,
    pub system_request_per_hour: u32,
    pub admin_login_per_hour: u32,
}

impl Default for TestLimits {
    fn default() -> Self {
        Self {
            payments_per_minute: 1_000,
            contact_per_minute: 5,
            system_request_per_hour: 10,
            admin_login_per_hour: 10,
        }
    }
}

pub struct TestApp {
    pub router: Router,
    pub payments: Arc<InMemoryPayments>,
    pub merchants: Arc<InMemoryMerchants>,
    pub leads: Arc<InMemoryLeads>,
    pub sender: Arc<RecordingSender>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::build(TestLimits::default(), false)
    }

    pub fn build(limits: TestLimits, failing_webhooks: bool) -> Self {
        let payments = Arc::new(InMemoryPayments::default());
        let merchants = Arc::new(InMemoryMerchants::default());
        let leads = Arc::new(InMemoryLeads::default());
        let sender = Arc::new(RecordingSender {
            fail: failing_webhooks,
            ..Default::default()
        });

        let (dispatcher, _consumer) = WebhookDispatcher::spawn(
            merchants.clone(),
            sender.clone(),
            WebhookDispatcherSettings::default(),
        );

        let leads_usecase = Arc::new(LeadsUseCase::new(leads.clone()));
        let tokens = Arc::new(AdminTokens::new(ADMIN_SECRET, chrono::Duration::hours(12)));
        let salt = SaltString::encode_b64(b"integration-salt").unwrap();
        let password_hash = Argon2::default()
            .hash_password(ADMIN_PASSWORD.as_bytes(), &salt)
            .unwrap()
            .to_string();

        let dependencies = AppDependencies {
            payments: PaymentsState {
                usecase: Arc::new(PaymentsUseCase::new(
                    payments.clone(),
                    Arc::new(dispatcher),
                    24,
                )),
                authenticator: Arc::new(MerchantAuthenticator::new(merchants.clone())),
            },
            leads: Arc::clone(&leads_usecase),
            admin: AdminState {
                usecase: Arc::new(AdminUseCase::new(
                    AdminCredentials {
                        email: ADMIN_EMAIL.to_string(),
                        password_hash,
                    },
                    Arc::clone(&tokens),
                )),
                tokens,
                leads: leads_usecase,
                secure_cookie: false,
            },
            limiters: RateLimiters {
                payments: Arc::new(InMemoryRateLimiter::new(RateLimitPolicy::per_minute(
                    limits.payments_per_minute,
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
            },
        };

        Self {
            router: with_http_layers(
                app(dependencies),
                BODY_LIMIT_BYTES,
                Duration::from_secs(30),
            ),
            payments,
            merchants,
            leads,
            sender,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, headers, body)
    }
}

pub fn get(uri: &str, api_key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(key) = api_key {
        builder = builder.header("authorization", format!("Bearer {key}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, api_key: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(key) = api_key {
        builder = builder.header("x-api-key", key);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn post_empty(uri: &str, api_key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some(key) = api_key {
        builder = builder.header("authorization", format!("Bearer {key}"));
    }
    builder.body(Body::empty()).unwrap()
}
