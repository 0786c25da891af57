use std::sync::Arc;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use crates::{
    domain::{
        entities::{merchants::MerchantEntity, payments::PaymentEntity},
        repositories::payments::PaymentRepository,
        value_objects::{
            enums::{payment_statuses::PaymentStatus, webhook_events::WebhookEvent},
            payments::{
                CreatePaymentModel, ListPaymentsQuery, PaginationDto, PaymentDto,
                PaymentInsertOutcome, PaymentInstructionsDto, PaymentTransitionModel,
                RejectPaymentModel,
            },
        },
    },
    payments::reference_code::generate_reference_code,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::usecases::{
    payment_validation::{normalize_list_query, normalize_rejection_reason, validate_create_payment},
    webhook_dispatcher::WebhookDispatch,
};

pub const MAX_REFERENCE_CODE_ATTEMPTS: usize = 5;
/// Re-reads allowed when a guarded update loses a race.
const MAX_TRANSITION_ATTEMPTS: usize = 3;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Missing API key")]
    Unauthenticated,
    #[error("Invalid API key")]
    InvalidCredential,
    #[error("{0}")]
    Validation(String),
    #[error("Payment not found")]
    NotFound,
    #[error("Payment is already confirmed")]
    AlreadyConfirmed,
    #[error("Payment is already rejected")]
    AlreadyRejected,
    #[error("{0}")]
    InvalidTransition(String),
    #[error("Too many requests, please try again later")]
    RateLimited,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl PaymentError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            PaymentError::Unauthenticated => StatusCode::UNAUTHORIZED,
            PaymentError::InvalidCredential => StatusCode::FORBIDDEN,
            PaymentError::Validation(_)
            | PaymentError::AlreadyConfirmed
            | PaymentError::AlreadyRejected
            | PaymentError::InvalidTransition(_) => StatusCode::BAD_REQUEST,
            PaymentError::NotFound => StatusCode::NOT_FOUND,
            PaymentError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            PaymentError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, PaymentError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentAction {
    Confirm,
    Reject,
}

impl PaymentAction {
    fn target(self) -> PaymentStatus {
        match self {
            PaymentAction::Confirm => PaymentStatus::Confirmed,
            PaymentAction::Reject => PaymentStatus::Rejected,
        }
    }

    fn event(self) -> WebhookEvent {
        match self {
            PaymentAction::Confirm => WebhookEvent::PaymentConfirmed,
            PaymentAction::Reject => WebhookEvent::PaymentRejected,
        }
    }

    fn verb(self) -> &'static str {
        match self {
            PaymentAction::Confirm => "confirm",
            PaymentAction::Reject => "reject",
        }
    }
}

/// Whether `action` may be applied to a payment currently in `status`.
pub fn check_transition(action: PaymentAction, status: PaymentStatus) -> UseCaseResult<()> {
    match (action, status) {
        (_, PaymentStatus::Pending | PaymentStatus::Matched) => Ok(()),
        (PaymentAction::Confirm, PaymentStatus::Confirmed) => Err(PaymentError::AlreadyConfirmed),
        (PaymentAction::Reject, PaymentStatus::Rejected) => Err(PaymentError::AlreadyRejected),
        (action, status) => Err(PaymentError::InvalidTransition(format!(
            "Cannot {} a{} {} payment",
            action.verb(),
            if status == PaymentStatus::Expired { "n" } else { "" },
            status
        ))),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedPayment {
    pub payment: PaymentDto,
    pub instructions: PaymentInstructionsDto,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentList {
    pub payments: Vec<PaymentDto>,
    pub pagination: PaginationDto,
}

pub struct PaymentsUseCase {
    payment_repository: Arc<dyn PaymentRepository + Send + Sync>,
    webhooks: Arc<dyn WebhookDispatch>,
    default_expiry_hours: i64,
}

impl PaymentsUseCase {
    pub fn new(
        payment_repository: Arc<dyn PaymentRepository + Send + Sync>,
        webhooks: Arc<dyn WebhookDispatch>,
        default_expiry_hours: i64,
    ) -> Self {
        Self {
            payment_repository,
            webhooks,
            default_expiry_hours,
        }
    }

    pub async fn create(
        &self,
        merchant: &MerchantEntity,
        model: CreatePaymentModel,
    ) -> UseCaseResult<CreatedPayment> {
        let merchant_id = merchant.id;
        let validated = validate_create_payment(model, self.default_expiry_hours).map_err(|msg| {
            info!(%merchant_id, reason = %msg, "payments: create rejected by validation");
            PaymentError::Validation(msg)
        })?;

        let now = Utc::now();
        for attempt in 1..=MAX_REFERENCE_CODE_ATTEMPTS {
            let entity = validated.to_insert_entity(merchant_id, generate_reference_code(), now);
            let outcome = self
                .payment_repository
                .insert(entity)
                .await
                .map_err(|err| {
                    error!(%merchant_id, db_error = ?err, "payments: failed to insert payment");
                    PaymentError::Internal(err)
                })?;

            match outcome {
                PaymentInsertOutcome::Inserted(payment) => {
                    info!(
                        %merchant_id,
                        payment_id = %payment.id,
                        reference_code = %payment.reference_code,
                        amount = %payment.amount,
                        currency = %payment.currency,
                        "payments: payment created"
                    );
                    let instructions = PaymentInstructionsDto::build(&payment, merchant);
                    let payment = PaymentDto::from(payment);
                    self.webhooks
                        .dispatch(merchant_id, WebhookEvent::PaymentCreated, payment.clone());
                    return Ok(CreatedPayment {
                        payment,
                        instructions,
                    });
                }
                PaymentInsertOutcome::DuplicateReferenceCode => {
                    warn!(%merchant_id, attempt, "payments: reference code collision, regenerating");
                }
                PaymentInsertOutcome::DuplicateExternalId => {
                    info!(%merchant_id, "payments: duplicate external_id");
                    return Err(PaymentError::Validation(
                        "external_id already exists for this merchant".to_string(),
                    ));
                }
            }
        }

        error!(
            %merchant_id,
            attempts = MAX_REFERENCE_CODE_ATTEMPTS,
            "payments: could not allocate a unique reference code"
        );
        Err(PaymentError::Internal(anyhow!(
            "reference code collided {} times",
            MAX_REFERENCE_CODE_ATTEMPTS
        )))
    }

    pub async fn get(&self, merchant_id: Uuid, token: &str) -> UseCaseResult<PaymentDto> {
        let payment = self.resolve(merchant_id, token).await?;
        let payment = self.expire_if_overdue(payment, Utc::now()).await?;
        Ok(PaymentDto::from(payment))
    }

    pub async fn list(
        &self,
        merchant_id: Uuid,
        query: ListPaymentsQuery,
    ) -> UseCaseResult<PaymentList> {
        let filter = normalize_list_query(query).map_err(PaymentError::Validation)?;

        // Overdue rows must not be listed under an open status.
        if let Err(err) = self.payment_repository.expire_overdue(Utc::now()).await {
            warn!(%merchant_id, db_error = ?err, "payments: expiry before list failed");
        }

        let page = self
            .payment_repository
            .list(merchant_id, &filter)
            .await
            .map_err(|err| {
                error!(%merchant_id, db_error = ?err, "payments: failed to list payments");
                PaymentError::Internal(err)
            })?;

        info!(
            %merchant_id,
            returned = page.payments.len(),
            total = page.total,
            "payments: listed payments"
        );

        Ok(PaymentList {
            payments: page.payments.into_iter().map(PaymentDto::from).collect(),
            pagination: PaginationDto::new(page.total, filter.limit, filter.offset),
        })
    }

    pub async fn confirm(&self, merchant_id: Uuid, token: &str) -> UseCaseResult<PaymentDto> {
        self.transition(merchant_id, token, PaymentAction::Confirm, None)
            .await
    }

    pub async fn reject(
        &self,
        merchant_id: Uuid,
        token: &str,
        model: RejectPaymentModel,
    ) -> UseCaseResult<PaymentDto> {
        let reason = normalize_rejection_reason(model.reason).map_err(PaymentError::Validation)?;
        self.transition(merchant_id, token, PaymentAction::Reject, reason)
            .await
    }

    async fn transition(
        &self,
        merchant_id: Uuid,
        token: &str,
        action: PaymentAction,
        reason: Option<String>,
    ) -> UseCaseResult<PaymentDto> {
        let mut payment = self.resolve(merchant_id, token).await?;

        for _ in 0..MAX_TRANSITION_ATTEMPTS {
            let now = Utc::now();
            payment = self.expire_if_overdue(payment, now).await?;
            let current = payment.status();
            check_transition(action, current)?;

            let metadata = reason.as_deref().map(|reason| {
                let mut metadata = match payment.metadata.clone() {
                    serde_json::Value::Object(map) => map,
                    _ => serde_json::Map::new(),
                };
                metadata.insert(
                    "rejection_reason".to_string(),
                    serde_json::Value::String(reason.to_string()),
                );
                serde_json::Value::Object(metadata)
            });

            let transition = PaymentTransitionModel {
                merchant_id,
                payment_id: payment.id,
                expected: vec![current],
                target: action.target(),
                at: now,
                metadata,
            };

            match self.apply(transition).await? {
                Some(updated) => {
                    info!(
                        %merchant_id,
                        payment_id = %updated.id,
                        from = %current,
                        to = %updated.status,
                        "payments: status changed"
                    );
                    let dto = PaymentDto::from(updated);
                    self.webhooks.dispatch(merchant_id, action.event(), dto.clone());
                    return Ok(dto);
                }
                None => {
                    warn!(
                        %merchant_id,
                        payment_id = %payment.id,
                        action = action.verb(),
                        "payments: payment changed concurrently, re-reading"
                    );
                    payment = self.reload(merchant_id, payment.id).await?;
                }
            }
        }

        Err(PaymentError::Internal(anyhow!(
            "payment {} kept changing during {}",
            payment.id,
            action.verb()
        )))
    }

    /// Moves an overdue open payment to expired before it is shown or acted on.
    async fn expire_if_overdue(
        &self,
        payment: PaymentEntity,
        now: DateTime<Utc>,
    ) -> UseCaseResult<PaymentEntity> {
        if !payment.is_overdue(now) {
            return Ok(payment);
        }

        let merchant_id = payment.merchant_id;
        let transition = PaymentTransitionModel {
            merchant_id,
            payment_id: payment.id,
            expected: vec![payment.status()],
            target: PaymentStatus::Expired,
            at: now,
            metadata: None,
        };

        match self.apply(transition).await? {
            Some(expired) => {
                info!(%merchant_id, payment_id = %expired.id, "payments: payment expired on access");
                Ok(expired)
            }
            None => self.reload(merchant_id, payment.id).await,
        }
    }

    async fn apply(
        &self,
        transition: PaymentTransitionModel,
    ) -> UseCaseResult<Option<PaymentEntity>> {
        let merchant_id = transition.merchant_id;
        let payment_id = transition.payment_id;
        self.payment_repository
            .transition_status(transition)
            .await
            .map_err(|err| {
                error!(
                    %merchant_id,
                    %payment_id,
                    db_error = ?err,
                    "payments: failed to update payment status"
                );
                PaymentError::Internal(err)
            })
    }

    async fn reload(&self, merchant_id: Uuid, payment_id: Uuid) -> UseCaseResult<PaymentEntity> {
        self.payment_repository
            .find_by_id(merchant_id, payment_id)
            .await
            .map_err(|err| {
                error!(%merchant_id, %payment_id, db_error = ?err, "payments: failed to reload payment");
                PaymentError::Internal(err)
            })?
            .ok_or(PaymentError::NotFound)
    }

    /// Resolves a path token as id, then reference code, then external id,
    /// always within the merchant's own payments.
    async fn resolve(&self, merchant_id: Uuid, token: &str) -> UseCaseResult<PaymentEntity> {
        let token = token.trim();
        if token.is_empty() {
            return Err(PaymentError::NotFound);
        }

        let lookup_failed = |err: anyhow::Error| {
            error!(%merchant_id, db_error = ?err, "payments: payment lookup failed");
            PaymentError::Internal(err)
        };

        if let Ok(payment_id) = Uuid::parse_str(token) {
            if let Some(payment) = self
                .payment_repository
                .find_by_id(merchant_id, payment_id)
                .await
                .map_err(lookup_failed)?
            {
                return Ok(payment);
            }
        }

        if let Some(payment) = self
            .payment_repository
            .find_by_reference_code(merchant_id, token)
            .await
            .map_err(lookup_failed)?
        {
            return Ok(payment);
        }

        if let Some(payment) = self
            .payment_repository
            .find_by_external_id(merchant_id, token)
            .await
            .map_err(lookup_failed)?
        {
            return Ok(payment);
        }

        info!(%merchant_id, token, "payments: payment not found");
        Err(PaymentError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::webhook_dispatcher::MockWebhookDispatch;
    use chrono::Duration;
    use crates::{
        domain::{
            repositories::payments::MockPaymentRepository,
            value_objects::payments::{PaymentPage, SOURCE_API},
        },
        payments::reference_code::is_reference_code,
    };
    use mockall::predicate::eq;
    use rust_decimal::Decimal;
    use serde_json::json;

    fn merchant() -> MerchantEntity {
        let now = Utc::now();
        MerchantEntity {
            id: Uuid::new_v4(),
            name: "Juba Books".to_string(),
            api_key_hash: String::new(),
            mtn_momo_number: Some("0921111111".to_string()),
            bank_account: None,
            webhook_url: None,
            webhook_secret: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn payment(merchant_id: Uuid, status: PaymentStatus) -> PaymentEntity {
        let now = Utc::now();
        PaymentEntity {
            id: Uuid::new_v4(),
            merchant_id,
            reference_code: "PSD-ABCD2345".to_string(),
            external_id: Some("order-1".to_string()),
            amount: Decimal::new(100, 0),
            currency: "SSP".to_string(),
            payment_method: "mtn_momo".to_string(),
            customer_phone: "0920000000".to_string(),
            customer_email: None,
            description: None,
            metadata: json!({ "order": 1 }),
            source: SOURCE_API.to_string(),
            status: status.to_string(),
            created_at: now,
            updated_at: now,
            expires_at: now + Duration::hours(24),
            confirmed_at: None,
            rejected_at: None,
        }
    }

    fn applied(mut payment: PaymentEntity, transition: &PaymentTransitionModel) -> PaymentEntity {
        payment.status = transition.target.to_string();
        payment.updated_at = transition.at;
        match transition.target {
            PaymentStatus::Confirmed => payment.confirmed_at = Some(transition.at),
            PaymentStatus::Rejected => payment.rejected_at = Some(transition.at),
            _ => {}
        }
        if let Some(metadata) = &transition.metadata {
            payment.metadata = metadata.clone();
        }
        payment
    }

    fn quiet_webhooks() -> MockWebhookDispatch {
        let mut webhooks = MockWebhookDispatch::new();
        webhooks.expect_dispatch().never();
        webhooks
    }

    fn usecase(repo: MockPaymentRepository, webhooks: MockWebhookDispatch) -> PaymentsUseCase {
        PaymentsUseCase::new(Arc::new(repo), Arc::new(webhooks), 24)
    }

    #[tokio::test]
    async fn create_produces_pending_payment_with_instructions_and_event() {
        let merchant = merchant();
        let merchant_id = merchant.id;

        let mut repo = MockPaymentRepository::new();
        repo.expect_insert()
            .times(1)
            .returning(|entity| Ok(PaymentInsertOutcome::Inserted(entity.into_entity())));

        let mut webhooks = MockWebhookDispatch::new();
        webhooks
            .expect_dispatch()
            .withf(move |id, event, payment| {
                *id == merchant_id
                    && *event == WebhookEvent::PaymentCreated
                    && payment.status == "pending"
            })
            .times(1)
            .return_const(());

        let created = usecase(repo, webhooks)
            .create(
                &merchant,
                serde_json::from_value(json!({ "amount": 100, "customer_phone": "0920000000" }))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(created.payment.status, "pending");
        assert_eq!(created.payment.amount, 100.0);
        assert_eq!(created.payment.currency, "SSP");
        assert!(is_reference_code(&created.payment.reference_code));
        assert_eq!(created.instructions.reference_code, created.payment.reference_code);
        assert_eq!(created.instructions.pay_to.as_deref(), Some("0921111111"));
    }

    #[tokio::test]
    async fn create_regenerates_reference_code_on_collision() {
        let merchant = merchant();
        let mut repo = MockPaymentRepository::new();
        let mut seen_codes: Vec<String> = Vec::new();
        repo.expect_insert().times(3).returning(move |entity| {
            seen_codes.push(entity.reference_code.clone());
            if seen_codes.len() < 3 {
                Ok(PaymentInsertOutcome::DuplicateReferenceCode)
            } else {
                Ok(PaymentInsertOutcome::Inserted(entity.into_entity()))
            }
        });
        let mut webhooks = MockWebhookDispatch::new();
        webhooks.expect_dispatch().times(1).return_const(());

        let created = usecase(repo, webhooks)
            .create(
                &merchant,
                serde_json::from_value(json!({ "amount": 5, "customer_phone": "0920000000" }))
                    .unwrap(),
            )
            .await;

        assert!(created.is_ok());
    }

    #[tokio::test]
    async fn create_gives_up_after_repeated_collisions() {
        let mut repo = MockPaymentRepository::new();
        repo.expect_insert()
            .times(MAX_REFERENCE_CODE_ATTEMPTS)
            .returning(|_| Ok(PaymentInsertOutcome::DuplicateReferenceCode));

        let result = usecase(repo, quiet_webhooks())
            .create(
                &merchant(),
                serde_json::from_value(json!({ "amount": 5, "customer_phone": "0920000000" }))
                    .unwrap(),
            )
            .await;

        assert!(matches!(result, Err(PaymentError::Internal(_))));
    }

    #[tokio::test]
    async fn create_rejects_duplicate_external_id_and_invalid_input() {
        let mut repo = MockPaymentRepository::new();
        repo.expect_insert()
            .times(1)
            .returning(|_| Ok(PaymentInsertOutcome::DuplicateExternalId));
        let usecase = usecase(repo, quiet_webhooks());

        let duplicate = usecase
            .create(
                &merchant(),
                serde_json::from_value(
                    json!({ "amount": 5, "customer_phone": "0920000000", "external_id": "o-1" }),
                )
                .unwrap(),
            )
            .await;
        assert!(matches!(duplicate, Err(PaymentError::Validation(_))));

        let invalid = usecase
            .create(
                &merchant(),
                serde_json::from_value(json!({ "amount": -1, "customer_phone": "0920000000" }))
                    .unwrap(),
            )
            .await;
        match invalid {
            Err(err) => {
                assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
                assert_eq!(err.to_string(), "amount must be greater than 0");
            }
            Ok(_) => panic!("negative amount accepted"),
        }
    }

    #[tokio::test]
    async fn confirm_twice_succeeds_then_reports_already_confirmed() {
        let merchant_id = Uuid::new_v4();
        let pending = payment(merchant_id, PaymentStatus::Pending);
        let payment_id = pending.id;
        let confirmed = applied(
            pending.clone(),
            &PaymentTransitionModel {
                merchant_id,
                payment_id,
                expected: vec![],
                target: PaymentStatus::Confirmed,
                at: Utc::now(),
                metadata: None,
            },
        );

        let mut repo = MockPaymentRepository::new();
        let mut reads = vec![confirmed.clone(), pending.clone()];
        repo.expect_find_by_id()
            .with(eq(merchant_id), eq(payment_id))
            .times(2)
            .returning(move |_, _| Ok(reads.pop()));
        let stored = pending.clone();
        repo.expect_transition_status()
            .withf(|t| t.expected == vec![PaymentStatus::Pending] && t.target == PaymentStatus::Confirmed)
            .times(1)
            .returning(move |t| Ok(Some(applied(stored.clone(), &t))));

        let mut webhooks = MockWebhookDispatch::new();
        webhooks
            .expect_dispatch()
            .withf(|_, event, _| *event == WebhookEvent::PaymentConfirmed)
            .times(1)
            .return_const(());

        let usecase = usecase(repo, webhooks);
        let token = payment_id.to_string();

        let first = usecase.confirm(merchant_id, &token).await.unwrap();
        assert_eq!(first.status, "confirmed");
        assert!(first.confirmed_at.is_some());

        let second = usecase.confirm(merchant_id, &token).await;
        assert!(matches!(second, Err(PaymentError::AlreadyConfirmed)));
    }

    #[tokio::test]
    async fn confirm_of_rejected_payment_is_an_invalid_transition() {
        let merchant_id = Uuid::new_v4();
        let rejected = payment(merchant_id, PaymentStatus::Rejected);

        let mut repo = MockPaymentRepository::new();
        repo.expect_find_by_id().returning(move |_, _| Ok(None));
        repo.expect_find_by_reference_code()
            .withf(|_, code| code == "PSD-ABCD2345")
            .returning(move |_, _| Ok(Some(rejected.clone())));
        repo.expect_transition_status().never();

        let result = usecase(repo, quiet_webhooks())
            .confirm(merchant_id, "PSD-ABCD2345")
            .await;

        match result {
            Err(err) => {
                assert_eq!(err.to_string(), "Cannot confirm a rejected payment");
                assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
            }
            Ok(_) => panic!("rejected payment was confirmed"),
        }
    }

    #[test]
    fn transition_rules_match_the_state_machine() {
        use PaymentAction::*;
        use PaymentStatus::*;

        assert!(check_transition(Confirm, Pending).is_ok());
        assert!(check_transition(Confirm, Matched).is_ok());
        assert!(check_transition(Reject, Pending).is_ok());
        assert!(check_transition(Reject, Matched).is_ok());

        let message = |action, status| check_transition(action, status).unwrap_err().to_string();
        assert_eq!(message(Confirm, Confirmed), "Payment is already confirmed");
        assert_eq!(message(Confirm, Rejected), "Cannot confirm a rejected payment");
        assert_eq!(message(Confirm, Expired), "Cannot confirm an expired payment");
        assert_eq!(message(Reject, Rejected), "Payment is already rejected");
        assert_eq!(message(Reject, Confirmed), "Cannot reject a confirmed payment");
        assert_eq!(message(Reject, Expired), "Cannot reject an expired payment");
    }

    #[tokio::test]
    async fn reject_stores_reason_in_metadata() {
        let merchant_id = Uuid::new_v4();
        let pending = payment(merchant_id, PaymentStatus::Matched);

        let mut repo = MockPaymentRepository::new();
        let found = pending.clone();
        repo.expect_find_by_reference_code()
            .returning(move |_, _| Ok(None));
        repo.expect_find_by_external_id()
            .withf(|_, external_id| external_id == "order-1")
            .returning(move |_, _| Ok(Some(found.clone())));
        repo.expect_transition_status()
            .withf(|t| {
                t.expected == vec![PaymentStatus::Matched]
                    && t.target == PaymentStatus::Rejected
                    && t.metadata
                        == Some(json!({ "order": 1, "rejection_reason": "no funds received" }))
            })
            .times(1)
            .returning(move |t| Ok(Some(applied(pending.clone(), &t))));

        let mut webhooks = MockWebhookDispatch::new();
        webhooks
            .expect_dispatch()
            .withf(|_, event, _| *event == WebhookEvent::PaymentRejected)
            .times(1)
            .return_const(());

        let rejected = usecase(repo, webhooks)
            .reject(
                merchant_id,
                "order-1",
                RejectPaymentModel {
                    reason: Some(" no funds received ".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(rejected.status, "rejected");
        assert!(rejected.rejected_at.is_some());
        assert!(rejected.confirmed_at.is_none());
    }

    #[tokio::test]
    async fn lost_race_is_resolved_against_the_fresh_state() {
        let merchant_id = Uuid::new_v4();
        let pending = payment(merchant_id, PaymentStatus::Pending);
        let mut rejected_elsewhere = pending.clone();
        rejected_elsewhere.status = PaymentStatus::Rejected.to_string();
        rejected_elsewhere.rejected_at = Some(Utc::now());

        let mut repo = MockPaymentRepository::new();
        let mut reads = vec![rejected_elsewhere, pending];
        repo.expect_find_by_id()
            .times(2)
            .returning(move |_, _| Ok(reads.pop()));
        repo.expect_transition_status()
            .times(1)
            .returning(|_| Ok(None));

        let payment_id = Uuid::new_v4().to_string();
        let result = usecase(repo, quiet_webhooks())
            .confirm(merchant_id, &payment_id)
            .await;

        assert!(matches!(result, Err(PaymentError::InvalidTransition(_))));
    }

    #[tokio::test]
    async fn overdue_payment_is_expired_on_read() {
        let merchant_id = Uuid::new_v4();
        let mut overdue = payment(merchant_id, PaymentStatus::Pending);
        overdue.expires_at = Utc::now() - Duration::minutes(1);

        let mut repo = MockPaymentRepository::new();
        let found = overdue.clone();
        repo.expect_find_by_id()
            .returning(move |_, _| Ok(Some(found.clone())));
        repo.expect_transition_status()
            .withf(|t| t.target == PaymentStatus::Expired && t.expected == vec![PaymentStatus::Pending])
            .times(1)
            .returning(move |t| Ok(Some(applied(overdue.clone(), &t))));

        let usecase = usecase(repo, quiet_webhooks());
        let token = Uuid::new_v4().to_string();

        let dto = usecase.get(merchant_id, &token).await.unwrap();
        assert_eq!(dto.status, "expired");
    }

    #[tokio::test]
    async fn lookups_stay_within_the_merchant() {
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let owned = payment(owner, PaymentStatus::Pending);
        let payment_id = owned.id;

        let mut repo = MockPaymentRepository::new();
        repo.expect_find_by_id()
            .returning(move |merchant_id, id| {
                Ok((merchant_id == owner && id == payment_id).then(|| owned.clone()))
            });
        repo.expect_find_by_reference_code()
            .returning(|_, _| Ok(None));
        repo.expect_find_by_external_id()
            .returning(|_, _| Ok(None));

        let usecase = usecase(repo, quiet_webhooks());
        let token = payment_id.to_string();

        assert!(usecase.get(owner, &token).await.is_ok());
        assert!(matches!(
            usecase.get(stranger, &token).await,
            Err(PaymentError::NotFound)
        ));
        assert!(matches!(
            usecase.confirm(stranger, &token).await,
            Err(PaymentError::NotFound)
        ));
    }

    #[tokio::test]
    async fn list_reports_pagination() {
        let merchant_id = Uuid::new_v4();
        let rows: Vec<PaymentEntity> = (0..10)
            .map(|_| payment(merchant_id, PaymentStatus::Confirmed))
            .collect();

        let mut repo = MockPaymentRepository::new();
        repo.expect_expire_overdue().times(1).returning(|_| Ok(0));
        repo.expect_list()
            .withf(move |id, filter| {
                *id == merchant_id
                    && filter.limit == 10
                    && filter.offset == 0
                    && filter.status == Some(PaymentStatus::Confirmed)
            })
            .times(1)
            .returning(move |_, _| {
                Ok(PaymentPage {
                    payments: rows.clone(),
                    total: 15,
                })
            });

        let list = usecase(repo, quiet_webhooks())
            .list(
                merchant_id,
                ListPaymentsQuery {
                    status: Some("confirmed".to_string()),
                    limit: Some(10),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(list.payments.len(), 10);
        assert_eq!(list.pagination.total, 15);
        assert!(list.pagination.has_more);
    }

    #[tokio::test]
    async fn list_expires_overdue_rows_before_reading() {
        let merchant_id = Uuid::new_v4();
        let mut seq = mockall::Sequence::new();
        let mut repo = MockPaymentRepository::new();
        repo.expect_expire_overdue()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(2));
        repo.expect_list()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| {
                Ok(PaymentPage {
                    payments: vec![],
                    total: 0,
                })
            });

        let list = usecase(repo, quiet_webhooks())
            .list(
                merchant_id,
                ListPaymentsQuery {
                    status: Some("pending".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(list.payments.is_empty());
    }

    #[tokio::test]
    async fn list_still_answers_when_the_expiry_update_fails() {
        let merchant_id = Uuid::new_v4();
        let mut repo = MockPaymentRepository::new();
        repo.expect_expire_overdue()
            .returning(|_| Err(anyhow!("lock timeout")));
        repo.expect_list().times(1).returning(|_, _| {
            Ok(PaymentPage {
                payments: vec![],
                total: 0,
            })
        });

        let result = usecase(repo, quiet_webhooks())
            .list(merchant_id, ListPaymentsQuery::default())
            .await;

        assert!(result.is_ok());
    }
}
