use std::sync::Arc;

use chrono::Utc;
use crates::domain::{
    entities::leads::{InsertContactMessageEntity, InsertSystemRequestEntity},
    repositories::leads::LeadRepository,
    value_objects::leads::{
        ContactFormModel, ContactMessageDto, LeadPageQuery, SystemRequestDto,
        SystemRequestFormModel,
    },
};
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use crate::usecases::payment_validation::is_valid_email;

const MAX_NAME_CHARS: usize = 120;
const MAX_SHORT_FIELD_CHARS: usize = 200;
const MAX_TEXT_CHARS: usize = 5000;

#[derive(Debug, Error)]
pub enum LeadError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl LeadError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            LeadError::Validation(_) => StatusCode::BAD_REQUEST,
            LeadError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, LeadError>;

pub struct LeadsUseCase {
    lead_repository: Arc<dyn LeadRepository + Send + Sync>,
}

impl LeadsUseCase {
    pub fn new(lead_repository: Arc<dyn LeadRepository + Send + Sync>) -> Self {
        Self { lead_repository }
    }

    pub async fn submit_contact(
        &self,
        form: ContactFormModel,
        client_ip: &str,
    ) -> UseCaseResult<Uuid> {
        let entity = InsertContactMessageEntity {
            name: required("name", form.name, MAX_NAME_CHARS)?,
            email: email(form.email)?,
            phone: optional("phone", form.phone, 30)?,
            subject: optional("subject", form.subject, MAX_SHORT_FIELD_CHARS)?,
            message: required("message", form.message, MAX_TEXT_CHARS)?,
            client_ip: client_ip.to_string(),
            created_at: Utc::now(),
        };

        let id = self
            .lead_repository
            .insert_contact_message(entity)
            .await
            .map_err(|err| {
                error!(db_error = ?err, "leads: failed to store contact message");
                LeadError::Internal(err)
            })?;

        info!(lead_id = %id, client_ip, "leads: contact message received");
        Ok(id)
    }

    pub async fn submit_system_request(
        &self,
        form: SystemRequestFormModel,
        client_ip: &str,
    ) -> UseCaseResult<Uuid> {
        let entity = InsertSystemRequestEntity {
            name: required("name", form.name, MAX_NAME_CHARS)?,
            email: email(form.email)?,
            phone: optional("phone", form.phone, 30)?,
            company: optional("company", form.company, MAX_SHORT_FIELD_CHARS)?,
            system_type: required("system_type", form.system_type, MAX_SHORT_FIELD_CHARS)?,
            budget: optional("budget", form.budget, MAX_SHORT_FIELD_CHARS)?,
            timeline: optional("timeline", form.timeline, MAX_SHORT_FIELD_CHARS)?,
            description: required("description", form.description, MAX_TEXT_CHARS)?,
            client_ip: client_ip.to_string(),
            created_at: Utc::now(),
        };

        let id = self
            .lead_repository
            .insert_system_request(entity)
            .await
            .map_err(|err| {
                error!(db_error = ?err, "leads: failed to store system request");
                LeadError::Internal(err)
            })?;

        info!(lead_id = %id, client_ip, "leads: system request received");
        Ok(id)
    }

    pub async fn list_contact_messages(
        &self,
        query: LeadPageQuery,
    ) -> UseCaseResult<Vec<ContactMessageDto>> {
        let messages = self
            .lead_repository
            .list_contact_messages(query.normalize())
            .await
            .map_err(|err| {
                error!(db_error = ?err, "leads: failed to list contact messages");
                LeadError::Internal(err)
            })?;
        Ok(messages.into_iter().map(ContactMessageDto::from).collect())
    }

    pub async fn list_system_requests(
        &self,
        query: LeadPageQuery,
    ) -> UseCaseResult<Vec<SystemRequestDto>> {
        let requests = self
            .lead_repository
            .list_system_requests(query.normalize())
            .await
            .map_err(|err| {
                error!(db_error = ?err, "leads: failed to list system requests");
                LeadError::Internal(err)
            })?;
        Ok(requests.into_iter().map(SystemRequestDto::from).collect())
    }
}

fn required(field: &str, value: Option<String>, max_chars: usize) -> UseCaseResult<String> {
    optional(field, value, max_chars)?
        .ok_or_else(|| LeadError::Validation(format!("{field} is required")))
}

fn optional(field: &str, value: Option<String>, max_chars: usize) -> UseCaseResult<Option<String>> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    if value
        .as_deref()
        .is_some_and(|v| v.chars().count() > max_chars)
    {
        return Err(LeadError::Validation(format!(
            "{field} must be at most {max_chars} characters"
        )));
    }
    Ok(value)
}

fn email(value: Option<String>) -> UseCaseResult<String> {
    let email = required("email", value, MAX_SHORT_FIELD_CHARS)?;
    if !is_valid_email(&email) {
        return Err(LeadError::Validation(
            "email is not a valid email address".to_string(),
        ));
    }
    Ok(email)
}
