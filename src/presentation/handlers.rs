use crate::application::service::PrincipalService;
use crate::data::memory::InMemoryPrincipalRepository;
use crate::domain::error::RegistryError;
use crate::domain::principal::{LoginRequest, RegistrationRequest};
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError, web};
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

/// The service each route scope is wired to; users and admins each get one.
pub type RegistryService = PrincipalService<InMemoryPrincipalRepository>;

// Uniform error response format
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    details: serde_json::Value,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn message(&self) -> &str {
        match self {
            ApiError::Validation(msg)
            | ApiError::Conflict(msg)
            | ApiError::NotFound(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Internal(msg) => msg,
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let error_msg = self.to_string();

        if status.is_server_error() {
            error!(error = %error_msg, status = %status, "Request failed");
        } else {
            warn!(error = %error_msg, status = %status, "Request rejected");
        }

        HttpResponse::build(status).json(ErrorResponse {
            error: error_msg,
            details: serde_json::json!({ "message": self.message() }),
        })
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<RegistryError>() {
            Some(RegistryError::Validation(msg)) => ApiError::Validation(msg.clone()),
            Some(RegistryError::DuplicateEmail(email)) => {
                ApiError::Conflict(format!("Email already registered: {}", email))
            }
            Some(RegistryError::NotFound(msg)) => ApiError::NotFound(msg.clone()),
            Some(RegistryError::Authentication(msg)) => ApiError::Unauthorized(msg.clone()),
            Some(RegistryError::Internal(msg)) => ApiError::Internal(msg.clone()),
            None => ApiError::Internal(err.to_string()),
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    timestamp: String,
}

#[instrument]
pub async fn health_check() -> HttpResponse {
    info!("Health check requested");
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

#[instrument(skip_all, fields(role = %service.role()))]
pub async fn register(
    service: web::Data<RegistryService>,
    req: web::Json<RegistrationRequest>,
) -> Result<HttpResponse, ApiError> {
    info!(email = %req.email, "Registration request received");
    let response = service.register(req.into_inner()).await.map_err(|e| {
        error!(error = %e, "Failed to register");
        ApiError::from(e)
    })?;
    Ok(HttpResponse::Ok().json(response))
}

#[instrument(skip_all, fields(role = %service.role()))]
pub async fn login(
    service: web::Data<RegistryService>,
    req: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    info!(email = %req.email, "Login request received");
    let response = service.login(req.into_inner()).await.map_err(|e| {
        warn!(error = %e, "Login failed");
        ApiError::from(e)
    })?;
    Ok(HttpResponse::Ok().json(response))
}

#[instrument(skip_all, fields(role = %service.role()))]
pub async fn list(service: web::Data<RegistryService>) -> Result<HttpResponse, ApiError> {
    let responses = service.get_all().await.map_err(|e| {
        error!(error = %e, "Failed to list principals");
        ApiError::from(e)
    })?;
    info!(count = responses.len(), "Principals listed");
    Ok(HttpResponse::Ok().json(responses))
}
