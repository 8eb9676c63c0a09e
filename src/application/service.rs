use crate::config::CredentialPolicy;
use crate::domain::error::RegistryError;
use crate::domain::principal::{
    LoginRequest, LoginResponse, Principal, RegistrationRequest, RegistrationResponse, Role,
};
use crate::domain::repository::PrincipalRepository;
use crate::infrastructure::security::CredentialHasher;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, trace, warn};

/// Registration, listing and login for one role's registry.
pub struct PrincipalService<R: PrincipalRepository> {
    role: Role,
    repository: Arc<R>,
    hasher: CredentialHasher,
    policy: CredentialPolicy,
}

impl<R: PrincipalRepository> PrincipalService<R> {
    pub fn new(role: Role, repository: Arc<R>) -> Self {
        Self {
            role,
            repository,
            hasher: CredentialHasher::default(),
            policy: CredentialPolicy::default(),
        }
    }

    pub fn with_hasher(mut self, hasher: CredentialHasher) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn with_policy(mut self, policy: CredentialPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn role(&self) -> Role {
        self.role
    }

    #[instrument(skip_all, fields(role = %self.role, email = %req.email))]
    pub async fn register(&self, req: RegistrationRequest) -> Result<RegistrationResponse> {
        trace!("Starting registration");

        let strict = self.policy == CredentialPolicy::Strict;
        if strict {
            validate_registration(&req)?;
        }

        let password_hash = self.hash_password(req.password.clone()).await?;
        let email = req.email.clone();
        let principal = Principal::new(self.role, req, password_hash);
        debug!(principal_id = %principal.id, "Saving principal to repository");

        let principal = if strict {
            self.repository
                .save_if_email_absent(principal)
                .await?
                .ok_or_else(|| {
                    warn!("Email already registered");
                    RegistryError::DuplicateEmail(email)
                })?
        } else {
            self.repository.save(principal).await?
        };

        info!(
            principal_id = %principal.id,
            email = %principal.email,
            "Principal registered"
        );

        Ok(RegistrationResponse {
            message: self.role.registered_message().to_string(),
        })
    }

    #[instrument(skip(self), fields(role = %self.role))]
    pub async fn get_all(&self) -> Result<Vec<RegistrationResponse>> {
        let principals = self.repository.find_all().await?;
        debug!(count = principals.len(), "Listing principals");
        Ok(principals
            .iter()
            .map(|p| RegistrationResponse {
                message: self.role.listing_message(&p.firstname),
            })
            .collect())
    }

    #[instrument(skip_all, fields(role = %self.role, email = %req.email))]
    pub async fn login(&self, req: LoginRequest) -> Result<LoginResponse> {
        if self.policy == CredentialPolicy::Strict {
            self.verify_credentials(&req).await?;
        } else {
            trace!("Permissive policy, credentials not checked");
        }

        info!("Login successful");
        Ok(LoginResponse {
            message: self.role.login_message().to_string(),
        })
    }

    async fn verify_credentials(&self, req: &LoginRequest) -> Result<()> {
        if req.email.trim().is_empty() || req.password.is_empty() {
            return Err(
                RegistryError::Validation("email and password are required".to_string()).into(),
            );
        }

        let principal = self
            .repository
            .find_by_email(&req.email)
            .await?
            .ok_or_else(|| {
                warn!(email = %req.email, "Unknown email during login");
                RegistryError::Authentication("Invalid email or password".to_string())
            })?;

        let hasher = self.hasher.clone();
        let password = req.password.clone();
        let hash = principal.password_hash.clone();
        let is_valid = tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| RegistryError::Internal(format!("Password check aborted: {}", e)))?
            .map_err(|e| {
                error!(error = %e, "Failed to verify password");
                RegistryError::Internal(format!("Failed to verify password: {}", e))
            })?;

        if !is_valid {
            warn!(principal_id = %principal.id, "Invalid password during login");
            return Err(
                RegistryError::Authentication("Invalid email or password".to_string()).into(),
            );
        }
        Ok(())
    }

    // Argon2 is CPU-bound; keep it off the async workers.
    async fn hash_password(&self, password: String) -> Result<String> {
        let hasher = self.hasher.clone();
        let hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| RegistryError::Internal(format!("Password hashing aborted: {}", e)))?
            .map_err(|e| {
                error!(error = %e, "Failed to hash password");
                RegistryError::Internal(format!("Failed to hash password: {}", e))
            })?;
        Ok(hash)
    }
}

fn validate_registration(req: &RegistrationRequest) -> Result<(), RegistryError> {
    if req.email.trim().is_empty() {
        return Err(RegistryError::Validation("email must not be empty".to_string()));
    }
    if req.password.is_empty() {
        return Err(RegistryError::Validation("password must not be empty".to_string()));
    }
    Ok(())
}
