use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Email already registered: {0}")]
    DuplicateEmail(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Authentication failed: {0}")]
    Authentication(String),
    #[error("Internal error: {0}")]
    Internal(String),
}
