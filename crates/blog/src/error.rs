//! Service-layer errors shared by the account, taxonomy and post services.

use thiserror::Error;
use validator::ValidationErrors;

use crate::auth::AuthError;

/// Errors returned by service operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(vec![msg.into()])
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Map a persistence failure to `Conflict` when a unique constraint was hit.
    pub fn from_write(err: anyhow::Error, conflict_msg: impl Into<String>) -> Self {
        if is_unique_violation(&err) {
            Self::Conflict(conflict_msg.into())
        } else {
            Self::Internal(err)
        }
    }
}

/// Reject non-positive identifiers before touching storage.
pub fn ensure_id(id: i64, what: &str) -> ServiceResult<()> {
    if id <= 0 {
        return Err(ServiceError::InvalidArgument(format!(
            "{what} id must be positive, got {id}"
        )));
    }
    Ok(())
}

/// Check whether any cause in the chain is a SQLite unique constraint violation.
pub fn is_unique_violation(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<sqlx::Error>(),
            Some(sqlx::Error::Database(db_err)) if db_err.is_unique_violation()
        )
    })
}

impl From<ValidationErrors> for ServiceError {
    fn from(errors: ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(msg) => format!("{field}: {msg}"),
                    None => format!("{field}: invalid ({})", e.code),
                })
            })
            .collect();
        messages.sort();
        Self::Validation(messages)
    }
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidInput(msg) => Self::validation(msg),
            AuthError::InvalidCredentials => Self::InvalidCredentials,
            other => Self::Internal(anyhow::Error::new(other)),
        }
    }
}
