use thiserror::Error;
use tracing::error;

use crate::store::StoreError;
use crate::validation::ValidationErrors;

/// Failures surfaced to the presentation layer.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Field-keyed report; nothing was persisted.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("username '{0}' is already taken")]
    Conflict(String),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UsernameTaken(username) => ServiceError::Conflict(username),
            StoreError::MissingOwner(_) => ServiceError::NotFound("user"),
            StoreError::NotFound { entity, .. } => ServiceError::NotFound(entity),
            StoreError::Database(e) => {
                error!(error = %e, "store failure");
                ServiceError::Internal(e.into())
            }
        }
    }
}
