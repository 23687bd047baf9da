//! Storage error model.

use thiserror::Error;

use storefront_core::DomainError;

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure of a store operation.
///
/// Deterministic failures (missing rows, duplicate slugs, bad references) are
/// reported as [`DomainError`]s so callers can map them without caring which
/// backend produced them.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("database error in {operation}: {source}")]
    Database {
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn not_found(resource: &'static str) -> Self {
        Self::Domain(DomainError::not_found(resource))
    }

    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            Self::Domain(e) => Some(e),
            _ => None,
        }
    }
}

/// Map sqlx errors, turning constraint violations into domain errors.
///
/// | Postgres code | Meaning                  | Result                 |
/// |---------------|--------------------------|------------------------|
/// | `23505`       | unique violation         | `DomainError::Conflict`   |
/// | `23503`       | foreign key violation    | `DomainError::Validation` |
/// | `23514`       | check violation          | `DomainError::Validation` |
/// | `22003`       | numeric value out of range | `DomainError::Validation` |
pub(crate) fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        let msg = db_err.message().to_string();
        match db_err.code().as_deref() {
            Some("23505") => return DomainError::conflict(msg).into(),
            Some("23503") => {
                return DomainError::validation(format!("referenced record does not exist: {msg}")).into();
            }
            Some("23514") | Some("22003") => return DomainError::validation(msg).into(),
            _ => {}
        }
    }
    StoreError::Database { operation, source: err }
}
