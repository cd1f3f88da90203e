//! Service layer: permission checks, validation and composition of
//! repository calls for each domain area.
//!
//! Every public operation takes the shared connection and the caller's
//! `Session`, checks the permission table first, validates input against
//! existing rows, then performs the write.

pub mod accounts;
pub mod clinical;
pub mod facilities;
pub mod meetings;
pub mod patients;
pub mod staff;
mod lookup;
mod validation;

pub use validation::*;

use thiserror::Error;

use crate::authorization::AuthorizationError;
use crate::crypto::CryptoError;
use crate::db::DatabaseError;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0}")]
    Authorization(#[from] AuthorizationError),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Account is disabled")]
    AccountDisabled,

    #[error("{0}")]
    Validation(String),

    #[error("A {entity} with {field} '{value}' already exists")]
    Duplicate {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Referenced {entity} with id {id} does not exist")]
    MissingReference { entity: &'static str, id: i64 },

    #[error("Cannot delete {entity} {id}: still referenced by {referenced_by}")]
    InUse {
        entity: &'static str,
        id: i64,
        referenced_by: &'static str,
    },

    #[error("{entity} with id {id} not found")]
    NotFound { entity: String, id: String },

    #[error("Scheduling conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(DatabaseError),

    #[error("Password error: {0}")]
    Crypto(#[from] CryptoError),
}

impl From<DatabaseError> for ServiceError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { entity_type, id } => Self::NotFound {
                entity: entity_type,
                id,
            },
            other => Self::Database(other),
        }
    }
}

impl From<rusqlite::Error> for ServiceError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(DatabaseError::Sqlite(err))
    }
}

impl ServiceError {
    pub(crate) fn not_found(entity: &str, id: i64) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support;
