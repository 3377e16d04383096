//! Storage error taxonomy and its status rendering.

use crate::apis::info::GroupResource;
use crate::db::DbError;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug)]
pub enum StorageError {
    /// The name is absent from the authoritative store.
    NotFound {
        resource: GroupResource,
        name: String,
    },
    /// Concurrent modification or duplicate create detected by a backend.
    Conflict {
        resource: GroupResource,
        name: String,
        message: String,
    },
    /// The request object or its scope is not acceptable.
    Invalid(String),
    /// Storage could not be constructed; fatal for the resource.
    Configuration(String),
    /// A caller handed the wrong object kind to a typed contract.
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    /// Objects present in the generic store but absent from the legacy store.
    Corrupted {
        resource: GroupResource,
        names: Vec<String>,
    },
    Cancelled,
    DeadlineExceeded,
    Backend(Box<dyn Error + Send + Sync>),
    Internal(String),
}

impl StorageError {
    pub fn not_found(resource: GroupResource, name: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            name: name.into(),
        }
    }

    pub fn conflict(
        resource: GroupResource,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Conflict {
            resource,
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn backend(err: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        Self::Backend(err.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Cancellation-class errors must propagate instead of being absorbed.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }

    /// Renders the error as a status object for API consumers.
    pub fn status(&self) -> Status {
        let (code, reason) = match self {
            Self::NotFound { .. } => (404, "NotFound"),
            Self::Conflict { .. } => (409, "Conflict"),
            Self::Invalid(_) => (400, "BadRequest"),
            Self::Cancelled => (499, "Cancelled"),
            Self::DeadlineExceeded => (504, "Timeout"),
            Self::Configuration(_)
            | Self::TypeMismatch { .. }
            | Self::Corrupted { .. }
            | Self::Backend(_)
            | Self::Internal(_) => (500, "InternalError"),
        };
        Status {
            status: "Failure".to_string(),
            code,
            reason: reason.to_string(),
            message: self.to_string(),
        }
    }
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { resource, name } => write!(f, "{resource} \"{name}\" not found"),
            Self::Conflict {
                resource,
                name,
                message,
            } => write!(f, "conflict on {resource} \"{name}\": {message}"),
            Self::Invalid(message) => write!(f, "invalid request: {message}"),
            Self::Configuration(message) => write!(f, "storage configuration error: {message}"),
            Self::TypeMismatch { expected, found } => {
                write!(f, "expected {expected} object, got {found}")
            }
            Self::Corrupted { resource, names } => write!(
                f,
                "{resource} present in generic store but missing from legacy store: {}",
                names.join(", ")
            ),
            Self::Cancelled => write!(f, "request cancelled"),
            Self::DeadlineExceeded => write!(f, "request deadline exceeded"),
            Self::Backend(err) => write!(f, "storage backend error: {err}"),
            Self::Internal(message) => write!(f, "internal storage error: {message}"),
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Backend(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<DbError> for StorageError {
    fn from(value: DbError) -> Self {
        Self::backend(value)
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(value: rusqlite::Error) -> Self {
        Self::backend(DbError::Sqlite(value))
    }
}

/// Failure status returned to API consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub status: String,
    pub code: u16,
    pub reason: String,
    pub message: String,
}
