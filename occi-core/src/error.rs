//! Error types surfaced to the OCCI protocol layer.

use std::time::Duration;

use occi_nova::NovaError;
use thiserror::Error;

use crate::category::CategoryId;

/// Errors returned by the registry, the dispatcher and the backends.
#[derive(Error, Debug)]
pub enum OcciError {
    /// Malformed request: unsupported attribute, wrong template count,
    /// several mixin changes at once, mixin applied to the wrong kind.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Entity, or the collaborator resource behind it, does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Action is not in the entity's current set of legal actions.
    #[error("Action {action} is not currently applicable to {entity}")]
    ActionNotApplicable {
        /// Requested action
        action: CategoryId,
        /// Entity identifier
        entity: String,
    },

    /// Collaborator reports a state incompatible with the transition.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Collaborator-side limits hit; the caller may retry later.
    #[error("Quota exceeded: {message}")]
    QuotaExceeded {
        /// Explanation for the caller
        message: String,
        /// Suggested wait before retrying
        retry_after: Duration,
    },

    /// Any other collaborator failure.
    #[error("Upstream service failure: {0}")]
    Upstream(String),

    /// No backend or category is registered under this identity.
    #[error("Category not registered: {0}")]
    NotRegistered(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl OcciError {
    /// HTTP status code the protocol layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            OcciError::BadRequest(_) => 400,
            OcciError::NotFound(_) => 404,
            OcciError::ActionNotApplicable { .. } => 400,
            OcciError::Conflict(_) => 409,
            OcciError::QuotaExceeded { .. } => 413,
            OcciError::Upstream(_) => 500,
            OcciError::NotRegistered(_) => 500,
            OcciError::Internal(_) => 500,
        }
    }

    /// Retry hint for quota failures.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            OcciError::QuotaExceeded { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }

    pub(crate) fn not_applicable(action: &CategoryId, entity: &str) -> Self {
        OcciError::ActionNotApplicable {
            action: action.clone(),
            entity: entity.to_string(),
        }
    }
}

/// Message shown to the caller for a quota code.
pub fn quota_message(code: &str, message: &str) -> String {
    match code {
        "OnsetFileLimitExceeded" => "Personality file limit exceeded".to_string(),
        "OnsetFilePathLimitExceeded" => "Personality file path too long".to_string(),
        "OnsetFileContentLimitExceeded" => "Personality file content too long".to_string(),
        _ => message.to_string(),
    }
}

impl From<NovaError> for OcciError {
    fn from(err: NovaError) -> Self {
        match err {
            NovaError::InstanceNotFound(id) => OcciError::NotFound(format!("instance {}", id)),
            NovaError::FlavorNotFound(_)
            | NovaError::ImageNotFound(_)
            | NovaError::KeypairNotFound(_)
            | NovaError::SecurityGroupNotFound(_)
            | NovaError::FlavorMemoryTooSmall(_)
            | NovaError::FlavorDiskTooSmall(_)
            | NovaError::CannotResizeToSameSize(_) => OcciError::BadRequest(err.to_string()),
            NovaError::InstanceInvalidState(msg) => OcciError::Conflict(msg),
            NovaError::QuotaExceeded { code, message, retry_after_secs } => OcciError::QuotaExceeded {
                message: quota_message(&code, &message),
                retry_after: Duration::from_secs(retry_after_secs.unwrap_or(0)),
            },
            NovaError::Remote { .. }
            | NovaError::ConnectionFailed(_)
            | NovaError::Internal(_) => OcciError::Upstream(err.to_string()),
        }
    }
}

/// Result type alias for OCCI operations.
pub type Result<T> = std::result::Result<T, OcciError>;
