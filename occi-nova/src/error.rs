//! Error types reported by the compute, network and image services.

use thiserror::Error;

/// Errors that can occur when calling into a Nova service.
#[derive(Error, Debug)]
pub enum NovaError {
    /// Failed to reach the service.
    #[error("Failed to connect to service: {0}")]
    ConnectionFailed(String),

    /// Instance was not found.
    #[error("Instance not found: {0}")]
    InstanceNotFound(String),

    /// Flavor (instance type) was not found.
    #[error("Flavor not found: {0}")]
    FlavorNotFound(String),

    /// Image was not found.
    #[error("Image not found: {0}")]
    ImageNotFound(String),

    /// Key pair was not found.
    #[error("Keypair not found: {0}")]
    KeypairNotFound(String),

    /// Security group was not found.
    #[error("Security group not found: {0}")]
    SecurityGroupNotFound(String),

    /// Instance is in an invalid state for the requested operation.
    #[error("Instance is in an invalid state for operation: {0}")]
    InstanceInvalidState(String),

    /// A project quota was exceeded.
    #[error("Quota exceeded ({code}): {message}")]
    QuotaExceeded {
        /// Quota code, e.g. `InstanceLimitExceeded`
        code: String,
        /// Message generated by the quota engine
        message: String,
        /// Suggested wait before retrying, in seconds
        retry_after_secs: Option<u64>,
    },

    /// Flavor memory is smaller than the image requires.
    #[error("Flavor memory is too small for requested image: {0}")]
    FlavorMemoryTooSmall(String),

    /// Flavor disk is smaller than the image requires.
    #[error("Flavor disk is too small for requested image: {0}")]
    FlavorDiskTooSmall(String),

    /// Resize was requested to the flavor the instance already has.
    #[error("Cannot resize to the same flavor: {0}")]
    CannotResizeToSameSize(String),

    /// The remote service raised an error over RPC.
    #[error("{exc_type}: {value}")]
    Remote {
        /// Remote exception type
        exc_type: String,
        /// Remote exception message
        value: String,
    },

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Nova service calls.
pub type Result<T> = std::result::Result<T, NovaError>;
