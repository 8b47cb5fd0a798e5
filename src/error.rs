//! Error handling module for archstrap
//!
//! Provides centralized error handling with proper error types using thiserror.
//! Every failure in a provisioning run is terminal: nothing is retried, the
//! error is logged and the process exits with code 1.

use thiserror::Error;

/// Main error type for archstrap
#[derive(Error, Debug)]
pub enum InstallerError {
    /// IO errors (file operations, process spawning, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON deserialization errors (lsblk output)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Partition file is blank
    #[error("no data in partitions file")]
    EmptyPlan,

    /// Partition file could not be parsed into a plan
    #[error("malformed partitions file: {0}")]
    MalformedPlan(String),

    /// A partition entry is missing a required key
    #[error("partition entry {index} is missing required field '{field}'")]
    MissingField { index: usize, field: &'static str },

    /// Fewer than two partitions in the plan (/ and /boot are the minimum)
    #[error("at least two (2) partitions are required (/ and /boot), found {0}")]
    InsufficientPartitions(usize),

    /// Other validation errors (bad device path, bad field values)
    #[error("validation error: {0}")]
    Validation(String),

    /// Device preconditions not met (media type, firmware/boot-role mismatch)
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// Operator declined the destructive-action confirmation
    #[error("aborted by operator")]
    Aborted,

    /// lsblk returned no device for the given path
    #[error("no block device data returned for {0}")]
    DeviceNotFound(String),

    /// lsblk returned more than one device for a single path
    #[error("expected exactly one device for {device}, got {count}")]
    AmbiguousDevice { device: String, count: usize },

    /// Device inspection did not complete within the bounded interval
    #[error("inspection of {device} timed out after {seconds}s")]
    InspectionTimeout { device: String, seconds: u64 },

    /// A wrapped external command exited non-zero
    #[error("`{command}` exited with code {code}: {stderr}")]
    ExternalTool {
        command: String,
        code: i32,
        stderr: String,
    },

    /// A tool succeeded but the kernel's resulting view contradicts the plan
    #[error("state inconsistency: {0}")]
    StateInconsistency(String),
}

/// Result type alias for archstrap operations
pub type Result<T> = std::result::Result<T, InstallerError>;

// Convenient error constructors
impl InstallerError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a precondition error
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    /// Create a malformed-plan error
    pub fn malformed_plan(msg: impl Into<String>) -> Self {
        Self::MalformedPlan(msg.into())
    }

    /// Create a state-inconsistency error
    pub fn state_inconsistency(msg: impl Into<String>) -> Self {
        Self::StateInconsistency(msg.into())
    }
}
