//! Error types for Navflow.
//!
//! All errors in Navflow are represented by the `NavflowError` enum. Variants that
//! describe a navigation or execution outcome map onto an [`ErrorKind`], which is what
//! step and transition reports carry.

use std::string::FromUtf8Error;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for all Navflow operations.
#[derive(Deserialize, Serialize, Error, Debug, Clone, PartialEq)]
pub enum NavflowError {
    /// A referenced tree, node or edge is absent.
    #[error("graph inconsistency: {0}")]
    GraphInconsistency(String),

    /// The target cannot be reached from the current position.
    #[error("no path found from '{from}' to '{to}'")]
    NoPathFound {
        from: String,
        to: String,
    },

    /// A main action did not succeed and escalation was exhausted.
    #[error("action failed: {0}")]
    ActionFailed(String),

    /// A destination verification did not pass.
    #[error("verification failed: {0}")]
    VerificationFailed(String),

    /// Device control is held by another owner.
    #[error("device {device_id} is busy (held by {owner})")]
    DeviceBusy {
        device_id: String,
        owner: String,
    },

    /// The plan generator did not answer before the deadline (milliseconds).
    #[error("plan generation timed out after {0}ms")]
    PlanGenerationTimeout(u64),

    /// The plan generator failed or returned an unusable plan.
    #[error("plan generation failed: {0}")]
    PlanGenerationFailed(String),

    /// The run was cancelled by its caller.
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// A registry lookup (tree, device, run) found nothing.
    #[error("{0} not found")]
    NotFound(String),

    /// Engine-level errors (startup, shutdown, runtime).
    #[error("{0}")]
    Engine(String),

    /// Configuration parsing or validation errors.
    #[error("{0}")]
    Config(String),

    /// Data conversion errors (JSON, TOML).
    #[error("{0}")]
    Convert(String),

    /// Storage operation errors.
    #[error("{0}")]
    Store(String),

    /// Runtime execution errors.
    #[error("{0}")]
    Runtime(String),

    /// I/O operation errors.
    #[error("{0}")]
    IoError(String),

    /// Message queue errors.
    #[error("{0}")]
    Queue(String),
}

/// Proximate error kind reported for a failed step or transition.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr, strum::EnumString, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    GraphInconsistency,
    NoPathFound,
    ActionFailed,
    VerificationFailed,
    DeviceBusy,
    PlanGenerationTimeout,
    PlanGenerationFailed,
    Cancelled,
    Internal,
}

impl NavflowError {
    /// Maps this error onto the kind recorded in execution reports.
    pub fn kind(&self) -> ErrorKind {
        match self {
            NavflowError::GraphInconsistency(_) => ErrorKind::GraphInconsistency,
            NavflowError::NoPathFound {
                ..
            } => ErrorKind::NoPathFound,
            NavflowError::ActionFailed(_) => ErrorKind::ActionFailed,
            NavflowError::VerificationFailed(_) => ErrorKind::VerificationFailed,
            NavflowError::DeviceBusy {
                ..
            } => ErrorKind::DeviceBusy,
            NavflowError::PlanGenerationTimeout(_) => ErrorKind::PlanGenerationTimeout,
            NavflowError::PlanGenerationFailed(_) => ErrorKind::PlanGenerationFailed,
            NavflowError::Cancelled(_) => ErrorKind::Cancelled,
            _ => ErrorKind::Internal,
        }
    }
}

impl From<NavflowError> for String {
    fn from(val: NavflowError) -> Self {
        val.to_string()
    }
}

impl From<std::io::Error> for NavflowError {
    fn from(error: std::io::Error) -> Self {
        NavflowError::IoError(error.to_string())
    }
}

impl From<NavflowError> for std::io::Error {
    fn from(val: NavflowError) -> Self {
        std::io::Error::other(val.to_string())
    }
}

impl From<FromUtf8Error> for NavflowError {
    fn from(_: FromUtf8Error) -> Self {
        NavflowError::Runtime("Error with utf-8 string convert".to_string())
    }
}

impl From<serde_json::Error> for NavflowError {
    fn from(error: serde_json::Error) -> Self {
        NavflowError::Convert(error.to_string())
    }
}

impl From<toml::de::Error> for NavflowError {
    fn from(error: toml::de::Error) -> Self {
        NavflowError::Config(error.to_string())
    }
}
