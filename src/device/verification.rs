use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Result, model::Verification};

/// Evaluates node verifications (image, text, element, audio/video checks) on a device.
#[async_trait]
pub trait VerificationBackend: Send + Sync {
    /// Evaluates one verification against the current device state.
    ///
    /// An `Err` means the backend could not evaluate at all; callers treat it as a failed check.
    async fn evaluate(
        &self,
        verification: &Verification,
    ) -> Result<VerificationOutput>;
}

/// Outcome of one verification evaluation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VerificationOutput {
    pub success: bool,
    pub message: Option<String>,
    /// backend specific evidence (matched text, similarity score, ...)
    pub details: Value,
}

impl VerificationOutput {
    pub fn passed() -> Self {
        Self {
            success: true,
            message: None,
            details: Value::Null,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            details: Value::Null,
        }
    }

    pub fn with_details(
        mut self,
        details: Value,
    ) -> Self {
        self.details = details;
        self
    }
}
