use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Result, common::Params, model::ActionType};

/// Driver for one way of controlling a device (remote keys, browser, desktop, power).
///
/// Adapters (ADB, IR, CEC, web automation, ...) live outside the core and are
/// registered on a [`Device`](crate::Device) per kind.
#[async_trait]
pub trait CapabilityChannel: Send + Sync {
    /// Returns the kind of actions this channel executes.
    fn kind(&self) -> ActionType;

    /// Declares whether the channel understands `command`.
    ///
    /// Used by routing only; no device call may happen here.
    fn supports(
        &self,
        command: &str,
    ) -> bool;

    /// Executes one command on the device.
    ///
    /// # Arguments
    ///
    /// * `command` - The command name, e.g. `press_key`.
    /// * `params` - The [`Params`] of the command.
    ///
    /// # Returns
    ///
    /// Returns a [`ChannelOutput`] telling whether the device accepted the command.
    /// An `Err` means the channel itself broke; it is recorded as a failed attempt.
    async fn invoke(
        &self,
        command: &str,
        params: &Params,
    ) -> Result<ChannelOutput>;

    /// Captures the current screen, returning an opaque reference (path, URL or data).
    async fn screenshot(&self) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Output returned by a channel's invoke method
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChannelOutput {
    /// whether the command succeeded
    pub success: bool,
    /// human-readable detail
    pub message: Option<String>,
    /// channel specific payload
    pub output: Value,
}

impl ChannelOutput {
    /// Create a successful output
    pub fn success() -> Self {
        Self {
            success: true,
            message: None,
            output: Value::Null,
        }
    }

    /// Create a failed output
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            output: Value::Null,
        }
    }

    pub fn with_message(
        mut self,
        message: impl Into<String>,
    ) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_output(
        mut self,
        output: Value,
    ) -> Self {
        self.output = output;
        self
    }
}
