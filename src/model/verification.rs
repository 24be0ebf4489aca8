use serde::{Deserialize, Serialize};

use crate::{common::Params, model::Action};

/// Verification engine family.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash, strum::AsRefStr, strum::EnumString, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VerificationType {
    Image,
    #[default]
    Text,
    Adb,
    Web,
    Video,
    Audio,
    Appium,
}

/// A check confirming the device is in the expected state.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Verification {
    #[serde(default)]
    pub verification_type: VerificationType,
    pub command: String,
    #[serde(default)]
    pub params: Params,
    /// expected-result metadata, opaque to the core
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<serde_json::Value>,
}

impl Verification {
    pub fn new(
        verification_type: VerificationType,
        command: impl Into<String>,
    ) -> Self {
        Self {
            verification_type,
            command: command.into(),
            params: Params::new(),
            expected: None,
        }
    }

    pub fn with_param(
        mut self,
        key: &str,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.params.set(key, value);
        self
    }

    /// Builds the verification a verification-routed action stands for.
    ///
    /// `params.verification_type` wins; otherwise the family is read from the command name.
    pub fn from_action(action: &Action) -> Self {
        let verification_type = action
            .params
            .get_str("verification_type")
            .and_then(|t| t.parse::<VerificationType>().ok())
            .unwrap_or_else(|| infer_type(&action.command));

        Self {
            verification_type,
            command: action.command.clone(),
            params: action.params.clone(),
            expected: None,
        }
    }

    /// Short human-readable name, e.g. `text:waitForTextToAppear`.
    pub fn describe(&self) -> String {
        format!("{}:{}", self.verification_type, self.command)
    }
}

fn infer_type(command: &str) -> VerificationType {
    let lower = command.to_ascii_lowercase();
    if lower.contains("image") {
        VerificationType::Image
    } else if lower.contains("audio") {
        VerificationType::Audio
    } else if lower.contains("video") {
        VerificationType::Video
    } else if lower.contains("element") {
        VerificationType::Adb
    } else {
        VerificationType::Text
    }
}
