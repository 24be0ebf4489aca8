//! Devices under test and the interfaces used to drive them.
//!
//! A [`Device`] bundles the capability channels registered for it (at most one per
//! [`ActionType`]) and an optional verification backend. [`classify`] decides which
//! channel runs a command; [`DeviceLocks`] guarantees a single controller per device.

mod channel;
mod lock;
mod routing;
#[cfg(test)]
pub(crate) mod testing;
mod verification;

use std::{collections::BTreeMap, sync::Arc};

use crate::model::ActionType;

pub use channel::{CapabilityChannel, ChannelOutput};
pub use lock::{DeviceLease, DeviceLocks};
pub use routing::{classify, is_desktop_command, is_power_command, is_verification_command, is_web_command};
pub use verification::{VerificationBackend, VerificationOutput};

/// device id
pub type DeviceId = String;

/// A controllable device and its registered channels.
#[derive(Clone)]
pub struct Device {
    id: DeviceId,
    name: String,
    channels: BTreeMap<ActionType, Arc<dyn CapabilityChannel>>,
    verifier: Option<Arc<dyn VerificationBackend>>,
}

impl Device {
    pub fn new(id: impl Into<DeviceId>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            channels: BTreeMap::new(),
            verifier: None,
        }
    }

    pub fn with_name(
        mut self,
        name: impl Into<String>,
    ) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a channel under its own kind, replacing any previous one.
    pub fn with_channel(
        mut self,
        channel: Arc<dyn CapabilityChannel>,
    ) -> Self {
        self.channels.insert(channel.kind(), channel);
        self
    }

    pub fn with_verifier(
        mut self,
        verifier: Arc<dyn VerificationBackend>,
    ) -> Self {
        self.verifier = Some(verifier);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn channel(
        &self,
        kind: ActionType,
    ) -> Option<Arc<dyn CapabilityChannel>> {
        self.channels.get(&kind).cloned()
    }

    /// Registered channel kinds in a stable order.
    pub fn kinds(&self) -> Vec<ActionType> {
        self.channels.keys().copied().collect()
    }

    pub fn verifier(&self) -> Option<Arc<dyn VerificationBackend>> {
        self.verifier.clone()
    }
}

impl std::fmt::Debug for Device {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Device").field("id", &self.id).field("name", &self.name).field("channels", &self.kinds()).field("verifier", &self.verifier.is_some()).finish()
    }
}
