//! Capability routing: which channel kind executes a command.

use crate::{device::Device, model::ActionType};

const WEB_COMMANDS: &[&str] = &[
    "open_browser",
    "close_browser",
    "connect_browser",
    "navigate_to_url",
    "click_element",
    "click_element_by_id",
    "find_element",
    "hover_element",
    "input_text",
    "fill_input",
    "execute_javascript",
    "get_page_info",
    "dump_elements",
    "browser_use_task",
];

const DESKTOP_COMMANDS: &[&str] = &[
    "execute_bash_command",
    "execute_pyautogui_click",
    "execute_pyautogui_rightclick",
    "execute_pyautogui_doubleclick",
    "execute_pyautogui_move",
    "execute_pyautogui_keypress",
    "execute_pyautogui_type",
    "execute_pyautogui_scroll",
    "execute_pyautogui_locate",
    "execute_pyautogui_locate_and_click",
    "execute_pyautogui_launch",
];

const VERIFICATION_COMMANDS: &[&str] = &[
    "waitForImageToAppear",
    "waitForImageToDisappear",
    "waitForTextToAppear",
    "waitForTextToDisappear",
    "waitForElementToAppear",
    "waitForElementToDisappear",
    "checkElementExists",
    "waitForVideoToAppear",
    "waitForVideoToDisappear",
    "detectMotion",
    "detectAudioSpeech",
    "getMenuInfo",
];

const POWER_COMMANDS: &[&str] = &["power_on", "power_off", "power_cycle", "reboot"];

/// Channel priority when a command is on no allow-list.
const PROBE_ORDER: [ActionType; 3] = [ActionType::Web, ActionType::Desktop, ActionType::Remote];

pub fn is_web_command(command: &str) -> bool {
    WEB_COMMANDS.contains(&command)
}

pub fn is_desktop_command(command: &str) -> bool {
    DESKTOP_COMMANDS.contains(&command)
}

/// Whether `command` is a known verification command.
pub fn is_verification_command(command: &str) -> bool {
    VERIFICATION_COMMANDS.contains(&command)
}

pub fn is_power_command(command: &str) -> bool {
    POWER_COMMANDS.contains(&command)
}

/// Decides which kind of channel executes `command`.
///
/// An explicit `hint` wins, then the fixed allow-lists, then the first registered
/// channel (web, desktop, remote) declaring support. Anything else goes to the remote
/// channel. Only `supports` declarations are consulted.
pub fn classify(
    command: &str,
    hint: Option<ActionType>,
    device: &Device,
) -> ActionType {
    if let Some(kind) = hint {
        return kind;
    }

    if is_verification_command(command) {
        return ActionType::Verification;
    }
    if is_web_command(command) {
        return ActionType::Web;
    }
    if is_desktop_command(command) {
        return ActionType::Desktop;
    }
    if is_power_command(command) {
        return ActionType::Power;
    }

    PROBE_ORDER.into_iter().find(|kind| device.channel(*kind).is_some_and(|channel| channel.supports(command))).unwrap_or(ActionType::Remote)
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use async_trait::async_trait;

    use crate::{
        Result,
        common::Params,
        device::{CapabilityChannel, ChannelOutput, Device},
        model::ActionType,
    };

    use super::classify;

    struct Declared {
        kind: ActionType,
        commands: &'static [&'static str],
    }

    #[async_trait]
    impl CapabilityChannel for Declared {
        fn kind(&self) -> ActionType {
            self.kind
        }

        fn supports(
            &self,
            command: &str,
        ) -> bool {
            self.commands.contains(&command)
        }

        async fn invoke(
            &self,
            _command: &str,
            _params: &Params,
        ) -> Result<ChannelOutput> {
            panic!("routing must not call the device")
        }
    }

    #[test]
    fn test_classify_precedence() {
        let device = Device::new("stb-1")
            .with_channel(Arc::new(Declared {
                kind: ActionType::Remote,
                commands: &["press_key", "tap"],
            }))
            .with_channel(Arc::new(Declared {
                kind: ActionType::Web,
                commands: &["tap", "scroll"],
            }));

        assert_eq!(classify("press_key", Some(ActionType::Desktop), &device), ActionType::Desktop);
        assert_eq!(classify("waitForTextToAppear", None, &device), ActionType::Verification);
        assert_eq!(classify("navigate_to_url", None, &device), ActionType::Web);
        assert_eq!(classify("execute_pyautogui_click", None, &device), ActionType::Desktop);
        assert_eq!(classify("reboot", None, &device), ActionType::Power);

        // web is probed before remote
        assert_eq!(classify("tap", None, &device), ActionType::Web);
        assert_eq!(classify("press_key", None, &device), ActionType::Remote);
        assert_eq!(classify("launch_app", None, &device), ActionType::Remote);
    }
}
