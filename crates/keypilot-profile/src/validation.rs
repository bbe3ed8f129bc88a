//! Action token validation
//!
//! Advisory only: an invalid token is still uploadable, the device tool has
//! the final word. The lists mirror the key names `ch57x-keyboard-tool`
//! accepts.

use crate::KeyMapping;

pub const VALID_KEYS: &[&str] = &[
    "a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l", "m", "n", "o", "p", "q", "r",
    "s", "t", "u", "v", "w", "x", "y", "z", "1", "2", "3", "4", "5", "6", "7", "8", "9", "0",
    "enter", "escape", "backspace", "tab", "space", "minus", "equal", "leftbracket",
    "rightbracket", "backslash", "semicolon", "quote", "grave", "comma", "dot", "slash",
    "capslock", "printscreen", "insert", "home", "pageup", "delete", "end", "pagedown", "right",
    "left", "down", "up", "numlock", "numpadslash", "numpadasterisk", "numpadminus",
    "numpadplus", "numpadenter", "numpad0", "numpad1", "numpad2", "numpad3", "numpad4",
    "numpad5", "numpad6", "numpad7", "numpad8", "numpad9", "numpaddot", "application", "power",
    "f1", "f2", "f3", "f4", "f5", "f6", "f7", "f8", "f9", "f10", "f11", "f12", "f13", "f14",
    "f15", "f16", "f17", "f18", "f19", "f20", "f21", "f22", "f23", "f24", "macbrightnessdown",
    "macbrightnessup",
];

/// Media keys; these cannot be combined with modifiers.
pub const VALID_MEDIA_KEYS: &[&str] = &[
    "next",
    "previous",
    "prev",
    "stop",
    "play",
    "mute",
    "volumeup",
    "volumedown",
    "favorites",
    "calculator",
    "screenlock",
];

pub const VALID_MODIFIERS: &[&str] = &[
    "ctrl", "shift", "alt", "opt", "win", "cmd", "rctrl", "rshift", "ralt", "ropt", "rwin",
    "rcmd",
];

const MOUSE_ACTION_PREFIXES: &[&str] = &["click", "move", "drag", "wheel"];

/// Check a single action token.
///
/// Accepts media keys, mouse actions (`click(...)`, `move(...)`, ...), raw key
/// codes (`<110>`) and plain keys with optional `-`-joined modifiers
/// (`cmd-shift-b`). Empty input is not a valid action.
pub fn is_valid_action(token: &str) -> bool {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return false;
    }

    if VALID_MEDIA_KEYS.contains(&trimmed) {
        return true;
    }

    if MOUSE_ACTION_PREFIXES
        .iter()
        .any(|prefix| trimmed.starts_with(prefix))
    {
        return true;
    }

    if trimmed.starts_with('<') && trimmed.ends_with('>') {
        return true;
    }

    let mut parts = trimmed.split('-').collect::<Vec<_>>();
    let Some(key) = parts.pop() else {
        return false;
    };

    VALID_KEYS.contains(&key) && parts.iter().all(|m| VALID_MODIFIERS.contains(m))
}

impl KeyMapping {
    /// Names of the assigned fields whose token fails [`is_valid_action`].
    ///
    /// Empty fields are unassigned and never reported.
    pub fn invalid_fields(&self) -> Vec<&'static str> {
        self.fields()
            .into_iter()
            .filter(|(_, value)| !value.is_empty() && !is_valid_action(value))
            .map(|(name, _)| name)
            .collect()
    }
}
