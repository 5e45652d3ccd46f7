use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CaptureError;

pub const RECORD_SHORTCUT: &str = "alt+shift+r";
pub const SCREENSHOT_SHORTCUT: &str = "alt+shift+s";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortcutAction {
    StartRecording,
    StartScreenshot,
}

impl ShortcutAction {
    /// Alt+Shift+R records, Alt+Shift+S screenshots. Other modifiers are not
    /// inspected.
    pub fn from_chord(chord: &KeyChord) -> Option<Self> {
        if !(chord.alt && chord.shift) {
            return None;
        }
        match chord.code.as_str() {
            "KeyR" => Some(ShortcutAction::StartRecording),
            "KeyS" => Some(ShortcutAction::StartScreenshot),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ShortcutAction::StartRecording => "start_recording",
            ShortcutAction::StartScreenshot => "start_screenshot",
        }
    }
}

pub fn default_bindings() -> [(&'static str, ShortcutAction); 2] {
    [
        (RECORD_SHORTCUT, ShortcutAction::StartRecording),
        (SCREENSHOT_SHORTCUT, ShortcutAction::StartScreenshot),
    ]
}

/// A key press with its modifiers. `code` uses physical key names ("KeyR").
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyChord {
    pub alt: bool,
    pub shift: bool,
    pub ctrl: bool,
    pub meta: bool,
    pub code: String,
}

impl FromStr for KeyChord {
    type Err = CaptureError;

    /// Parse combos such as `"alt+shift+r"`.
    fn from_str(combo: &str) -> Result<Self, Self::Err> {
        let mut chord = KeyChord::default();
        for part in combo.split('+').map(str::trim) {
            match part.to_ascii_lowercase().as_str() {
                "alt" | "option" => chord.alt = true,
                "shift" => chord.shift = true,
                "ctrl" | "control" => chord.ctrl = true,
                "super" | "cmd" | "meta" => chord.meta = true,
                key if key.len() == 1 && key.chars().all(|c| c.is_ascii_alphabetic()) => {
                    if !chord.code.is_empty() {
                        return Err(CaptureError::InvalidConfig(format!(
                            "Shortcut '{combo}' has more than one key"
                        )));
                    }
                    chord.code = format!("Key{}", key.to_ascii_uppercase());
                }
                _ => {
                    return Err(CaptureError::InvalidConfig(format!(
                        "Invalid shortcut '{combo}'"
                    )))
                }
            }
        }

        if chord.code.is_empty() {
            return Err(CaptureError::InvalidConfig(format!(
                "Shortcut '{combo}' has no key"
            )));
        }
        Ok(chord)
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let modifiers = [
            (self.ctrl, "ctrl"),
            (self.meta, "super"),
            (self.alt, "alt"),
            (self.shift, "shift"),
        ];
        for (_, name) in modifiers.iter().filter(|(on, _)| *on) {
            write!(f, "{name}+")?;
        }
        let key = self.code.strip_prefix("Key").unwrap_or(&self.code);
        write!(f, "{}", key.to_ascii_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_default_bindings() {
        for (combo, action) in default_bindings() {
            let chord: KeyChord = combo.parse().unwrap();
            assert!(chord.alt && chord.shift && !chord.ctrl && !chord.meta);
            assert_eq!(ShortcutAction::from_chord(&chord), Some(action));
            assert_eq!(chord.to_string(), combo);
        }
    }

    #[test]
    fn requires_alt_and_shift() {
        let chord: KeyChord = "shift+r".parse().unwrap();
        assert_eq!(ShortcutAction::from_chord(&chord), None);

        let chord: KeyChord = "alt+shift+x".parse().unwrap();
        assert_eq!(ShortcutAction::from_chord(&chord), None);
    }

    #[test]
    fn rejects_malformed_combos() {
        assert!("alt+shift".parse::<KeyChord>().is_err());
        assert!("alt+shift+r+s".parse::<KeyChord>().is_err());
        assert!("alt+f13".parse::<KeyChord>().is_err());
    }
}
