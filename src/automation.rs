//! Synthetic key presses for the trigger action.
//!
//! Fire-and-forget: the target application never confirms receipt, so a
//! failed press is logged and otherwise ignored.

use enigo::{Direction, Enigo, Key, Keyboard, Settings};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Keys the guard may press when the gauge runs low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerKey {
    #[default]
    Esc,
    F9,
}

impl TriggerKey {
    pub const ALL: [TriggerKey; 2] = [TriggerKey::Esc, TriggerKey::F9];

    pub fn to_enigo(self) -> Key {
        match self {
            TriggerKey::Esc => Key::Escape,
            TriggerKey::F9 => Key::F9,
        }
    }
}

impl fmt::Display for TriggerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TriggerKey::Esc => "Esc",
            TriggerKey::F9 => "F9",
        })
    }
}

/// Sends a single key press to the OS input stream.
pub trait ActionEmitter: Send {
    fn press_key(&mut self, key: TriggerKey);
}

/// [`ActionEmitter`] backed by enigo.
#[derive(Default)]
pub struct EnigoEmitter;

impl EnigoEmitter {
    pub fn new() -> Self {
        Self
    }
}

impl ActionEmitter for EnigoEmitter {
    fn press_key(&mut self, key: TriggerKey) {
        match Enigo::new(&Settings::default()) {
            Ok(mut enigo) => {
                if let Err(e) = enigo.key(key.to_enigo(), Direction::Click) {
                    log::warn!("KeyPress {}: {}", key, e);
                }
            }
            Err(e) => log::warn!("KeyPress {}: input context unavailable: {}", key, e),
        }
    }
}
