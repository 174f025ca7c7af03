pub mod keyboard;
pub mod window;

pub use keyboard::{Hotkey, KeyCode, KeyCombo, Modifiers};
pub use window::{TargetSpec, WindowId, WindowInfo};

/// События протокола, которые интересны циклу обработки
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayEvent {
    KeyPress {
        key_code: KeyCode,
        state: Modifiers,
    },
    /// Любое другое событие - игнорируется
    Other,
}

impl DisplayEvent {
    pub fn key_press(key_code: KeyCode, state: Modifiers) -> Self {
        Self::KeyPress { key_code, state }
    }
}
