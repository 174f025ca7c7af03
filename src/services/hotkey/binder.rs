use crate::error::Result;
use crate::events::{Hotkey, Modifiers};
use crate::services::session::{BoundHotkey, Session};
use crate::toggle_error;
use std::sync::Arc;
use tracing::{debug, info};

use super::combo::parse_combo;
use super::keycode::resolve_key_code;

pub struct HotkeyBinder {
    session: Arc<Session>,
    ignored: Modifiers,
}

impl HotkeyBinder {
    /// `ignored` - модификаторы-защёлки, с которыми комбинация тоже должна срабатывать
    pub fn new(session: Arc<Session>, ignored: Modifiers) -> Self {
        Self { session, ignored }
    }

    /// Разобрать комбинацию, найти код клавиши и захватить её на корневом окне.
    ///
    /// Ошибка основного grab'а возвращается как `Grab`; дополнительные grab'ы
    /// с Caps/Num Lock только логируются.
    pub fn bind(&self, combo: &str) -> Result<Hotkey> {
        if let Some(bound) = self.session.hotkey() {
            return Err(toggle_error!(internal, "горячая клавиша уже привязана: {}", bound.combo));
        }

        let parsed = parse_combo(combo)?;
        let display = self.session.display();
        let mapping = display.keyboard_mapping()?;
        let key_code = resolve_key_code(&mapping, parsed.key)?;
        let hotkey = Hotkey::new(parsed.modifiers, key_code);
        let root = self.session.root();

        display.grab_key(root, hotkey.modifiers, key_code)?;

        for locks in self.ignored.subsets() {
            let variant = hotkey.modifiers | locks;
            if variant == hotkey.modifiers {
                continue;
            }
            match display.grab_key(root, variant, key_code) {
                Ok(()) => debug!("Захвачен вариант {} + {}", variant, key_code),
                Err(e) => debug!("Вариант {} + {} не захвачен: {}", variant, key_code, e),
            }
        }

        self.session.bind_hotkey(BoundHotkey {
            combo: combo.to_string(),
            hotkey,
        })?;

        info!("Горячая клавиша '{}' зарегистрирована ({})", combo, hotkey);
        Ok(hotkey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToggleError;
    use crate::events::{KeyCode, TargetSpec};
    use crate::services::display::{DisplayServer, DryRunDisplay, KeyboardMapping};

    fn fixture() -> (Arc<DryRunDisplay>, Arc<Session>) {
        let display = Arc::new(DryRunDisplay::new());
        let session = Arc::new(Session::new(display.clone(), TargetSpec::Title("notes".into())));
        (display, session)
    }

    #[test]
    fn test_bind_grabs_lock_variants() {
        let (display, session) = fixture();
        let binder = HotkeyBinder::new(session.clone(), Modifiers::LOCKS);

        let hotkey = binder.bind("ctrl+shift+a").unwrap();
        let mods = Modifiers::CONTROL | Modifiers::SHIFT;
        assert_eq!(hotkey, Hotkey::new(mods, KeyCode(38)));

        let grabs = display.grabs();
        assert_eq!(grabs.len(), 4);
        assert_eq!(grabs[0], (display.root(), mods, KeyCode(38)));
        assert!(grabs.contains(&(display.root(), mods | Modifiers::LOCK, KeyCode(38))));
        assert!(grabs.contains(&(display.root(), mods | Modifiers::LOCKS, KeyCode(38))));

        assert_eq!(session.hotkey().map(|b| b.combo.as_str()), Some("ctrl+shift+a"));
    }

    #[test]
    fn test_bind_follows_current_layout() {
        let (display, session) = fixture();

        // AZERTY: 'a' на коде 24, 'q' на коде 38
        let mut keysyms = vec![0u32; 248 * 2];
        for (code, letter) in [(24u8, 'a'), (38u8, 'q')] {
            let idx = (code as usize - 8) * 2;
            keysyms[idx] = letter as u32;
            keysyms[idx + 1] = letter.to_ascii_uppercase() as u32;
        }
        display.set_mapping(KeyboardMapping {
            min_keycode: 8,
            keysyms_per_keycode: 2,
            keysyms,
        });

        let binder = HotkeyBinder::new(session, Modifiers::NONE);
        assert_eq!(binder.bind("ctrl+a").unwrap().key_code, KeyCode(24));
        assert_eq!(display.grabs(), vec![(display.root(), Modifiers::CONTROL, KeyCode(24))]);
    }

    #[test]
    fn test_strict_bind_grabs_once() {
        let (display, session) = fixture();
        let binder = HotkeyBinder::new(session, Modifiers::NONE);

        binder.bind("super+z").unwrap();
        assert_eq!(display.grabs(), vec![(display.root(), Modifiers::MOD4, KeyCode(52))]);
    }

    #[test]
    fn test_claimed_combo_fails_without_binding() {
        let (display, session) = fixture();
        display.claim(Modifiers::MOD1, KeyCode(28));
        let binder = HotkeyBinder::new(session.clone(), Modifiers::LOCKS);

        assert!(matches!(binder.bind("alt+t"), Err(ToggleError::Grab(_))));
        assert!(session.hotkey().is_none());
        assert!(display.grabs().is_empty());
    }

    #[test]
    fn test_parse_error_is_reported() {
        let (_display, session) = fixture();
        let binder = HotkeyBinder::new(session.clone(), Modifiers::LOCKS);

        assert!(matches!(binder.bind("ctrl+f5"), Err(ToggleError::Parse(_))));
        assert!(session.hotkey().is_none());
    }

    #[test]
    fn test_second_bind_rejected() {
        let (display, session) = fixture();
        let binder = HotkeyBinder::new(session, Modifiers::NONE);

        binder.bind("ctrl+a").unwrap();
        assert!(binder.bind("ctrl+b").is_err());
        assert_eq!(display.grabs().len(), 1);
    }
}
