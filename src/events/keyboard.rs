use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, Not};

/// Код клавиши X11 (физическая позиция, 8..=255)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyCode(pub u8);

impl KeyCode {
    pub fn value(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "keycode {}", self.0)
    }
}

/// Маска модификаторов в битовом представлении X11 (SETofKEYMASK)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Modifiers(pub u16);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0);
    pub const SHIFT: Modifiers = Modifiers(1 << 0);
    pub const LOCK: Modifiers = Modifiers(1 << 1);
    pub const CONTROL: Modifiers = Modifiers(1 << 2);
    /// Обычно Alt
    pub const MOD1: Modifiers = Modifiers(1 << 3);
    /// Обычно NumLock
    pub const MOD2: Modifiers = Modifiers(1 << 4);
    /// Обычно Super
    pub const MOD4: Modifiers = Modifiers(1 << 6);

    /// Модификаторы-"защёлки", которые не должны влиять на распознавание комбинации
    pub const LOCKS: Modifiers = Modifiers(Self::LOCK.0 | Self::MOD2.0);

    pub fn bits(&self) -> u16 {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn contains(&self, other: Modifiers) -> bool {
        self.0 & other.0 == other.0
    }

    /// Все подмножества маски, включая пустое. Используется для дополнительных grab'ов
    pub fn subsets(&self) -> Vec<Modifiers> {
        let mut result = vec![Modifiers::NONE];
        for bit in 0..16 {
            let flag = 1u16 << bit;
            if self.0 & flag == 0 {
                continue;
            }
            let extended: Vec<Modifiers> = result.iter().map(|m| Modifiers(m.0 | flag)).collect();
            result.extend(extended);
        }
        result
    }

    pub fn to_vec(&self) -> Vec<&'static str> {
        let mut result = Vec::new();
        if self.contains(Self::CONTROL) { result.push("ctrl"); }
        if self.contains(Self::SHIFT) { result.push("shift"); }
        if self.contains(Self::MOD1) { result.push("alt"); }
        if self.contains(Self::MOD4) { result.push("super"); }
        if self.contains(Self::LOCK) { result.push("lock"); }
        if self.contains(Self::MOD2) { result.push("mod2"); }
        result
    }
}

impl BitOr for Modifiers {
    type Output = Modifiers;

    fn bitor(self, rhs: Self) -> Self::Output {
        Modifiers(self.0 | rhs.0)
    }
}

impl BitOrAssign for Modifiers {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Modifiers {
    type Output = Modifiers;

    fn bitand(self, rhs: Self) -> Self::Output {
        Modifiers(self.0 & rhs.0)
    }
}

impl Not for Modifiers {
    type Output = Modifiers;

    fn not(self) -> Self::Output {
        Modifiers(!self.0)
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", self.to_vec().join("+"))
        }
    }
}

/// Результат разбора строки вида `ctrl+shift+a`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyCombo {
    pub modifiers: Modifiers,
    pub key: char,
}

/// Комбинация, привязанная к конкретному коду клавиши
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hotkey {
    pub modifiers: Modifiers,
    pub key_code: KeyCode,
}

impl Hotkey {
    pub fn new(modifiers: Modifiers, key_code: KeyCode) -> Self {
        Self { modifiers, key_code }
    }

    /// Сравнение с состоянием из события KeyPress.
    ///
    /// Биты из `ignored` (Caps/Num Lock) вычёркиваются с обеих сторон перед сравнением;
    /// с пустой `ignored` сравнение строгое.
    pub fn matches(&self, key_code: KeyCode, state: Modifiers, ignored: Modifiers) -> bool {
        key_code == self.key_code && (state & !ignored) == (self.modifiers & !ignored)
    }
}

impl fmt::Display for Hotkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.modifiers, self.key_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifiers_display() {
        assert_eq!((Modifiers::CONTROL | Modifiers::SHIFT).to_string(), "ctrl+shift");
        assert_eq!(Modifiers::NONE.to_string(), "none");
    }

    #[test]
    fn test_subsets_of_locks() {
        let subsets = Modifiers::LOCKS.subsets();
        assert_eq!(subsets.len(), 4);
        assert!(subsets.contains(&Modifiers::NONE));
        assert!(subsets.contains(&Modifiers::LOCK));
        assert!(subsets.contains(&Modifiers::MOD2));
        assert!(subsets.contains(&(Modifiers::LOCK | Modifiers::MOD2)));
    }

    #[test]
    fn test_hotkey_matches_ignoring_locks() {
        let hotkey = Hotkey::new(Modifiers::CONTROL | Modifiers::SHIFT, KeyCode(38));
        let caps_on = Modifiers::CONTROL | Modifiers::SHIFT | Modifiers::LOCK;

        assert!(hotkey.matches(KeyCode(38), caps_on, Modifiers::LOCKS));
        assert!(!hotkey.matches(KeyCode(38), caps_on, Modifiers::NONE));
        assert!(!hotkey.matches(KeyCode(38), Modifiers::CONTROL, Modifiers::LOCKS));
        assert!(!hotkey.matches(KeyCode(39), Modifiers::CONTROL | Modifiers::SHIFT, Modifiers::LOCKS));
    }

    #[test]
    fn test_hotkey_strict_match_requires_exact_state() {
        let hotkey = Hotkey::new(Modifiers::MOD4, KeyCode(52));
        assert!(hotkey.matches(KeyCode(52), Modifiers::MOD4, Modifiers::NONE));
        assert!(!hotkey.matches(KeyCode(52), Modifiers::MOD4 | Modifiers::MOD2, Modifiers::NONE));
    }
}
