use crate::events::Modifiers;

/// Преобразование имён модификаторов в биты маски X11
/// Отвечает за трансляцию строковых имён из комбинации (`ctrl+shift+a`) в `Modifiers`
pub struct ModifierNames;

impl ModifierNames {
    /// Получить бит модификатора по его имени (имя уже должно быть в нижнем регистре)
    pub fn translate(name: &str) -> Option<Modifiers> {
        match name {
            "ctrl" => Some(Modifiers::CONTROL),
            "shift" => Some(Modifiers::SHIFT),
            "alt" => Some(Modifiers::MOD1),   // Mod1
            "super" => Some(Modifiers::MOD4), // Mod4
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_modifiers() {
        assert_eq!(ModifierNames::translate("ctrl"), Some(Modifiers::CONTROL));
        assert_eq!(ModifierNames::translate("shift"), Some(Modifiers::SHIFT));
        assert_eq!(ModifierNames::translate("alt"), Some(Modifiers::MOD1));
        assert_eq!(ModifierNames::translate("super"), Some(Modifiers::MOD4));
    }

    #[test]
    fn test_unknown_modifier() {
        assert_eq!(ModifierNames::translate("hyper"), None);
        assert_eq!(ModifierNames::translate("CTRL"), None);
    }
}
