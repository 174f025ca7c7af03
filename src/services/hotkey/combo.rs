use crate::error::Result;
use crate::events::{KeyCombo, Modifiers};
use crate::mappings::ModifierNames;
use crate::toggle_error;
use smallvec::SmallVec;
use tracing::warn;

/// Разбор строки вида `ctrl+shift+a`.
///
/// Последний токен - ровно одна буква a-z (строка предварительно приводится к нижнему
/// регистру), остальные - имена модификаторов. Неизвестные модификаторы пропускаются
/// с предупреждением, комбинация при этом считается корректной.
pub fn parse_combo(combo: &str) -> Result<KeyCombo> {
    let lowered = combo.to_lowercase();
    let parts: SmallVec<[&str; 4]> = lowered.split('+').map(str::trim).collect();

    let Some((key_name, modifier_names)) = parts.split_last() else {
        return Err(toggle_error!(parse, "пустая комбинация"));
    };

    let mut chars = key_name.chars();
    let key = match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_lowercase() => c,
        _ => {
            return Err(toggle_error!(
                parse,
                "неподдерживаемая клавиша '{}', поддерживаются только a-z",
                key_name
            ))
        }
    };

    let mut modifiers = Modifiers::NONE;
    for name in modifier_names {
        match ModifierNames::translate(name) {
            Some(modifier) => modifiers |= modifier,
            None => warn!("Неизвестный модификатор '{}' пропущен", name),
        }
    }

    Ok(KeyCombo { modifiers, key })
}
