use crate::error::{Result, ToggleError};
use crate::events::KeyCode;
use crate::services::display::KeyboardMapping;

/// Найти код клавиши для латинской буквы.
///
/// Коды просматриваются по возрастанию; у каждого сравниваются первые два keysym'а
/// (без Shift и с Shift) с буквой и её парой в другом регистре. При дублях в раскладке
/// выигрывает наименьший код.
pub fn resolve_key_code(mapping: &KeyboardMapping, key: char) -> Result<KeyCode> {
    let per_code = mapping.keysyms_per_keycode as usize;
    if per_code == 0 {
        return Err(ToggleError::KeyNotMapped(key));
    }

    // Для Latin-1 keysym совпадает с кодом символа
    let target = key as u32;
    let flipped = (if key.is_ascii_lowercase() {
        key.to_ascii_uppercase()
    } else {
        key.to_ascii_lowercase()
    }) as u32;

    for (offset, keysyms) in mapping.keysyms.chunks(per_code).enumerate() {
        let code = mapping.min_keycode as usize + offset;
        if code > u8::MAX as usize {
            break;
        }
        if keysyms.iter().take(2).any(|&sym| sym == target || sym == flipped) {
            return Ok(KeyCode(code as u8));
        }
    }

    Err(ToggleError::KeyNotMapped(key))
}
