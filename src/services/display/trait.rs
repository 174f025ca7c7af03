use crate::error::Result;
use crate::events::{DisplayEvent, KeyCode, Modifiers, WindowId};
use std::sync::Arc;

/// Таблица keysym'ов раскладки: `keysyms_per_keycode` значений на каждый код,
/// начиная с `min_keycode`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyboardMapping {
    pub min_keycode: u8,
    pub keysyms_per_keycode: u8,
    pub keysyms: Vec<u32>,
}

/// Trait over the display-server connection.
///
/// Every request except `event_source` is synchronous: replies are awaited inline,
/// map/unmap/grab are sent and flushed. After `close` every call fails with
/// `ToggleError::ConnectionClosed`.
pub trait DisplayServer: Send + Sync {
    /// Корневое окно экрана по умолчанию
    fn root(&self) -> WindowId;

    /// Заголовок окна; `Ok(None)`, если свойство не задано или пустое
    fn window_name(&self, window: WindowId) -> Result<Option<String>>;

    /// Дочерние окна в порядке, который вернул сервер
    fn children(&self, window: WindowId) -> Result<Vec<WindowId>>;

    /// Запрос атрибутов: `true`, если map state отличен от Unmapped
    fn is_mapped(&self, window: WindowId) -> Result<bool>;

    fn set_mapped(&self, window: WindowId, mapped: bool) -> Result<()>;

    fn keyboard_mapping(&self) -> Result<KeyboardMapping>;

    /// Эксклюзивный асинхронный grab комбинации на окне
    fn grab_key(&self, window: WindowId, modifiers: Modifiers, key_code: KeyCode) -> Result<()>;

    /// Источник событий для цикла обработки. Создаётся один раз
    fn event_source(self: Arc<Self>) -> Result<Box<dyn EventSource>>;

    /// Закрыть соединение. Возвращает `false`, если оно уже было закрыто
    fn close(&self) -> bool;
}

/// Источник событий протокола
#[async_trait::async_trait]
pub trait EventSource: Send {
    /// Дождаться следующего события. Ожидание можно прервать, уронив future
    async fn next_event(&mut self) -> Result<DisplayEvent>;
}

/// Factory function to create an appropriate display connection based on the dry_run flag
pub fn create_display(dry_run: bool) -> Result<Arc<dyn DisplayServer>> {
    if dry_run {
        Ok(Arc::new(super::DryRunDisplay::with_demo_windows()))
    } else {
        Ok(Arc::new(super::x11::X11Display::connect()?))
    }
}
