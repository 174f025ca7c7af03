use crate::error::{Result, ToggleError};
use crate::events::{TargetSpec, WindowId, WindowInfo};
use crate::services::display::DisplayServer;
use crate::{debug_if_enabled, toggle_error};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Поиск целевого окна по заголовку или идентификатору
#[derive(Clone)]
pub struct WindowLocator {
    display: Arc<dyn DisplayServer>,
}

impl WindowLocator {
    pub fn new(display: Arc<dyn DisplayServer>) -> Self {
        Self { display }
    }

    /// `0x`-префикс - шестнадцатеричное число, иначе десятичное; диапазон u32
    pub fn parse_window_id(raw: &str) -> Result<WindowId> {
        let parsed = match raw.strip_prefix("0x") {
            Some(hex) => u32::from_str_radix(hex, 16),
            None => raw.parse::<u32>(),
        };
        parsed
            .map(WindowId)
            .map_err(|e| toggle_error!(invalid_format, "'{}': {}", raw, e))
    }

    /// Поиск в глубину (pre-order) от `root`: совпавший предок выигрывает у потомков
    pub fn find_by_title(&self, root: WindowId, title: &str) -> Result<WindowId> {
        let needle = title.to_lowercase();

        match self.search(root, &needle)? {
            Some(window) => {
                info!("Найдено окно с заголовком, содержащим '{}': {}", title, window);
                Ok(window)
            }
            None => {
                info!("Окно с заголовком, содержащим '{}', не найдено", title);
                ToggleError::not_found(format!("заголовок содержит '{}'", title))
            }
        }
    }

    fn search(&self, window: WindowId, needle: &str) -> Result<Option<WindowId>> {
        // Ошибка чтения имени не фатальна - считаем, что имени нет
        let name = self.display.window_name(window).unwrap_or_else(|e| {
            debug_if_enabled!("Не удалось прочитать имя окна {}: {}", window, e);
            None
        });

        if let Some(name) = name {
            if name.to_lowercase().contains(needle) {
                info!("Совпадение заголовка: {}", name);
                return Ok(Some(window));
            }
        }

        for child in self.display.children(window)? {
            match self.search(child, needle) {
                Ok(Some(found)) => return Ok(Some(found)),
                Ok(None) => {}
                Err(e) => {
                    debug_if_enabled!("Поддерево {} пропущено: {}", child, e);
                }
            }
        }

        Ok(None)
    }

    /// Разбор идентификатора и проверка, что окно существует (запрос атрибутов)
    pub fn find_by_id(&self, raw: &str) -> Result<WindowId> {
        let window = Self::parse_window_id(raw).map_err(|e| {
            debug!("Неверный формат идентификатора окна: {}", raw);
            e
        })?;

        if let Err(e) = self.display.is_mapped(window) {
            debug!("Не удалось получить атрибуты окна {}: {}", window, e);
            return ToggleError::not_found(format!("окно {}", window));
        }

        info!("Найдено окно с ID: {}", window);
        Ok(window)
    }

    /// Сначала как идентификатор, при любой ошибке - как подстрока заголовка
    pub fn locate(&self, identifier: &str) -> Result<WindowId> {
        match self.find_by_id(identifier) {
            Ok(window) => Ok(window),
            Err(e) => {
                debug!("Поиск по ID не удался ({}), пробуем по заголовку", e);
                self.find_by_title(self.display.root(), identifier)
            }
        }
    }

    pub fn resolve(&self, target: &TargetSpec) -> Result<WindowId> {
        match target {
            TargetSpec::Title(title) => self.find_by_title(self.display.root(), title),
            TargetSpec::Id(raw) => self.locate(raw),
        }
    }

    /// Прямые потомки `root` с непустым именем. Только для диагностики
    pub fn list_all(&self, root: WindowId) -> Vec<WindowInfo> {
        let children = match self.display.children(root) {
            Ok(children) => children,
            Err(e) => {
                warn!("Ошибка запроса дерева окон: {}", e);
                return Vec::new();
            }
        };

        children
            .into_iter()
            .filter_map(|child| match self.display.window_name(child) {
                Ok(Some(title)) => Some(WindowInfo::new(child, title)),
                _ => None,
            })
            .collect()
    }
}
