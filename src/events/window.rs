use serde::{Deserialize, Serialize};
use std::fmt;

/// Идентификатор окна X11
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowId(pub u32);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// Информация об окне для диагностического списка
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowInfo {
    pub id: WindowId,
    pub title: String,
}

impl WindowInfo {
    pub fn new(id: WindowId, title: String) -> Self {
        Self { id, title }
    }
}

impl fmt::Display for WindowInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ID: {}, Title: {}", self.id, self.title)
    }
}

/// Как пользователь указал целевое окно
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSpec {
    /// Подстрока заголовка (без учёта регистра)
    Title(String),
    /// Десятичный или `0x`-шестнадцатеричный идентификатор
    Id(String),
}

impl TargetSpec {
    pub fn raw(&self) -> &str {
        match self {
            TargetSpec::Title(s) | TargetSpec::Id(s) => s,
        }
    }
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetSpec::Title(title) => write!(f, "'{}'", title),
            TargetSpec::Id(id) => write!(f, "id {}", id),
        }
    }
}
