use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToggleError {
    #[error("Ошибка конфигурации: {0}")]
    Config(#[from] anyhow::Error),

    #[error("Ошибка ввода-вывода: {0}")]
    Io(#[from] std::io::Error),

    #[error("Не удалось подключиться к X-серверу: {0}")]
    Connection(String),

    #[error("Соединение с X-сервером уже закрыто")]
    ConnectionClosed,

    #[error("Окно не найдено: {0}")]
    NotFound(String),

    #[error("Неверный формат идентификатора окна: {0}")]
    InvalidFormat(String),

    #[error("Ошибка запроса к X-серверу: {0}")]
    Query(String),

    #[error("Неверная комбинация клавиш: {0}")]
    Parse(String),

    #[error("Клавиша '{0}' отсутствует в текущей раскладке")]
    KeyNotMapped(char),

    #[error("Не удалось захватить комбинацию клавиш: {0}")]
    Grab(String),

    #[error("Внутренняя ошибка: {0}")]
    Internal(String),
}

impl ToggleError {
    pub fn not_found<T>(msg: impl Into<String>) -> Result<T> {
        Err(ToggleError::NotFound(msg.into()))
    }
}

impl From<x11rb::errors::ConnectError> for ToggleError {
    fn from(e: x11rb::errors::ConnectError) -> Self {
        ToggleError::Connection(e.to_string())
    }
}

impl From<x11rb::errors::ConnectionError> for ToggleError {
    fn from(e: x11rb::errors::ConnectionError) -> Self {
        ToggleError::Query(e.to_string())
    }
}

impl From<x11rb::errors::ReplyError> for ToggleError {
    fn from(e: x11rb::errors::ReplyError) -> Self {
        ToggleError::Query(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ToggleError>;

// Удобные макросы для создания ошибок
#[macro_export]
macro_rules! toggle_error {
    (not_found, $($arg:tt)*) => {
        $crate::error::ToggleError::NotFound(format!($($arg)*))
    };
    (invalid_format, $($arg:tt)*) => {
        $crate::error::ToggleError::InvalidFormat(format!($($arg)*))
    };
    (query, $($arg:tt)*) => {
        $crate::error::ToggleError::Query(format!($($arg)*))
    };
    (parse, $($arg:tt)*) => {
        $crate::error::ToggleError::Parse(format!($($arg)*))
    };
    (grab, $($arg:tt)*) => {
        $crate::error::ToggleError::Grab(format!($($arg)*))
    };
    (internal, $($arg:tt)*) => {
        $crate::error::ToggleError::Internal(format!($($arg)*))
    };
}
