use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::events::Modifiers;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub hotkey: HotkeyConfig,
    pub tray: TrayConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct HotkeyConfig {
    /// Комбинация по умолчанию, если не передан `--key`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub combo: Option<String>,
    /// Строгое сравнение модификаторов (Caps/Num Lock ломают распознавание)
    pub strict_modifiers: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TrayConfig {
    pub icon_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Default for TrayConfig {
    fn default() -> Self {
        Self {
            icon_name: "preferences-system-windows".to_string(),
        }
    }
}

impl HotkeyConfig {
    /// Модификаторы, которые вычёркиваются перед сравнением с событием
    pub fn ignored_modifiers(&self) -> Modifiers {
        if self.strict_modifiers {
            Modifiers::NONE
        } else {
            Modifiers::LOCKS
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();

        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("WINTOGGLE_").split("__"));

        let config: Config = figment
            .extract()
            .with_context(|| format!("Не удалось загрузить конфигурацию из {:?}", config_path))?;

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        // Валидация настроек логирования
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Неверный уровень логирования: {}", self.logging.level),
        }

        match self.logging.format.as_str() {
            "pretty" | "compact" => {}
            _ => anyhow::bail!("Неверный формат логирования: {}", self.logging.format),
        }

        if let Some(combo) = &self.hotkey.combo {
            if combo.trim().is_empty() {
                anyhow::bail!("hotkey.combo не может быть пустой строкой");
            }
        }

        if self.tray.icon_name.trim().is_empty() {
            anyhow::bail!("tray.icon_name не может быть пустым");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_default_config_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.hotkey.ignored_modifiers(), Modifiers::LOCKS);
    }

    #[test]
    fn test_invalid_level_rejected() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_strict_modifiers_ignore_nothing() {
        let mut config = Config::default();
        config.hotkey.strict_modifiers = true;
        assert_eq!(config.hotkey.ignored_modifiers(), Modifiers::NONE);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        Jail::expect_with(|_jail| {
            let config = Config::load("does-not-exist.toml").map_err(|e| e.to_string())?;
            assert_eq!(config.logging.level, "info");
            assert!(config.hotkey.combo.is_none());
            Ok(())
        });
    }

    #[test]
    fn test_file_and_env_layering() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "wintoggle.toml",
                r#"
                [logging]
                level = "debug"

                [hotkey]
                combo = "ctrl+alt+t"
                "#,
            )?;
            jail.set_env("WINTOGGLE_HOTKEY__STRICT_MODIFIERS", "true");

            let config = Config::load("wintoggle.toml").map_err(|e| e.to_string())?;
            assert_eq!(config.logging.level, "debug");
            assert_eq!(config.logging.format, "pretty");
            assert_eq!(config.hotkey.combo.as_deref(), Some("ctrl+alt+t"));
            assert!(config.hotkey.strict_modifiers);
            Ok(())
        });
    }
}
