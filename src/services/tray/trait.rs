use crate::error::Result;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Нажатие пункта меню трея
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayCommand {
    Toggle,
    Quit,
}

/// Содержимое иконки и меню на момент запуска
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrayMenu {
    pub title: String,
    pub tooltip: String,
    pub toggle_label: String,
    /// Неактивный пункт с привязанной комбинацией
    pub shortcut: Option<String>,
    pub icon_name: String,
}

/// Trait for the tray collaborator: the core only updates the tooltip and asks it to quit.
/// Clicks travel the other way, as `TrayCommand`s over a channel.
pub trait TrayUi: Send + Sync {
    fn set_tooltip(&self, tooltip: String);
    fn quit(&self);
}

/// Factory function to create the StatusNotifierItem tray
pub fn create_tray(
    menu: TrayMenu,
    commands: mpsc::UnboundedSender<TrayCommand>,
) -> Result<Arc<dyn TrayUi>> {
    Ok(Arc::new(super::ksni_tray::KsniTray::spawn(menu, commands)?))
}
