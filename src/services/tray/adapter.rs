use crate::services::session::Session;
use crate::services::VisibilityController;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use super::r#trait::{TrayCommand, TrayMenu, TrayUi};

/// Почему цикл трея завершился
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayExit {
    /// Пользователь выбрал Quit (или трей пропал)
    Quit,
    /// Завершение начато с другой стороны (сигнал ОС)
    Cancelled,
}

/// Что разбудило цикл трея
enum Wake {
    Cancelled,
    VisibilityChanged,
    Command(Option<TrayCommand>),
}

pub struct TrayAdapter {
    session: Arc<Session>,
    visibility: Arc<VisibilityController>,
    tray: Arc<dyn TrayUi>,
    // Подсказка обновляется после любого переключения: из меню и по горячей клавише
    changes: watch::Receiver<bool>,
}

impl TrayAdapter {
    /// `changes` - подписка из `VisibilityController::subscribe`, взятая до запуска
    /// цикла событий, чтобы не пропустить ранние переключения
    pub fn new(
        session: Arc<Session>,
        visibility: Arc<VisibilityController>,
        tray: Arc<dyn TrayUi>,
        changes: watch::Receiver<bool>,
    ) -> Self {
        Self {
            session,
            visibility,
            tray,
            changes,
        }
    }

    /// Начальное содержимое трея для текущей сессии
    pub fn menu(session: &Session, icon_name: &str) -> TrayMenu {
        let description = session.describe_target();
        TrayMenu {
            title: description.clone(),
            tooltip: format!("Toggle visibility of {}", description),
            toggle_label: format!("Toggle {}", description),
            shortcut: session.hotkey().map(|bound| bound.combo.clone()),
            icon_name: icon_name.to_string(),
        }
    }

    pub async fn run(&mut self, mut commands: mpsc::UnboundedReceiver<TrayCommand>) -> TrayExit {
        let cancel = self.session.cancel_token().clone();
        info!("Трей: ожидаем команды для {}", self.session.describe_target());

        loop {
            let wake = tokio::select! {
                biased;
                _ = cancel.cancelled() => Wake::Cancelled,
                Ok(()) = self.changes.changed() => Wake::VisibilityChanged,
                command = commands.recv() => Wake::Command(command),
            };

            match wake {
                Wake::Cancelled => {
                    info!("Трей: получен сигнал завершения");
                    return TrayExit::Cancelled;
                }
                Wake::VisibilityChanged => self.update_tooltip(),
                Wake::Command(Some(TrayCommand::Toggle)) => {
                    let outcome = self.visibility.toggle();
                    debug!("Переключение из меню: {}", outcome);
                }
                Wake::Command(Some(TrayCommand::Quit)) => {
                    info!("Выход по команде из меню");
                    return TrayExit::Quit;
                }
                Wake::Command(None) => {
                    warn!("Канал команд трея закрыт");
                    return TrayExit::Quit;
                }
            }
        }
    }

    fn update_tooltip(&mut self) {
        let visible = *self.changes.borrow_and_update();
        let description = self.session.describe_target();
        let tooltip = if visible {
            format!("Hide {}", description)
        } else {
            format!("Show {}", description)
        };
        self.tray.set_tooltip(tooltip);
    }
}
