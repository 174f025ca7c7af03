use crate::error::Result;
use crate::events::WindowId;
use crate::services::session::Session;
use crate::services::WindowLocator;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Итог одного переключения
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Shown,
    Hidden,
    /// Окно не удалось опросить; цель переразрешена, переключение пропущено
    Skipped,
}

impl fmt::Display for ToggleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToggleOutcome::Shown => write!(f, "показано"),
            ToggleOutcome::Hidden => write!(f, "скрыто"),
            ToggleOutcome::Skipped => write!(f, "пропущено"),
        }
    }
}

pub struct VisibilityController {
    session: Arc<Session>,
    locator: WindowLocator,
    // Переключения из трея и из цикла событий не должны перекрываться
    toggle_guard: Mutex<()>,
    /// Новое значение после каждого map/unmap, откуда бы он ни пришёл
    changes: watch::Sender<bool>,
}

impl VisibilityController {
    pub fn new(session: Arc<Session>) -> Self {
        let locator = WindowLocator::new(session.display().clone());
        let (changes, _) = watch::channel(session.is_visible());
        Self {
            session,
            locator,
            toggle_guard: Mutex::new(()),
            changes,
        }
    }

    /// Подписка на изменения видимости (трей обновляет по ним подсказку)
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.changes.subscribe()
    }

    pub fn is_visible(&self, window: WindowId) -> Result<bool> {
        self.session.display().is_mapped(window)
    }

    /// Map/unmap без ожидания ответа; кэш обновляется сразу
    pub fn set_visible(&self, window: WindowId, visible: bool) {
        if let Err(e) = self.session.display().set_mapped(window, visible) {
            warn!("Запрос map/unmap для {} не отправлен: {}", window, e);
        }

        self.session.set_visible(visible);
        self.changes.send_replace(visible);
        if visible {
            info!("Окно {} показано (map)", window);
        } else {
            info!("Окно {} скрыто (unmap)", window);
        }
    }

    pub fn toggle(&self) -> ToggleOutcome {
        let _guard = self.toggle_guard.lock();

        let Some(window) = self.session.target_window() else {
            warn!("Целевое окно неизвестно, пробуем найти заново");
            self.refresh_target();
            return ToggleOutcome::Skipped;
        };

        match self.is_visible(window) {
            Ok(visible) => {
                self.set_visible(window, !visible);
                if visible {
                    ToggleOutcome::Hidden
                } else {
                    ToggleOutcome::Shown
                }
            }
            Err(e) => {
                error!("Ошибка получения атрибутов окна {}: {}", window, e);
                self.refresh_target();
                ToggleOutcome::Skipped
            }
        }
    }

    /// Повторный поиск цели по исходному заданию
    pub fn refresh_target(&self) {
        match self.locator.resolve(self.session.target()) {
            Ok(window) => {
                info!("Целевое окно обновлено: {}", window);
                self.session.set_target_window(Some(window));
                self.sync();
            }
            Err(e) => {
                error!("Ошибка обновления целевого окна: {}", e);
                self.session.set_target_window(None);
            }
        }
    }

    /// Синхронизировать кэш видимости с сервером
    pub fn sync(&self) {
        let Some(window) = self.session.target_window() else {
            return;
        };
        match self.is_visible(window) {
            Ok(visible) => self.session.set_visible(visible),
            Err(e) => warn!("Не удалось определить видимость окна {}: {}", window, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::TargetSpec;
    use crate::services::display::{DisplayServer, DryRunDisplay};

    fn fixture(target: TargetSpec) -> (Arc<DryRunDisplay>, Arc<Session>, VisibilityController) {
        let display = Arc::new(DryRunDisplay::new());
        display.add_window(display.root(), WindowId(10), Some("Notes — untitled"));
        let session = Arc::new(Session::new(display.clone(), target));
        let controller = VisibilityController::new(session.clone());
        (display, session, controller)
    }

    #[test]
    fn test_toggle_twice_restores_visibility() {
        let (display, session, controller) = fixture(TargetSpec::Title("notes".into()));
        session.set_target_window(Some(WindowId(10)));
        controller.sync();
        assert!(session.is_visible());

        assert_eq!(controller.toggle(), ToggleOutcome::Hidden);
        assert!(!session.is_visible());
        assert!(!display.is_mapped(WindowId(10)).unwrap());

        assert_eq!(controller.toggle(), ToggleOutcome::Shown);
        assert!(session.is_visible());
        assert!(display.is_mapped(WindowId(10)).unwrap());
    }

    #[test]
    fn test_query_failure_reresolves_and_skips() {
        let (display, session, controller) = fixture(TargetSpec::Title("notes".into()));
        session.set_target_window(Some(WindowId(10)));

        // Приложение перезапущено: старое окно исчезло, появилось новое
        display.destroy_window(WindowId(10));
        display.add_window(display.root(), WindowId(30), Some("Notes — reopened"));

        assert_eq!(controller.toggle(), ToggleOutcome::Skipped);
        assert!(display.map_requests().is_empty());
        assert_eq!(session.target_window(), Some(WindowId(30)));

        assert_eq!(controller.toggle(), ToggleOutcome::Hidden);
        assert_eq!(display.map_requests(), vec![(WindowId(30), false)]);
    }

    #[test]
    fn test_every_toggle_is_published() {
        let (_display, session, controller) = fixture(TargetSpec::Title("notes".into()));
        session.set_target_window(Some(WindowId(10)));
        controller.sync();
        let mut changes = controller.subscribe();

        controller.toggle();
        assert!(changes.has_changed().unwrap());
        assert!(!*changes.borrow_and_update());

        controller.toggle();
        assert!(*changes.borrow_and_update());

        // sync только читает состояние сервера и ничего не публикует
        controller.sync();
        assert!(!changes.has_changed().unwrap());
    }

    #[test]
    fn test_failed_reresolution_clears_target() {
        let (display, session, controller) = fixture(TargetSpec::Id("10".into()));
        session.set_target_window(Some(WindowId(10)));
        display.destroy_window(WindowId(10));

        assert_eq!(controller.toggle(), ToggleOutcome::Skipped);
        assert_eq!(session.target_window(), None);
        assert_eq!(controller.toggle(), ToggleOutcome::Skipped);
    }
}
