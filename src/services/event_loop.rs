use crate::{debug_if_enabled, trace_if_enabled};
use crate::error::Result;
use crate::events::{DisplayEvent, Hotkey, Modifiers};
use crate::services::display::EventSource;
use crate::services::session::Session;
use crate::services::VisibilityController;
use crate::toggle_error;
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

/// Пауза после ошибки ожидания события, чтобы не крутить пустой цикл
const ERROR_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopState {
    Running,
    Draining,
    Stopped,
}

/// Фоновый обработчик событий протокола: ловит нажатие привязанной комбинации
/// и переключает окно. Завершается только по токену отмены сессии.
pub struct EventLoop {
    session: Arc<Session>,
    visibility: Arc<VisibilityController>,
    hotkey: Hotkey,
    ignored: Modifiers,
}

impl EventLoop {
    pub fn new(
        session: Arc<Session>,
        visibility: Arc<VisibilityController>,
        ignored: Modifiers,
    ) -> Result<Self> {
        let hotkey = session
            .hotkey()
            .map(|bound| bound.hotkey)
            .ok_or_else(|| toggle_error!(internal, "горячая клавиша не привязана"))?;

        Ok(Self {
            session,
            visibility,
            hotkey,
            ignored,
        })
    }

    /// Запустить цикл на трекере воркеров сессии
    pub fn spawn(self) -> Result<()> {
        let source = self.session.display().clone().event_source()?;
        let workers = self.session.workers().clone();
        workers.spawn(self.run(source));
        Ok(())
    }

    async fn run(self, mut source: Box<dyn EventSource>) {
        let cancel = self.session.cancel_token().clone();
        let mut state = LoopState::Running;
        info!("EventLoop запущен, ожидаем {}", self.hotkey);

        while state == LoopState::Running {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                event = source.next_event() => Some(event),
            };

            match next {
                None => state = Self::transition(state, LoopState::Draining),
                Some(Ok(DisplayEvent::KeyPress { key_code, state: pressed })) => {
                    if self.hotkey.matches(key_code, pressed, self.ignored) {
                        info!("Обнаружена горячая клавиша, переключаем окно");
                        let outcome = self.visibility.toggle();
                        debug!("Результат переключения: {}", outcome);
                    } else {
                        debug_if_enabled!("Пропущено нажатие {} с модификаторами {}", key_code, pressed);
                    }
                }
                Some(Ok(DisplayEvent::Other)) => trace_if_enabled!("Событие X11 проигнорировано"),
                Some(Err(e)) => {
                    warn!("Ошибка ожидания события X11: {}", e);
                    tokio::select! {
                        _ = cancel.cancelled() => {}
                        _ = sleep(ERROR_BACKOFF) => {}
                    }
                }
            }
        }

        // Источник держит fd соединения - освобождаем до того, как трекер опустеет
        drop(source);
        Self::transition(state, LoopState::Stopped);
    }

    fn transition(from: LoopState, to: LoopState) -> LoopState {
        debug!("EventLoop: {:?} -> {:?}", from, to);
        if to == LoopState::Stopped {
            info!("EventLoop остановлен");
        }
        to
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{KeyCode, TargetSpec, WindowId};
    use crate::services::display::{DisplayServer, DryRunDisplay};
    use crate::services::tray::RecordingTray;
    use crate::services::{HotkeyBinder, TrayAdapter, TrayExit};
    use tokio::sync::mpsc;

    async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        for _ in 0..100 {
            if condition() {
                return true;
            }
            sleep(Duration::from_millis(10)).await;
        }
        condition()
    }

    fn fixture(
        ignored: Modifiers,
    ) -> (Arc<DryRunDisplay>, Arc<Session>, Arc<VisibilityController>) {
        let display = Arc::new(DryRunDisplay::new());
        display.add_window(display.root(), WindowId(10), Some("Notes"));
        let session = Arc::new(Session::new(display.clone(), TargetSpec::Title("notes".into())));
        session.set_target_window(Some(WindowId(10)));
        session.set_visible(true);

        HotkeyBinder::new(session.clone(), ignored)
            .bind("ctrl+shift+a")
            .unwrap();

        let visibility = Arc::new(VisibilityController::new(session.clone()));
        EventLoop::new(session.clone(), visibility.clone(), ignored)
            .unwrap()
            .spawn()
            .unwrap();

        (display, session, visibility)
    }

    async fn stop(session: &Session) {
        session.cancel_token().cancel();
        session.workers().close();
        tokio::time::timeout(Duration::from_secs(1), session.workers().wait())
            .await
            .expect("EventLoop должен завершиться после отмены");
    }

    #[tokio::test]
    async fn test_matching_press_toggles_window() {
        let (display, session, _visibility) = fixture(Modifiers::LOCKS);
        let chord = Modifiers::CONTROL | Modifiers::SHIFT;

        display.inject_event(DisplayEvent::Other);
        display.inject_event(DisplayEvent::key_press(KeyCode(39), chord));
        display.inject_event(DisplayEvent::key_press(KeyCode(38), Modifiers::CONTROL));
        display.inject_event(DisplayEvent::key_press(KeyCode(38), chord | Modifiers::LOCK));

        assert!(wait_until(|| !display.map_requests().is_empty()).await);
        assert_eq!(display.map_requests(), vec![(WindowId(10), false)]);
        assert!(!session.is_visible());

        stop(&session).await;
        assert!(session.workers().is_empty());
    }

    #[tokio::test]
    async fn test_strict_mode_rejects_lock_state() {
        let (display, session, _visibility) = fixture(Modifiers::NONE);
        let chord = Modifiers::CONTROL | Modifiers::SHIFT;

        display.inject_event(DisplayEvent::key_press(KeyCode(38), chord | Modifiers::MOD2));
        display.inject_event(DisplayEvent::key_press(KeyCode(38), chord));

        assert!(wait_until(|| display.map_requests().len() == 1).await);
        sleep(Duration::from_millis(50)).await;
        assert_eq!(display.map_requests().len(), 1);

        stop(&session).await;
    }

    #[tokio::test]
    async fn test_cancel_stops_idle_loop() {
        let (display, session, _visibility) = fixture(Modifiers::LOCKS);
        stop(&session).await;

        assert!(session.workers().is_empty());
        assert!(display.map_requests().is_empty());
        assert!(display.is_mapped(WindowId(10)).unwrap());
    }

    #[tokio::test]
    async fn test_hotkey_toggle_updates_tray_tooltip() {
        let (display, session, visibility) = fixture(Modifiers::LOCKS);
        let tray = Arc::new(RecordingTray::default());
        let changes = visibility.subscribe();
        let mut adapter = TrayAdapter::new(session.clone(), visibility, tray.clone(), changes);

        let (_commands_tx, commands_rx) = mpsc::unbounded_channel();
        let tray_loop = tokio::spawn(async move { adapter.run(commands_rx).await });

        let chord = Modifiers::CONTROL | Modifiers::SHIFT;
        display.inject_event(DisplayEvent::key_press(KeyCode(38), chord));
        assert!(wait_until(|| !tray.tooltips.lock().is_empty()).await);
        assert_eq!(*tray.tooltips.lock(), vec!["Show 'notes'".to_string()]);

        display.inject_event(DisplayEvent::key_press(KeyCode(38), chord | Modifiers::MOD2));
        assert!(wait_until(|| tray.tooltips.lock().len() == 2).await);
        assert_eq!(tray.tooltips.lock()[1], "Hide 'notes'");

        stop(&session).await;
        assert_eq!(tray_loop.await.unwrap(), TrayExit::Cancelled);
    }
}
