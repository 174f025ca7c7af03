use crate::services::session::Session;
use crate::services::tray::TrayUi;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::{timeout, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Через сколько предупреждать о воркерах, которые не остановились
const WORKERS_WARN_AFTER: Duration = Duration::from_secs(5);

/// Единая точка завершения: вызывается и из меню, и по сигналу ОС.
///
/// Порядок: отмена воркеров, остановка трея, ожидание воркеров, закрытие соединения.
/// Выполняется ровно один раз; остальные вызовы ждут окончания первого.
pub struct ShutdownCoordinator {
    session: Arc<Session>,
    tray: Option<Arc<dyn TrayUi>>,
    started: AtomicBool,
    finished: CancellationToken,
}

impl ShutdownCoordinator {
    pub fn new(session: Arc<Session>, tray: Option<Arc<dyn TrayUi>>) -> Self {
        Self {
            session,
            tray,
            started: AtomicBool::new(false),
            finished: CancellationToken::new(),
        }
    }

    /// Возвращает `true` только для вызова, который действительно выполнил завершение
    pub async fn shutdown(&self) -> bool {
        if self
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Завершение уже выполняется, ждём его окончания");
            self.finished.cancelled().await;
            return false;
        }

        info!("Завершение работы...");
        self.session.cancel_token().cancel();

        if let Some(tray) = &self.tray {
            tray.quit();
        }

        // Соединение закрывается только после остановки всех воркеров
        let workers = self.session.workers();
        workers.close();
        let wait = workers.wait();
        tokio::pin!(wait);
        if timeout(WORKERS_WARN_AFTER, &mut wait).await.is_err() {
            warn!("Воркеры ещё работают ({} осталось), продолжаем ждать", workers.len());
            wait.await;
        }
        debug!("Все воркеры остановлены");

        if self.session.display().close() {
            info!("Соединение с дисплеем закрыто");
        }

        self.finished.cancel();
        true
    }
}

/// Ждать Ctrl+C или SIGTERM
pub async fn wait_for_termination() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = match signal(SignalKind::terminate()) {
            Ok(stream) => stream,
            Err(e) => {
                error!("Не удалось подписаться на SIGTERM: {}", e);
                wait_for_ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = wait_for_ctrl_c() => {}
            _ = terminate.recv() => info!("Получен сигнал завершения (SIGTERM)"),
        }
    }

    #[cfg(not(unix))]
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Получен сигнал завершения (Ctrl+C)"),
        Err(err) => {
            error!("Ошибка при ожидании сигнала завершения: {}", err);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::TargetSpec;
    use crate::services::display::DryRunDisplay;
    use crate::services::tray::RecordingTray;

    #[tokio::test]
    async fn test_concurrent_shutdown_runs_once() {
        let display = Arc::new(DryRunDisplay::new());
        let session = Arc::new(Session::new(display.clone(), TargetSpec::Title("notes".into())));
        let tray = Arc::new(RecordingTray::default());

        // Воркер, который живёт до отмены и запоминает, было ли соединение уже закрыто
        let cancel = session.cancel_token().clone();
        let closed_under_worker = Arc::new(AtomicBool::new(false));
        session.workers().spawn({
            let display = display.clone();
            let closed_under_worker = closed_under_worker.clone();
            async move {
                cancel.cancelled().await;
                tokio::task::yield_now().await;
                closed_under_worker.store(display.is_closed(), Ordering::SeqCst);
            }
        });

        let coordinator = Arc::new(ShutdownCoordinator::new(
            session.clone(),
            Some(tray.clone() as Arc<dyn TrayUi>),
        ));

        let first = tokio::spawn({
            let coordinator = coordinator.clone();
            async move { coordinator.shutdown().await }
        });
        let second = tokio::spawn({
            let coordinator = coordinator.clone();
            async move { coordinator.shutdown().await }
        });

        let results = [first.await.unwrap(), second.await.unwrap()];
        assert_eq!(results.iter().filter(|done| **done).count(), 1);

        assert_eq!(display.close_calls(), 1);
        assert!(display.is_closed());
        assert!(!closed_under_worker.load(Ordering::SeqCst));
        assert!(session.workers().is_empty());
        assert_eq!(tray.quits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_worker_finishes_before_close() {
        let display = Arc::new(DryRunDisplay::new());
        let session = Arc::new(Session::new(display.clone(), TargetSpec::Title("notes".into())));

        // Воркер останавливается дольше порога предупреждения
        let finished_open = Arc::new(AtomicBool::new(false));
        session.workers().spawn({
            let display = display.clone();
            let finished_open = finished_open.clone();
            async move {
                tokio::time::sleep(Duration::from_secs(30)).await;
                finished_open.store(!display.is_closed(), Ordering::SeqCst);
            }
        });

        let coordinator = ShutdownCoordinator::new(session.clone(), None);
        assert!(coordinator.shutdown().await);

        assert!(finished_open.load(Ordering::SeqCst));
        assert!(session.workers().is_empty());
        assert!(display.is_closed());
        assert_eq!(display.close_calls(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_without_tray() {
        let display = Arc::new(DryRunDisplay::new());
        let session = Arc::new(Session::new(display.clone(), TargetSpec::Id("0x1a".into())));
        let coordinator = ShutdownCoordinator::new(session.clone(), None);

        assert!(coordinator.shutdown().await);
        assert!(!coordinator.shutdown().await);
        assert!(session.cancel_token().is_cancelled());
        assert_eq!(display.close_calls(), 1);
    }
}
