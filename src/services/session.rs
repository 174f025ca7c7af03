use crate::error::Result;
use crate::events::{Hotkey, TargetSpec, WindowId};
use crate::services::display::DisplayServer;
use crate::toggle_error;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Session provides the shared state of one running toggler.
///
/// Responsibilities (strict):
/// - Own the display connection handle, the target and the root window.
/// - Keep the resolved target window and the cached visibility flag under one lock.
/// - Hold the hotkey once it is bound; it is never replaced afterwards.
/// - Own the cancellation token and the worker tracker used by shutdown.
/// - Do NOT talk to the display server itself; that belongs to the services.
pub struct Session {
    display: Arc<dyn DisplayServer>,
    target: TargetSpec,
    root: WindowId,
    state: Mutex<SessionState>,
    hotkey: OnceCell<BoundHotkey>,
    cancel: CancellationToken,
    workers: TaskTracker,
}

#[derive(Debug, Clone, Copy, Default)]
struct SessionState {
    target_window: Option<WindowId>,
    visible: bool,
}

/// Привязанная горячая клавиша вместе с исходной строкой для меню
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundHotkey {
    pub combo: String,
    pub hotkey: Hotkey,
}

impl Session {
    pub fn new(display: Arc<dyn DisplayServer>, target: TargetSpec) -> Self {
        let root = display.root();
        Self {
            display,
            target,
            root,
            state: Mutex::new(SessionState::default()),
            hotkey: OnceCell::new(),
            cancel: CancellationToken::new(),
            workers: TaskTracker::new(),
        }
    }

    pub fn display(&self) -> &Arc<dyn DisplayServer> {
        &self.display
    }

    pub fn target(&self) -> &TargetSpec {
        &self.target
    }

    pub fn root(&self) -> WindowId {
        self.root
    }

    pub fn target_window(&self) -> Option<WindowId> {
        self.state.lock().target_window
    }

    pub fn set_target_window(&self, window: Option<WindowId>) {
        self.state.lock().target_window = window;
    }

    pub fn is_visible(&self) -> bool {
        self.state.lock().visible
    }

    pub fn set_visible(&self, visible: bool) {
        self.state.lock().visible = visible;
    }

    pub fn hotkey(&self) -> Option<&BoundHotkey> {
        self.hotkey.get()
    }

    pub fn bind_hotkey(&self, bound: BoundHotkey) -> Result<()> {
        self.hotkey
            .set(bound)
            .map_err(|existing| toggle_error!(internal, "горячая клавиша уже привязана: {}", existing.combo))
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn workers(&self) -> &TaskTracker {
        &self.workers
    }

    /// Описание цели для трея и логов: `'заголовок'` или `window 0x...`
    pub fn describe_target(&self) -> String {
        match &self.target {
            TargetSpec::Title(title) => format!("'{}'", title),
            TargetSpec::Id(raw) => match self.target_window() {
                Some(window) => format!("window {}", window),
                None => format!("window {}", raw),
            },
        }
    }
}
