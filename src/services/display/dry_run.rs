use crate::error::{Result, ToggleError};
use crate::events::{DisplayEvent, KeyCode, Modifiers, WindowId};
use crate::toggle_error;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

use super::r#trait::{DisplayServer, EventSource, KeyboardMapping};

const ROOT: WindowId = WindowId(1);

/// Раскладка pc105/evdev для букв: (keycode, буква)
const LETTER_KEYCODES: [(u8, char); 26] = [
    (24, 'q'), (25, 'w'), (26, 'e'), (27, 'r'), (28, 't'), (29, 'y'), (30, 'u'),
    (31, 'i'), (32, 'o'), (33, 'p'), (38, 'a'), (39, 's'), (40, 'd'), (41, 'f'),
    (42, 'g'), (43, 'h'), (44, 'j'), (45, 'k'), (46, 'l'), (52, 'z'), (53, 'x'),
    (54, 'c'), (55, 'v'), (56, 'b'), (57, 'n'), (58, 'm'),
];

#[derive(Debug, Clone, Default)]
struct FakeWindow {
    name: Option<String>,
    children: Vec<WindowId>,
    mapped: bool,
    broken_name: bool,
}

#[derive(Debug, Default)]
struct DryRunState {
    windows: HashMap<WindowId, FakeWindow>,
    grabs: Vec<(WindowId, Modifiers, KeyCode)>,
    claimed: HashSet<(Modifiers, KeyCode)>,
    map_requests: Vec<(WindowId, bool)>,
    closed: bool,
}

/// In-memory display used by `--dry-run` and tests.
///
/// Holds a window tree, a letters-only keyboard mapping and an injection channel for
/// events. Map requests take effect immediately.
pub struct DryRunDisplay {
    state: Mutex<DryRunState>,
    mapping: Mutex<KeyboardMapping>,
    events_tx: mpsc::UnboundedSender<DisplayEvent>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<DisplayEvent>>>,
    close_calls: AtomicUsize,
}

impl DryRunDisplay {
    /// Пустое дерево: только корневое окно без имени
    pub fn new() -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let mut state = DryRunState::default();
        state.windows.insert(ROOT, FakeWindow { mapped: true, ..Default::default() });

        Self {
            state: Mutex::new(state),
            mapping: Mutex::new(Self::letters_mapping()),
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
            close_calls: AtomicUsize::new(0),
        }
    }

    /// Дерево с несколькими окнами для режима сухого запуска
    pub fn with_demo_windows() -> Self {
        let display = Self::new();
        let fake_windows = [
            "Terminal - dry_run",
            "Browser - dry_run",
            "Editor - dry_run",
            "Game - dry_run",
        ];
        for (i, title) in fake_windows.iter().enumerate() {
            let frame = WindowId(0x0040_0000 + (i as u32) * 0x10);
            let client = WindowId(frame.0 + 1);
            display.add_window(ROOT, frame, None);
            display.add_window(frame, client, Some(*title));
        }
        info!("Dry-run: эмулируем {} окон", fake_windows.len());
        display
    }

    fn letters_mapping() -> KeyboardMapping {
        let min_keycode = 8u8;
        let max_keycode = 255u8;
        let per_code = 2usize;
        let mut keysyms = vec![0u32; (max_keycode - min_keycode + 1) as usize * per_code];
        for (code, letter) in LETTER_KEYCODES {
            let idx = (code - min_keycode) as usize * per_code;
            keysyms[idx] = letter as u32;
            keysyms[idx + 1] = letter.to_ascii_uppercase() as u32;
        }
        KeyboardMapping {
            min_keycode,
            keysyms_per_keycode: per_code as u8,
            keysyms,
        }
    }

    pub fn add_window(&self, parent: WindowId, window: WindowId, name: Option<&str>) {
        let mut state = self.state.lock();
        state.windows.insert(
            window,
            FakeWindow {
                name: name.map(str::to_string),
                mapped: true,
                ..Default::default()
            },
        );
        if let Some(parent) = state.windows.get_mut(&parent) {
            parent.children.push(window);
        }
    }

    /// Окно исчезает с сервера (как при закрытии приложения)
    #[allow(dead_code)]
    pub fn destroy_window(&self, window: WindowId) {
        let mut state = self.state.lock();
        state.windows.remove(&window);
        for fake in state.windows.values_mut() {
            fake.children.retain(|child| *child != window);
        }
    }

    /// Запрос имени этого окна будет завершаться ошибкой
    #[allow(dead_code)]
    pub fn break_name(&self, window: WindowId) {
        if let Some(fake) = self.state.lock().windows.get_mut(&window) {
            fake.broken_name = true;
        }
    }

    /// Комбинация уже захвачена другим клиентом
    #[allow(dead_code)]
    pub fn claim(&self, modifiers: Modifiers, key_code: KeyCode) {
        self.state.lock().claimed.insert((modifiers, key_code));
    }

    #[allow(dead_code)]
    pub fn set_mapping(&self, mapping: KeyboardMapping) {
        *self.mapping.lock() = mapping;
    }

    #[allow(dead_code)]
    pub fn inject_event(&self, event: DisplayEvent) {
        // Получатель живёт не меньше отправителя, пока источник не уронен
        let _ = self.events_tx.send(event);
    }

    #[allow(dead_code)]
    pub fn grabs(&self) -> Vec<(WindowId, Modifiers, KeyCode)> {
        self.state.lock().grabs.clone()
    }

    #[allow(dead_code)]
    pub fn map_requests(&self) -> Vec<(WindowId, bool)> {
        self.state.lock().map_requests.clone()
    }

    #[allow(dead_code)]
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    #[allow(dead_code)]
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    fn with_window<T>(&self, window: WindowId, f: impl FnOnce(&mut FakeWindow) -> T) -> Result<T> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(ToggleError::ConnectionClosed);
        }
        state
            .windows
            .get_mut(&window)
            .map(f)
            .ok_or_else(|| toggle_error!(query, "BadWindow {}", window))
    }
}

impl Default for DryRunDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayServer for DryRunDisplay {
    fn root(&self) -> WindowId {
        ROOT
    }

    fn window_name(&self, window: WindowId) -> Result<Option<String>> {
        self.with_window(window, |fake| {
            if fake.broken_name {
                Err(toggle_error!(query, "BadAtom при чтении имени {}", window))
            } else {
                Ok(fake.name.clone().filter(|name| !name.is_empty()))
            }
        })?
    }

    fn children(&self, window: WindowId) -> Result<Vec<WindowId>> {
        self.with_window(window, |fake| fake.children.clone())
    }

    fn is_mapped(&self, window: WindowId) -> Result<bool> {
        self.with_window(window, |fake| fake.mapped)
    }

    fn set_mapped(&self, window: WindowId, mapped: bool) -> Result<()> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(ToggleError::ConnectionClosed);
        }
        state.map_requests.push((window, mapped));
        // Запросы без ответа: ошибка BadWindow придёт асинхронно и здесь не видна
        if let Some(fake) = state.windows.get_mut(&window) {
            fake.mapped = mapped;
        }
        Ok(())
    }

    fn keyboard_mapping(&self) -> Result<KeyboardMapping> {
        if self.state.lock().closed {
            return Err(ToggleError::ConnectionClosed);
        }
        Ok(self.mapping.lock().clone())
    }

    fn grab_key(&self, window: WindowId, modifiers: Modifiers, key_code: KeyCode) -> Result<()> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(ToggleError::ConnectionClosed);
        }
        if state.claimed.contains(&(modifiers, key_code)) {
            return Err(toggle_error!(grab, "BadAccess: {} + {} уже захвачена", modifiers, key_code));
        }
        state.grabs.push((window, modifiers, key_code));
        Ok(())
    }

    fn event_source(self: Arc<Self>) -> Result<Box<dyn EventSource>> {
        let rx = self
            .events_rx
            .lock()
            .take()
            .ok_or_else(|| toggle_error!(internal, "источник событий уже создан"))?;
        Ok(Box::new(DryRunEventSource { rx }))
    }

    fn close(&self) -> bool {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock();
        if state.closed {
            return false;
        }
        state.closed = true;
        info!("Dry-run: соединение закрыто");
        true
    }
}

struct DryRunEventSource {
    rx: mpsc::UnboundedReceiver<DisplayEvent>,
}

#[async_trait::async_trait]
impl EventSource for DryRunEventSource {
    async fn next_event(&mut self) -> Result<DisplayEvent> {
        self.rx.recv().await.ok_or(ToggleError::ConnectionClosed)
    }
}
