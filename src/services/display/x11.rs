use crate::error::{Result, ToggleError};
use crate::events::{DisplayEvent, KeyCode, Modifiers, WindowId};
use crate::toggle_error;
use parking_lot::RwLock;
use std::os::unix::io::{AsRawFd, RawFd};
use std::sync::Arc;
use tokio::io::unix::AsyncFd;
use tokio::sync::Notify;
use tracing::{debug, info};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{Atom, AtomEnum, ConnectionExt, GrabMode, MapState, ModMask};
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;

use super::r#trait::{DisplayServer, EventSource, KeyboardMapping};

x11rb::atom_manager! {
    pub Atoms: AtomsCookie {
        _NET_WM_NAME,
        UTF8_STRING,
    }
}

/// Соединение с X-сервером через x11rb.
///
/// Само соединение лежит в `RwLock<Option<_>>`: закрытие - это `take()` под write-локом,
/// после которого все запросы возвращают `ConnectionClosed`.
///
/// Запрос из другого потока может вычитать из сокета и событие: x11rb сложит его в свой
/// буфер, и сокет больше не станет готовым на чтение. Поэтому после каждого запроса
/// будится `requests_done`, и источник событий заново проверяет буфер.
pub struct X11Display {
    conn: RwLock<Option<RustConnection>>,
    root: WindowId,
    atoms: Atoms,
    min_keycode: u8,
    max_keycode: u8,
    raw_fd: RawFd,
    requests_done: Notify,
}

impl X11Display {
    pub fn connect() -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None)?;

        let setup = conn.setup();
        let root = WindowId(setup.roots[screen_num].root);
        let min_keycode = setup.min_keycode;
        let max_keycode = setup.max_keycode;

        let atoms = Atoms::new(&conn)?.reply()?;
        let raw_fd = conn.stream().as_raw_fd();

        info!("Подключено к X-серверу, экран {}, корневое окно {}", screen_num, root);

        Ok(Self {
            conn: RwLock::new(Some(conn)),
            root,
            atoms,
            min_keycode,
            max_keycode,
            raw_fd,
            requests_done: Notify::new(),
        })
    }

    /// Запрос к серверу. После него источник событий перепроверит буфер x11rb
    fn with_conn<T>(&self, f: impl FnOnce(&RustConnection) -> Result<T>) -> Result<T> {
        let result = self.with_conn_quiet(f);
        self.requests_done.notify_one();
        result
    }

    fn with_conn_quiet<T>(&self, f: impl FnOnce(&RustConnection) -> Result<T>) -> Result<T> {
        let guard = self.conn.read();
        match guard.as_ref() {
            Some(conn) => f(conn),
            None => Err(ToggleError::ConnectionClosed),
        }
    }

    fn read_text_property(
        conn: &RustConnection,
        window: WindowId,
        property: Atom,
        type_: Atom,
    ) -> Result<Option<String>> {
        let reply = conn
            .get_property(false, window.0, property, type_, 0, u32::MAX)?
            .reply()?;

        if reply.value.is_empty() {
            return Ok(None);
        }

        Ok(Some(String::from_utf8_lossy(&reply.value).into_owned()))
    }

    /// Неблокирующая выборка одного события из буфера соединения
    fn poll_event(&self) -> Result<Option<DisplayEvent>> {
        self.with_conn_quiet(|conn| {
            let event = conn.poll_for_event()?.map(|event| match event {
                Event::KeyPress(e) => {
                    DisplayEvent::key_press(KeyCode(e.detail), Modifiers(u16::from(e.state)))
                }
                _ => DisplayEvent::Other,
            });
            Ok(event)
        })
    }
}

impl DisplayServer for X11Display {
    fn root(&self) -> WindowId {
        self.root
    }

    fn window_name(&self, window: WindowId) -> Result<Option<String>> {
        self.with_conn(|conn| {
            // _NET_WM_NAME (UTF-8) приоритетнее, WM_NAME - запасной вариант любого типа
            if let Some(name) =
                Self::read_text_property(conn, window, self.atoms._NET_WM_NAME, self.atoms.UTF8_STRING)?
            {
                return Ok(Some(name));
            }
            Self::read_text_property(conn, window, AtomEnum::WM_NAME.into(), AtomEnum::ANY.into())
        })
    }

    fn children(&self, window: WindowId) -> Result<Vec<WindowId>> {
        self.with_conn(|conn| {
            let tree = conn.query_tree(window.0)?.reply()?;
            Ok(tree.children.into_iter().map(WindowId).collect())
        })
    }

    fn is_mapped(&self, window: WindowId) -> Result<bool> {
        self.with_conn(|conn| {
            let attrs = conn.get_window_attributes(window.0)?.reply()?;
            Ok(attrs.map_state != MapState::UNMAPPED)
        })
    }

    fn set_mapped(&self, window: WindowId, mapped: bool) -> Result<()> {
        self.with_conn(|conn| {
            if mapped {
                conn.map_window(window.0)?;
            } else {
                conn.unmap_window(window.0)?;
            }
            conn.flush()?;
            Ok(())
        })
    }

    fn keyboard_mapping(&self) -> Result<KeyboardMapping> {
        self.with_conn(|conn| {
            let count = self.max_keycode - self.min_keycode + 1;
            let reply = conn.get_keyboard_mapping(self.min_keycode, count)?.reply()?;
            debug!(
                "Получена раскладка: коды {}..={}, {} keysym на код",
                self.min_keycode, self.max_keycode, reply.keysyms_per_keycode
            );
            Ok(KeyboardMapping {
                min_keycode: self.min_keycode,
                keysyms_per_keycode: reply.keysyms_per_keycode,
                keysyms: reply.keysyms,
            })
        })
    }

    fn grab_key(&self, window: WindowId, modifiers: Modifiers, key_code: KeyCode) -> Result<()> {
        self.with_conn(|conn| {
            conn.grab_key(
                true,
                window.0,
                ModMask::from(modifiers.bits()),
                key_code.value(),
                GrabMode::ASYNC,
                GrabMode::ASYNC,
            )?
            .check()
            .map_err(|e| toggle_error!(grab, "{} + {}: {}", modifiers, key_code, e))
        })
    }

    fn event_source(self: Arc<Self>) -> Result<Box<dyn EventSource>> {
        if self.conn.read().is_none() {
            return Err(ToggleError::ConnectionClosed);
        }
        let fd = AsyncFd::new(RawFdWatcher::new(self.raw_fd))?;
        Ok(Box::new(X11EventSource { display: self, fd }))
    }

    fn close(&self) -> bool {
        match self.conn.write().take() {
            Some(conn) => {
                if let Err(e) = conn.flush() {
                    debug!("Ошибка flush перед закрытием соединения: {}", e);
                }
                drop(conn);
                info!("Соединение с X-сервером закрыто");
                true
            }
            None => false,
        }
    }
}

/// Ожидание событий: сначала разбираем то, что уже в буфере x11rb, потом ждём
/// готовности сокета на чтение или завершения чужого запроса. Future можно уронить
/// в любой момент.
struct X11EventSource {
    display: Arc<X11Display>,
    fd: AsyncFd<RawFdWatcher>,
}

#[async_trait::async_trait]
impl EventSource for X11EventSource {
    async fn next_event(&mut self) -> Result<DisplayEvent> {
        loop {
            if let Some(event) = self.display.poll_event()? {
                return Ok(event);
            }
            tokio::select! {
                readiness = self.fd.readable() => readiness?.clear_ready(),
                _ = self.display.requests_done.notified() => {}
            }
        }
    }
}

struct RawFdWatcher {
    fd: RawFd,
}

impl RawFdWatcher {
    fn new(fd: RawFd) -> Self {
        Self { fd }
    }
}

impl AsRawFd for RawFdWatcher {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    /// Дисплей без живого соединения: все запросы сразу получают `ConnectionClosed`
    fn disconnected() -> X11Display {
        X11Display {
            conn: RwLock::new(None),
            root: WindowId(1),
            atoms: Atoms {
                _NET_WM_NAME: 0,
                UTF8_STRING: 0,
            },
            min_keycode: 8,
            max_keycode: 255,
            raw_fd: -1,
            requests_done: Notify::new(),
        }
    }

    #[tokio::test]
    async fn test_request_wakes_later_event_wait() {
        let display = disconnected();

        // Запрос завершился, пока источник событий ещё не ждал
        assert!(matches!(display.is_mapped(WindowId(10)), Err(ToggleError::ConnectionClosed)));

        let woken = timeout(Duration::from_millis(100), display.requests_done.notified()).await;
        assert!(woken.is_ok(), "ожидание должно сразу перепроверить буфер x11rb");
    }

    #[tokio::test]
    async fn test_polling_does_not_wake_itself() {
        let display = disconnected();

        assert!(display.poll_event().is_err());

        let woken = timeout(Duration::from_millis(50), display.requests_done.notified()).await;
        assert!(woken.is_err());
    }
}
