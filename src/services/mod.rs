pub mod display;
pub mod event_loop;
pub mod hotkey;
pub mod session;
pub mod shutdown;
pub mod tray;
pub mod visibility;
pub mod window_locator;

pub use display::create_display;
pub use event_loop::EventLoop;
pub use hotkey::HotkeyBinder;
pub use session::Session;
pub use shutdown::{wait_for_termination, ShutdownCoordinator};
pub use tray::{create_tray, TrayAdapter, TrayExit};
pub use visibility::VisibilityController;
pub use window_locator::WindowLocator;
