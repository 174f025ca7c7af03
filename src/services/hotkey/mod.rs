mod binder;
mod combo;
mod keycode;

pub use self::binder::HotkeyBinder;
