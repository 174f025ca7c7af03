//! Tray service: responsibility and boundaries
//!
//! `ksni_tray` renders the StatusNotifierItem and turns menu clicks into `TrayCommand`s.
//! `TrayAdapter` is the only place that reacts to them; it never touches ksni directly.

mod adapter;
mod ksni_tray;
mod r#trait;

pub use self::adapter::{TrayAdapter, TrayExit};
pub use self::r#trait::{create_tray, TrayUi};

#[cfg(test)]
pub(crate) use self::adapter::tests::RecordingTray;
