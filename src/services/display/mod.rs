//! Display service: responsibility and boundaries
//!
//! This module and its submodules are responsible ONLY for talking to the display server:
//! window properties, tree queries, map state, keyboard mapping, key grabs and events.
//! Search order, toggling and hotkey matching live in the services that consume
//! `DisplayServer`.

mod dry_run;
mod r#trait;
mod x11;

pub use self::dry_run::DryRunDisplay;
pub use self::r#trait::{create_display, DisplayServer, EventSource, KeyboardMapping};
