pub mod bindings;
#[cfg(feature = "desktop")]
pub mod commands;

pub use bindings::{KeyChord, ShortcutAction};
