//! Injector: clipboard-safe paste into the window that had focus before the picker.

mod clipboard;
mod injector;
mod paste;
mod restore;

pub use clipboard::{create_clipboard, ClipboardAccess, ClipboardImage};
pub use injector::Injector;
pub use paste::{create_paste_simulator, PasteSimulator};
