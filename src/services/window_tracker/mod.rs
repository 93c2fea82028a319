//! WindowTracker: which window had input focus most recently.
//!
//! This module only answers "what is focused" and "bring this window back".
//! It knows nothing about triggers or expansions; the selection arbiter
//! snapshots [`WindowTracker::last_known`] and the injector calls
//! [`WindowTracker::activate`].

mod auto;
mod dry_run;
mod kdotool;
mod sway;
mod r#trait;
mod window_tracker;
mod wmctrl;
mod xdotool;

pub use self::r#trait::{create_window_backend, WindowBackend};
pub use self::window_tracker::WindowTracker;
