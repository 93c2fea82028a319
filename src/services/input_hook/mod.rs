//! Global keyboard subscription.
//!
//! Platform code lives behind [`InputHook`]; the trigger detector only ever
//! sees the `subscribe(handler) -> Subscription` shape.

mod dry_input_hook;
mod evdev_input_hook;
mod r#trait;

pub use self::r#trait::{create_input_hook, InputHook, KeyHandler, Subscription};
