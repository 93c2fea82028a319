use crate::config::Config;
use crate::error::Result;
use crate::events::KeyEvent;
use std::sync::Arc;

/// Callback invoked on the input-delivery path for every key event.
///
/// Runs on a thread owned by the hook: it must return quickly, never block
/// and never perform I/O.
pub type KeyHandler = Arc<dyn Fn(&KeyEvent) + Send + Sync>;

/// Global low-level keyboard subscription.
pub trait InputHook: Send + Sync {
    /// Start delivering every key-down/key-up event to `handler` until the
    /// returned [`Subscription`] is dropped.
    fn subscribe(&self, handler: KeyHandler) -> Result<Subscription>;
}

/// Active subscription; dropping it unsubscribes.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

/// Factory function to create an appropriate input hook based on the dry_run flag
pub fn create_input_hook(config: &Config, dry_run: bool) -> Result<Arc<dyn InputHook>> {
    if dry_run {
        Ok(Arc::new(super::dry_input_hook::DryRunInputHook::new(
            &config.trigger.chord,
        )?))
    } else {
        Ok(Arc::new(super::evdev_input_hook::EvdevInputHook::new(
            &config.input.device_path,
        )?))
    }
}
