mod evdev_to_key_name;
mod key_name_to_evdev_code;

pub use evdev_to_key_name::EvdevToKeyName;
pub use key_name_to_evdev_code::KeyNameToEvdevCode;
