pub mod coordinator;
pub mod expansion_store;
pub mod injector;
pub mod input_hook;
pub mod selection;
pub mod trigger_detector;
pub mod window_tracker;

pub use coordinator::Coordinator;
pub use expansion_store::ConfigExpansionStore;
pub use injector::{create_clipboard, create_paste_simulator, Injector};
pub use input_hook::create_input_hook;
pub use selection::{create_selection_ui, SelectionArbiter};
pub use trigger_detector::{TriggerDetector, TriggerSpec};
pub use window_tracker::{create_window_backend, WindowTracker};
