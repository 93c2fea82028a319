mod chord_tracker;
mod trigger_detector;
mod trigger_spec;

pub use chord_tracker::ChordTracker;
pub use trigger_detector::TriggerDetector;
pub use trigger_spec::TriggerSpec;
