//! Selection arbiter: one trigger, one focus snapshot, one user decision.

mod arbiter;
mod dry_run;
mod menu;
mod session;
mod ui;

pub use arbiter::{SelectionArbiter, SelectionOutcome};
pub use session::{filter_candidates, CancelReason, SelectionResult, SelectionSession};
pub use ui::{create_selection_ui, Notice, SelectionUi};
