// Check-in workflow: phase machine, controller and failure taxonomy

pub mod checkin;
pub mod errors;
pub mod phase;

pub use checkin::{CheckinWorkflow, Step, TIMESTAMP_FORMAT};
pub use errors::{CheckinError, ConflictKind};
pub use phase::{CheckinEvent, CheckinPhase, TransitionError};
