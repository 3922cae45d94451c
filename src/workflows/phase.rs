use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where a visitor is in the check-in flow.
///
/// `Done` is never stored: a finished check-in clears the session and the
/// visitor lands back on the lookup page with a success notice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckinPhase {
    #[default]
    Lookup,
    NewRegistrant,
    Scan,
    Confirm,
    Done,
}

/// Things that move a visitor through the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CheckinEvent {
    /// A new lookup discards whatever was in progress
    Restart,
    DocumentFound,
    DocumentUnknown,
    AlreadyRegistered,
    RegistrantSaved,
    /// Code capture is decoupled from confirmation
    CodeCaptured,
    ReviewRequested,
    Confirmed,
    Conflict,
    WriteFailed,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Invalid transition from {from:?} with event {event:?}")]
    Invalid {
        from: CheckinPhase,
        event: CheckinEvent,
    },
}

impl CheckinPhase {
    /// Next phase for `event`, or an error when the event makes no sense here.
    pub fn on(self, event: CheckinEvent) -> Result<CheckinPhase, TransitionError> {
        use CheckinEvent::*;
        use CheckinPhase::*;

        let next = match (self, event) {
            (_, Restart) => Lookup,

            (Lookup, DocumentFound) => Scan,
            (Lookup, DocumentUnknown) => NewRegistrant,
            (Lookup, AlreadyRegistered) => Lookup,

            (NewRegistrant, RegistrantSaved) => Scan,
            (NewRegistrant, WriteFailed) => NewRegistrant,

            (Scan, CodeCaptured) => Scan,
            (Confirm, CodeCaptured) => Confirm,
            (Scan | Confirm, ReviewRequested) => Confirm,

            (Confirm, Confirmed) => Done,
            (Confirm, Conflict) => Lookup,
            (Confirm, WriteFailed) => Confirm,

            (from, event) => return Err(TransitionError::Invalid { from, event }),
        };
        Ok(next)
    }

    /// Page that renders this phase
    pub fn route(&self) -> &'static str {
        match self {
            CheckinPhase::Lookup | CheckinPhase::Done => "/",
            CheckinPhase::NewRegistrant => "/nuevo-registro",
            CheckinPhase::Scan => "/scan",
            CheckinPhase::Confirm => "/confirmar",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckinPhase::Lookup => "lookup",
            CheckinPhase::NewRegistrant => "new_registrant",
            CheckinPhase::Scan => "scan",
            CheckinPhase::Confirm => "confirm",
            CheckinPhase::Done => "done",
        }
    }
}
