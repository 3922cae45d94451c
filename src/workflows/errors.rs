use thiserror::Error;

use super::phase::{CheckinPhase, TransitionError};
use crate::registry::StoreError;
use crate::session::{Flash, FlashLevel, Session};

/// Which registry invariant a confirmation would have broken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictKind {
    /// The document already has a registration row
    DocumentRegistered { document: String },
    /// Someone else's registration already carries this code
    CodeInUse {
        code: String,
        claimant_name: String,
        claimant_document: String,
    },
}

/// Why a check-in step did not go through.
///
/// Every variant is recoverable: it becomes a notice on the next page and a
/// redirect to the phase returned by [`CheckinError::recovery_phase`].
#[derive(Debug, Error)]
pub enum CheckinError {
    /// Required input missing; re-prompt on the same step
    #[error("{message}")]
    Validation {
        message: String,
        phase: CheckinPhase,
    },

    /// Step reached without the state it needs
    #[error("{message}")]
    Precondition { message: String },

    #[error("{}", conflict_message(.0))]
    Conflict(ConflictKind),

    /// The store could not be read or written; the step can be retried
    #[error("Error {during}: {source}")]
    StoreUnavailable {
        during: &'static str,
        phase: CheckinPhase,
        #[source]
        source: StoreError,
    },
}

fn conflict_message(kind: &ConflictKind) -> String {
    match kind {
        ConflictKind::DocumentRegistered { .. } => {
            "This document already has a registration.".to_string()
        }
        ConflictKind::CodeInUse {
            claimant_name,
            claimant_document,
            ..
        } => format!("This code was already used by {claimant_name} ({claimant_document})"),
    }
}

impl CheckinError {
    pub fn validation(message: impl Into<String>, phase: CheckinPhase) -> Self {
        CheckinError::Validation {
            message: message.into(),
            phase,
        }
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        CheckinError::Precondition {
            message: message.into(),
        }
    }

    pub fn level(&self) -> FlashLevel {
        match self {
            CheckinError::Validation { .. } | CheckinError::Precondition { .. } => {
                FlashLevel::Warning
            }
            CheckinError::Conflict(_) | CheckinError::StoreUnavailable { .. } => FlashLevel::Danger,
        }
    }

    /// Phase the visitor is sent back to
    pub fn recovery_phase(&self) -> CheckinPhase {
        match self {
            CheckinError::Validation { phase, .. } => *phase,
            CheckinError::Precondition { .. } | CheckinError::Conflict(_) => CheckinPhase::Lookup,
            CheckinError::StoreUnavailable { phase, .. } => *phase,
        }
    }

    /// Apply this failure to the visitor's session and return where to send
    /// them. Preconditions and conflicts discard identity; validation and store
    /// failures keep everything so the step can be retried.
    pub fn recover(&self, session: &mut Session) -> CheckinPhase {
        let phase = self.recovery_phase();
        match self {
            CheckinError::Precondition { .. } | CheckinError::Conflict(_) => {
                session.clear_identity();
            }
            CheckinError::Validation { .. } | CheckinError::StoreUnavailable { .. } => {
                session.phase = phase;
            }
        }
        session.flash(Flash {
            level: self.level(),
            message: self.to_string(),
        });
        phase
    }
}

impl From<TransitionError> for CheckinError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::Invalid { .. } => {
                CheckinError::precondition("Please look up a document first.")
            }
        }
    }
}
