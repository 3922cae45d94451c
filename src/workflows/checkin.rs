use chrono::{DateTime, FixedOffset, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use super::errors::{CheckinError, ConflictKind};
use super::phase::{CheckinEvent, CheckinPhase};
use crate::registry::{read_snapshot, Person, Registration, RegistrySnapshot, RegistryStore};
use crate::session::{Flash, Identity, RegistrationNotice, Session};

/// Format of the timestamp column in the registrations table
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Result of a successful step: where to go next and the session to keep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub phase: CheckinPhase,
    pub session: Session,
}

impl Step {
    fn new(phase: CheckinPhase, mut session: Session) -> Self {
        // Done is presented as a fresh lookup
        session.phase = match phase {
            CheckinPhase::Done => CheckinPhase::Lookup,
            other => other,
        };
        Self { phase, session }
    }
}

/// The check-in controller.
///
/// Duplicate checks run twice: once at lookup for early feedback and again
/// right before the registration append. The store has no append-if-absent
/// primitive, so two concurrent confirmations can still both succeed; the
/// second check narrows that window but cannot close it.
#[derive(Clone)]
pub struct CheckinWorkflow {
    store: Arc<dyn RegistryStore>,
    utc_offset: FixedOffset,
    clock: Clock,
}

impl std::fmt::Debug for CheckinWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckinWorkflow")
            .field("store", &self.store.backend_name())
            .field("utc_offset", &self.utc_offset)
            .finish()
    }
}

impl CheckinWorkflow {
    pub fn new(store: Arc<dyn RegistryStore>, utc_offset: FixedOffset) -> Self {
        Self {
            store,
            utc_offset,
            clock: Arc::new(Utc::now),
        }
    }

    /// Replace the wall clock, for deterministic timestamps in tests.
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    pub fn store(&self) -> &Arc<dyn RegistryStore> {
        &self.store
    }

    fn timestamp(&self) -> String {
        (self.clock)()
            .with_timezone(&self.utc_offset)
            .format(TIMESTAMP_FORMAT)
            .to_string()
    }

    /// LOOKUP: find the person behind `document`.
    ///
    /// Starts over whatever the session held. An unreadable store degrades to
    /// an empty registry, so the visitor is offered the new-registrant form.
    pub async fn lookup(&self, mut session: Session, document: &str) -> Result<Step, CheckinError> {
        session.clear_identity();
        let phase = session.phase.on(CheckinEvent::Restart)?;

        let document = document.trim();
        if document.is_empty() {
            return Err(CheckinError::validation(
                "Enter a document number.",
                CheckinPhase::Lookup,
            ));
        }

        let snapshot = match read_snapshot(self.store.as_ref()).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "Registry unreadable at lookup, continuing with empty tables");
                session.flash(Flash::danger(format!("Error reading the registry: {e}")));
                RegistrySnapshot::empty()
            }
        };

        if let Some(existing) = snapshot.registration_for_document(document) {
            warn!(
                document = %document,
                code = %existing.scanned_code,
                "Document already registered"
            );
            session.flash(Flash::danger("This document already registered a code."));
            session.last_registration = Some(RegistrationNotice::from(existing));
            return Ok(Step::new(phase.on(CheckinEvent::AlreadyRegistered)?, session));
        }

        let Some(person) = snapshot.find_person(document) else {
            info!(document = %document, "Document not in registry, asking for details");
            session.pending_document = Some(document.to_string());
            return Ok(Step::new(phase.on(CheckinEvent::DocumentUnknown)?, session));
        };

        info!(document = %document, "Document found, ready to scan");
        session.identity = Some(Identity::from(person));
        Ok(Step::new(phase.on(CheckinEvent::DocumentFound)?, session))
    }

    /// NEW_REGISTRANT: add the person captured at lookup to the registry.
    pub async fn register(
        &self,
        mut session: Session,
        full_name: &str,
        phone: &str,
    ) -> Result<Step, CheckinError> {
        let Some(document) = session.pending_document.clone() else {
            return Err(CheckinError::precondition("Look up a document first."));
        };
        let phase = session.phase;

        let (full_name, phone) = (full_name.trim(), phone.trim());
        if full_name.is_empty() || phone.is_empty() {
            return Err(CheckinError::validation(
                "All fields are required.",
                CheckinPhase::NewRegistrant,
            ));
        }

        let person = Person::new(&document, full_name, phone);
        if let Err(source) = self.store.append_person(&person).await {
            warn!(
                document = %document,
                error = %source,
                transient = source.is_transient(),
                "Could not save new registrant"
            );
            return Err(CheckinError::StoreUnavailable {
                during: "saving to the people table",
                phase: phase.on(CheckinEvent::WriteFailed)?,
                source,
            });
        }

        info!(document = %document, "New registrant saved");
        session.pending_document = None;
        session.identity = Some(Identity::from(&person));
        Ok(Step::new(phase.on(CheckinEvent::RegistrantSaved)?, session))
    }

    /// SCAN precondition: an identity must be in the session.
    pub fn require_identity(&self, session: Session) -> Result<Step, CheckinError> {
        if !session.has_identity() {
            return Err(CheckinError::precondition(
                "Search for your document first.",
            ));
        }
        let phase = match session.phase {
            CheckinPhase::Confirm => CheckinPhase::Confirm,
            _ => CheckinPhase::Scan,
        };
        Ok(Step::new(phase, session))
    }

    /// SCAN: remember the code read by the camera widget or typed by hand.
    pub fn capture_code(&self, mut session: Session, code: &str) -> Result<Step, CheckinError> {
        let Step { phase, .. } = self.require_identity(session.clone())?;
        if code.is_empty() {
            return Err(CheckinError::validation("No code received.", phase));
        }

        session.detected_code = Some(code.to_string());
        Ok(Step::new(phase.on(CheckinEvent::CodeCaptured)?, session))
    }

    /// CONFIRM (read): show what is about to be saved.
    pub fn review(&self, session: Session) -> Result<Step, CheckinError> {
        let Step { phase, session } = self.require_identity(session)?;
        Ok(Step::new(phase.on(CheckinEvent::ReviewRequested)?, session))
    }

    /// CONFIRM (write): re-check both invariants against a fresh read, then
    /// append exactly one registration row.
    pub async fn confirm(&self, session: Session) -> Result<Step, CheckinError> {
        let Step { phase, mut session } = self.review(session)?;
        let (Some(identity), Some(code)) = (session.identity.clone(), session.detected_code.clone())
        else {
            return Err(CheckinError::validation(
                "Scan a code before confirming.",
                CheckinPhase::Scan,
            ));
        };

        let snapshot = read_snapshot(self.store.as_ref())
            .await
            .map_err(|source| CheckinError::StoreUnavailable {
                during: "checking existing registrations",
                phase,
                source,
            })?;

        if snapshot.registration_for_document(&identity.document).is_some() {
            warn!(document = %identity.document, "Confirmation rejected: document already registered");
            return Err(Self::conflict(
                phase,
                ConflictKind::DocumentRegistered {
                    document: identity.document,
                },
            ));
        }

        if let Some(claimant) = snapshot.registration_for_code(&code) {
            warn!(
                document = %identity.document,
                code = %code,
                claimant = %claimant.document,
                "Confirmation rejected: code already used"
            );
            return Err(Self::conflict(
                phase,
                ConflictKind::CodeInUse {
                    code,
                    claimant_name: claimant.full_name.clone(),
                    claimant_document: claimant.document.clone(),
                },
            ));
        }

        let registration = Registration::new(&self.timestamp(), &identity.as_person(), &code);
        if let Err(source) = self.store.append_registration(&registration).await {
            warn!(
                document = %identity.document,
                error = %source,
                transient = source.is_transient(),
                "Could not save registration"
            );
            return Err(CheckinError::StoreUnavailable {
                during: "saving registration",
                phase: phase.on(CheckinEvent::WriteFailed)?,
                source,
            });
        }

        info!(
            document = %registration.document,
            code = %registration.scanned_code,
            timestamp = %registration.timestamp,
            "Registration saved"
        );
        session.clear();
        session.flash(Flash::success("Registration saved."));
        Ok(Step::new(phase.on(CheckinEvent::Confirmed)?, session))
    }

    /// A confirmation that would break a registry invariant ends the check-in.
    fn conflict(phase: CheckinPhase, kind: ConflictKind) -> CheckinError {
        match phase.on(CheckinEvent::Conflict) {
            Ok(_) => CheckinError::Conflict(kind),
            Err(e) => e.into(),
        }
    }
}
