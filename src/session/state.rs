use serde::{Deserialize, Serialize};

use crate::registry::{Person, Registration};
use crate::workflows::CheckinPhase;

/// Severity of a one-shot notice, named after the CSS classes the pages use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Warning,
    Danger,
}

impl FlashLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlashLevel::Success => "success",
            FlashLevel::Warning => "warning",
            FlashLevel::Danger => "danger",
        }
    }
}

/// A message shown once on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Warning,
            message: message.into(),
        }
    }

    pub fn danger(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Danger,
            message: message.into(),
        }
    }
}

/// Who is checking in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub document: String,
    pub full_name: String,
    pub phone: String,
}

impl Identity {
    pub fn as_person(&self) -> Person {
        Person::new(&self.document, &self.full_name, &self.phone)
    }
}

impl From<&Person> for Identity {
    fn from(person: &Person) -> Self {
        Self {
            document: person.document.clone(),
            full_name: person.full_name.clone(),
            phone: person.phone.clone(),
        }
    }
}

/// Read-only view of an existing registration, shown once at lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationNotice {
    pub code: String,
    pub timestamp: String,
    pub full_name: String,
    pub zone: Option<String>,
    pub table: Option<String>,
}

impl From<&Registration> for RegistrationNotice {
    fn from(registration: &Registration) -> Self {
        Self {
            code: registration.scanned_code.clone(),
            timestamp: registration.timestamp.clone(),
            full_name: registration.full_name.clone(),
            zone: registration.zone.clone(),
            table: registration.table.clone(),
        }
    }
}

/// Per-browser workflow state.
///
/// Handlers receive an owned snapshot, the workflow returns a new snapshot,
/// and only the returned value is written back to the cookie.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub phase: CheckinPhase,
    #[serde(default)]
    pub identity: Option<Identity>,
    /// Document captured at lookup that matched no person yet
    #[serde(default)]
    pub pending_document: Option<String>,
    #[serde(default)]
    pub detected_code: Option<String>,
    #[serde(default)]
    pub last_registration: Option<RegistrationNotice>,
    #[serde(default)]
    pub flashes: Vec<Flash>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flash(&mut self, flash: Flash) {
        self.flashes.push(flash);
    }

    /// Drain pending notices for rendering.
    pub fn take_flashes(&mut self) -> Vec<Flash> {
        std::mem::take(&mut self.flashes)
    }

    pub fn take_last_registration(&mut self) -> Option<RegistrationNotice> {
        self.last_registration.take()
    }

    /// Discard identity, pending document and code; notices survive.
    pub fn clear_identity(&mut self) {
        self.identity = None;
        self.pending_document = None;
        self.detected_code = None;
        self.phase = CheckinPhase::Lookup;
    }

    /// Forget everything except notices still waiting to be shown.
    pub fn clear(&mut self) {
        let flashes = self.take_flashes();
        let last_registration = self.take_last_registration();
        *self = Session {
            flashes,
            last_registration,
            ..Session::default()
        };
    }

    pub fn has_identity(&self) -> bool {
        self.identity.is_some()
    }
}
