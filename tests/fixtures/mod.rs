//! Shared fixtures for the check-in integration tests
#![allow(dead_code)]

use checkin_desk::registry::{InMemoryRegistry, Person, Registration, RegistryStore};
use checkin_desk::session::{Identity, Session};
use checkin_desk::workflows::{CheckinPhase, CheckinWorkflow};
use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use std::sync::Arc;

/// RSA key generated for these tests only; it signs nothing real.
pub const TEST_PRIVATE_KEY: &str = include_str!("service_account_key.pem");

pub const FIXED_TIMESTAMP: &str = "2026-10-16 09:30:00";

pub fn bogota() -> FixedOffset {
    FixedOffset::west_opt(5 * 3600).expect("valid offset")
}

/// 14:30 UTC, which is 09:30 at the event
pub fn fixed_clock() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 16, 14, 30, 0).unwrap()
}

pub fn workflow(store: Arc<dyn RegistryStore>) -> CheckinWorkflow {
    CheckinWorkflow::new(store, bogota()).with_clock(fixed_clock)
}

pub fn ana() -> Person {
    Person::new("123", "Ana", "555")
}

pub fn luis() -> Person {
    Person::new("456", "Luis", "777")
}

pub fn registration(person: &Person, code: &str) -> Registration {
    Registration::new("2026-10-15 18:00:00", person, code)
}

pub fn store_with_people(people: Vec<Person>) -> Arc<InMemoryRegistry> {
    Arc::new(InMemoryRegistry::with_people(people))
}

/// Session of a visitor who is on the scan page
pub fn scanning_session(person: &Person, code: Option<&str>) -> Session {
    Session {
        phase: CheckinPhase::Scan,
        identity: Some(Identity::from(person)),
        detected_code: code.map(str::to_string),
        ..Session::default()
    }
}

/// Service account key file as Google hands it out
pub fn service_account_json(token_uri: &str) -> String {
    serde_json::json!({
        "type": "service_account",
        "project_id": "checkin-test",
        "client_email": "checkin@checkin-test.iam.gserviceaccount.com",
        "private_key": TEST_PRIVATE_KEY,
        "token_uri": token_uri,
    })
    .to_string()
}
