use serde::Serialize;
use std::collections::HashMap;

use super::types::{Person, Registration};

/// One consistent read of both registry tables with lookup indexes.
///
/// Indexes are rebuilt on every read. The first row wins when a key repeats,
/// which is how the sheet has always been interpreted.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    people: Vec<Person>,
    registrations: Vec<Registration>,
    person_by_document: HashMap<String, usize>,
    registration_by_document: HashMap<String, usize>,
    registration_by_code: HashMap<String, usize>,
}

impl RegistrySnapshot {
    pub fn new(people: Vec<Person>, registrations: Vec<Registration>) -> Self {
        let mut person_by_document = HashMap::with_capacity(people.len());
        for (i, person) in people.iter().enumerate() {
            person_by_document.entry(person.document.clone()).or_insert(i);
        }

        let mut registration_by_document = HashMap::with_capacity(registrations.len());
        let mut registration_by_code = HashMap::with_capacity(registrations.len());
        for (i, registration) in registrations.iter().enumerate() {
            registration_by_document
                .entry(registration.document.clone())
                .or_insert(i);
            registration_by_code
                .entry(registration.scanned_code.clone())
                .or_insert(i);
        }

        Self {
            people,
            registrations,
            person_by_document,
            registration_by_document,
            registration_by_code,
        }
    }

    /// Snapshot used when the store cannot be read
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn people(&self) -> &[Person] {
        &self.people
    }

    pub fn registrations(&self) -> &[Registration] {
        &self.registrations
    }

    pub fn find_person(&self, document: &str) -> Option<&Person> {
        self.person_by_document
            .get(document)
            .map(|&i| &self.people[i])
    }

    pub fn registration_for_document(&self, document: &str) -> Option<&Registration> {
        self.registration_by_document
            .get(document)
            .map(|&i| &self.registrations[i])
    }

    pub fn registration_for_code(&self, code: &str) -> Option<&Registration> {
        self.registration_by_code
            .get(code)
            .map(|&i| &self.registrations[i])
    }

    /// Documents and codes that appear on more than one registration row.
    ///
    /// The check-then-append race can produce these; they are reported, never
    /// repaired.
    pub fn duplicate_report(&self) -> DuplicateReport {
        let mut documents: HashMap<&str, usize> = HashMap::new();
        let mut codes: HashMap<&str, usize> = HashMap::new();
        for registration in &self.registrations {
            *documents.entry(registration.document.as_str()).or_default() += 1;
            *codes.entry(registration.scanned_code.as_str()).or_default() += 1;
        }

        let mut duplicate_documents: Vec<String> = documents
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(document, _)| document.to_string())
            .collect();
        let mut duplicate_codes: Vec<String> = codes
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(code, _)| code.to_string())
            .collect();
        duplicate_documents.sort();
        duplicate_codes.sort();

        DuplicateReport {
            duplicate_documents,
            duplicate_codes,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DuplicateReport {
    pub duplicate_documents: Vec<String>,
    pub duplicate_codes: Vec<String>,
}

impl DuplicateReport {
    pub fn is_clean(&self) -> bool {
        self.duplicate_documents.is_empty() && self.duplicate_codes.is_empty()
    }
}
