use serde::{Deserialize, Serialize};
use tracing::warn;

// Sheet header first, field-name alias second.
const TIMESTAMP: [&str; 1] = ["timestamp"];
const DOCUMENT: [&str; 2] = ["documento", "document"];
const FULL_NAME: [&str; 2] = ["nombre completo", "full_name"];
const PHONE: [&str; 2] = ["celular", "phone"];
const SCANNED_CODE: [&str; 2] = ["datos escaneados", "scanned_code"];
const ZONE: [&str; 2] = ["zona", "zone"];
const TABLE: [&str; 2] = ["mesa", "table"];

/// Header row written to an empty `base_datos` sheet
pub const PEOPLE_HEADERS: [&str; 3] = [DOCUMENT[0], FULL_NAME[0], PHONE[0]];

/// Header row written to an empty `registros` sheet (writable columns only)
pub const REGISTRATION_HEADERS: [&str; 5] = [
    TIMESTAMP[0],
    DOCUMENT[0],
    FULL_NAME[0],
    PHONE[0],
    SCANNED_CODE[0],
];

/// A person known to the registry, keyed by `document`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub document: String,
    pub full_name: String,
    pub phone: String,
}

impl Person {
    pub fn new(document: &str, full_name: &str, phone: &str) -> Self {
        Self {
            document: document.to_string(),
            full_name: full_name.to_string(),
            phone: phone.to_string(),
        }
    }

    fn columns(&self) -> [Column<'_>; 3] {
        [
            (&DOCUMENT, self.document.as_str()),
            (&FULL_NAME, self.full_name.as_str()),
            (&PHONE, self.phone.as_str()),
        ]
    }

    /// Row laid out under `header_row`, or in [`PEOPLE_HEADERS`] order when
    /// the sheet has no header yet.
    pub fn row_under(&self, header_row: &[String]) -> Vec<String> {
        arrange_row(header_row, &self.columns())
    }
}

/// A completed check-in. At most one per document and one per scanned code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub timestamp: String,
    pub document: String,
    pub full_name: String,
    pub phone: String,
    pub scanned_code: String,
    /// Seating zone filled in by staff on the sheet; never written here.
    #[serde(default)]
    pub zone: Option<String>,
    /// Table number filled in by staff on the sheet; never written here.
    #[serde(default)]
    pub table: Option<String>,
}

impl Registration {
    pub fn new(timestamp: &str, person: &Person, scanned_code: &str) -> Self {
        Self {
            timestamp: timestamp.to_string(),
            document: person.document.clone(),
            full_name: person.full_name.clone(),
            phone: person.phone.clone(),
            scanned_code: scanned_code.to_string(),
            zone: None,
            table: None,
        }
    }

    fn columns(&self) -> [Column<'_>; 5] {
        [
            (&TIMESTAMP, self.timestamp.as_str()),
            (&DOCUMENT, self.document.as_str()),
            (&FULL_NAME, self.full_name.as_str()),
            (&PHONE, self.phone.as_str()),
            (&SCANNED_CODE, self.scanned_code.as_str()),
        ]
    }

    /// Row laid out under `header_row`, or in [`REGISTRATION_HEADERS`] order
    /// when the sheet has no header yet. Staff-maintained columns stay empty.
    pub fn row_under(&self, header_row: &[String]) -> Vec<String> {
        arrange_row(header_row, &self.columns())
    }
}

/// Header names a value may sit under, and the value.
type Column<'a> = (&'static [&'static str], &'a str);

/// Place each value under its header. Values whose header is missing go
/// after the last header, in field order.
fn arrange_row(header_row: &[String], columns: &[Column<'_>]) -> Vec<String> {
    if is_blank(header_row) {
        return columns.iter().map(|(_, value)| value.to_string()).collect();
    }

    let index = HeaderIndex::new(header_row);
    let mut row = vec![String::new(); header_row.len()];
    for (names, value) in columns {
        match index.position(names) {
            Some(i) => row[i] = value.to_string(),
            None => row.push(value.to_string()),
        }
    }
    while row.last().is_some_and(|value| value.is_empty()) {
        row.pop();
    }
    row
}

/// Column layout resolved from a sheet's header row.
///
/// A missing required column makes the whole sheet read as empty, which
/// callers treat as "no data yet" rather than as an error.
#[derive(Debug)]
struct HeaderIndex {
    headers: Vec<String>,
}

impl HeaderIndex {
    fn new(header_row: &[String]) -> Self {
        Self {
            headers: header_row.iter().map(|h| h.trim().to_string()).collect(),
        }
    }

    fn position(&self, names: &[&str]) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| names.iter().any(|name| h == name))
    }

    fn require(&self, sheet: &str, names: &[&str]) -> Option<usize> {
        let found = self.position(names);
        if found.is_none() {
            warn!(
                sheet = sheet,
                column = names[0],
                "Sheet is missing a required column, treating it as empty"
            );
        }
        found
    }
}

fn cell(row: &[String], index: usize) -> String {
    row.get(index).cloned().unwrap_or_default()
}

fn optional_cell(row: &[String], index: Option<usize>) -> Option<String> {
    index
        .map(|i| cell(row, i))
        .filter(|value| !value.trim().is_empty())
}

fn is_blank(row: &[String]) -> bool {
    row.iter().all(|value| value.trim().is_empty())
}

/// Parse the `base_datos` grid (header row first) into people.
pub fn parse_people(sheet: &str, grid: &[Vec<String>]) -> Vec<Person> {
    let Some((header_row, rows)) = grid.split_first() else {
        return Vec::new();
    };
    let index = HeaderIndex::new(header_row);

    let (Some(document), Some(full_name), Some(phone)) = (
        index.require(sheet, &DOCUMENT),
        index.require(sheet, &FULL_NAME),
        index.require(sheet, &PHONE),
    ) else {
        return Vec::new();
    };

    rows.iter()
        .filter(|row| !is_blank(row))
        .map(|row| Person {
            document: cell(row, document),
            full_name: cell(row, full_name),
            phone: cell(row, phone),
        })
        .collect()
}

/// Parse the `registros` grid (header row first) into registrations.
pub fn parse_registrations(sheet: &str, grid: &[Vec<String>]) -> Vec<Registration> {
    let Some((header_row, rows)) = grid.split_first() else {
        return Vec::new();
    };
    let index = HeaderIndex::new(header_row);

    let (Some(timestamp), Some(document), Some(full_name), Some(phone), Some(code)) = (
        index.require(sheet, &TIMESTAMP),
        index.require(sheet, &DOCUMENT),
        index.require(sheet, &FULL_NAME),
        index.require(sheet, &PHONE),
        index.require(sheet, &SCANNED_CODE),
    ) else {
        return Vec::new();
    };
    let zone = index.position(&ZONE);
    let table = index.position(&TABLE);

    rows.iter()
        .filter(|row| !is_blank(row))
        .map(|row| Registration {
            timestamp: cell(row, timestamp),
            document: cell(row, document),
            full_name: cell(row, full_name),
            phone: cell(row, phone),
            scanned_code: cell(row, code),
            zone: optional_cell(row, zone),
            table: optional_cell(row, table),
        })
        .collect()
}
