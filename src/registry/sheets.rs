use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::auth::AccessTokenProvider;
use super::errors::{truncate_message, StoreError};
use super::store::RegistryStore;
use super::types::{
    parse_people, parse_registrations, Person, Registration, PEOPLE_HEADERS,
    REGISTRATION_HEADERS,
};
use crate::observability::OperationTimer;

pub const DEFAULT_SHEETS_API_BASE: &str = "https://sheets.googleapis.com";
pub const DEFAULT_DRIVE_API_BASE: &str = "https://www.googleapis.com";
const SPREADSHEET_MIME_TYPE: &str = "application/vnd.google-apps.spreadsheet";

/// Where the registry lives and how to reach it.
#[derive(Debug, Clone)]
pub struct SheetsLocation {
    pub spreadsheet_name: String,
    /// Skips name resolution through Drive when set
    pub spreadsheet_id: Option<String>,
    pub people_sheet: String,
    pub registrations_sheet: String,
    pub sheets_api_base: String,
    pub drive_api_base: String,
    pub request_timeout: Duration,
}

impl Default for SheetsLocation {
    fn default() -> Self {
        Self {
            spreadsheet_name: "FormularioEscaneo".to_string(),
            spreadsheet_id: None,
            people_sheet: "base_datos".to_string(),
            registrations_sheet: "registros".to_string(),
            sheets_api_base: DEFAULT_SHEETS_API_BASE.to_string(),
            drive_api_base: DEFAULT_DRIVE_API_BASE.to_string(),
            request_timeout: Duration::from_secs(15),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Serialize)]
struct AppendBody<'a> {
    values: &'a [Vec<String>],
}

#[derive(Debug, Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
}

/// Registry Store backed by a Google spreadsheet with two worksheets.
pub struct SheetsRegistry {
    location: SheetsLocation,
    http_client: reqwest::Client,
    tokens: Arc<dyn AccessTokenProvider>,
    spreadsheet_id: OnceCell<String>,
}

impl std::fmt::Debug for SheetsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetsRegistry")
            .field("location", &self.location)
            .field("spreadsheet_id", &self.spreadsheet_id.get())
            .finish()
    }
}

impl SheetsRegistry {
    pub fn new(
        location: SheetsLocation,
        http_client: reqwest::Client,
        tokens: Arc<dyn AccessTokenProvider>,
    ) -> Self {
        let spreadsheet_id = match &location.spreadsheet_id {
            Some(id) => OnceCell::new_with(Some(id.clone())),
            None => OnceCell::new(),
        };

        Self {
            location,
            http_client,
            tokens,
            spreadsheet_id,
        }
    }

    /// Resolve the spreadsheet id once per process.
    async fn spreadsheet_id(&self) -> Result<&str, StoreError> {
        self.spreadsheet_id
            .get_or_try_init(|| self.find_spreadsheet_by_name())
            .await
            .map(String::as_str)
    }

    async fn find_spreadsheet_by_name(&self) -> Result<String, StoreError> {
        let name = &self.location.spreadsheet_name;
        let query = format!(
            "name = '{}' and mimeType = '{}' and trashed = false",
            name.replace('\'', "\\'"),
            SPREADSHEET_MIME_TYPE
        );
        let url = format!(
            "{}/drive/v3/files",
            self.location.drive_api_base.trim_end_matches('/')
        );

        let token = self.tokens.access_token().await?;
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(token)
            .query(&[("q", query.as_str()), ("fields", "files(id,name)")])
            .timeout(self.location.request_timeout)
            .send()
            .await?;
        let listing: DriveFileList = Self::check(response).await?.json().await?;

        let file = listing
            .files
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::SpreadsheetNotFound(name.clone()))?;
        info!(spreadsheet = %name, id = %file.id, "Resolved spreadsheet by name");
        Ok(file.id)
    }

    fn values_url(&self, spreadsheet_id: &str, range: &str) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}",
            self.location.sheets_api_base.trim_end_matches('/'),
            spreadsheet_id,
            range
        )
    }

    /// Map non-success statuses onto store errors
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = truncate_message(&response.text().await.unwrap_or_default());
        match status.as_u16() {
            401 | 403 => Err(StoreError::Unauthorized(message)),
            code => Err(StoreError::Api {
                status: code,
                message,
            }),
        }
    }

    /// Read every row of a worksheet as strings.
    ///
    /// A range error (the worksheet does not exist) reads as an empty grid.
    async fn read_grid(&self, sheet: &str) -> Result<Vec<Vec<String>>, StoreError> {
        let spreadsheet_id = self.spreadsheet_id().await?;
        let token = self.tokens.access_token().await?;
        let response = self
            .http_client
            .get(self.values_url(spreadsheet_id, sheet))
            .bearer_auth(token)
            .timeout(self.location.request_timeout)
            .send()
            .await?;

        let range: ValueRange = match Self::check(response).await {
            Ok(response) => response.json().await?,
            Err(StoreError::Api { status: 400, message }) => {
                warn!(sheet = sheet, error = %message, "Worksheet unreadable, treating it as empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        Ok(range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect())
    }

    async fn append_rows(&self, sheet: &str, rows: &[Vec<String>]) -> Result<(), StoreError> {
        let spreadsheet_id = self.spreadsheet_id().await?;
        let token = self.tokens.access_token().await?;
        let url = format!("{}:append", self.values_url(spreadsheet_id, sheet));

        let response = self
            .http_client
            .post(url)
            .bearer_auth(token)
            .query(&[
                ("valueInputOption", "RAW"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&AppendBody { values: rows })
            .timeout(self.location.request_timeout)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// Append one record laid out under the worksheet's header row. An empty
    /// worksheet gets `headers` first so the record is not mistaken for
    /// headers on the next read.
    async fn append_record<F>(
        &self,
        sheet: &str,
        headers: &[&str],
        row_under: F,
    ) -> Result<(), StoreError>
    where
        F: FnOnce(&[String]) -> Vec<String> + Send,
    {
        let header_row = self
            .read_grid(&format!("{sheet}!1:1"))
            .await?
            .into_iter()
            .next()
            .unwrap_or_default();

        let mut rows = Vec::with_capacity(2);
        if header_row.iter().all(|c| c.trim().is_empty()) {
            debug!(sheet = sheet, "Worksheet has no header row, writing one");
            rows.push(headers.iter().map(|h| h.to_string()).collect());
        }
        rows.push(row_under(&header_row));
        self.append_rows(sheet, &rows).await
    }
}

fn cell_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[async_trait]
impl RegistryStore for SheetsRegistry {
    async fn load_people(&self) -> Result<Vec<Person>, StoreError> {
        let sheet = &self.location.people_sheet;
        let grid = self.read_grid(sheet).await?;
        Ok(parse_people(sheet, &grid))
    }

    async fn load_registrations(&self) -> Result<Vec<Registration>, StoreError> {
        let sheet = &self.location.registrations_sheet;
        let grid = self.read_grid(sheet).await?;
        Ok(parse_registrations(sheet, &grid))
    }

    async fn append_person(&self, person: &Person) -> Result<(), StoreError> {
        let timer = OperationTimer::new("registry.append_person");
        self.append_record(&self.location.people_sheet, &PEOPLE_HEADERS, |header_row| {
            person.row_under(header_row)
        })
        .await?;
        timer.finish();
        info!(document = %person.document, "Appended person row");
        Ok(())
    }

    async fn append_registration(&self, registration: &Registration) -> Result<(), StoreError> {
        let timer = OperationTimer::new("registry.append_registration");
        self.append_record(
            &self.location.registrations_sheet,
            &REGISTRATION_HEADERS,
            |header_row| registration.row_under(header_row),
        )
        .await?;
        timer.finish();
        info!(
            document = %registration.document,
            code = %registration.scanned_code,
            "Appended registration row"
        );
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "sheets"
    }
}
