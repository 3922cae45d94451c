use anyhow::{Context, Result};
use chrono::FixedOffset;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::registry::sheets::{DEFAULT_DRIVE_API_BASE, DEFAULT_SHEETS_API_BASE};
use crate::registry::SheetsLocation;

pub const CONFIG_FILE: &str = "checkin-desk.toml";
const ENV_PREFIX: &str = "CHECKIN";
const REDACTED: &str = "<redacted>";
// Session secret variables, checked in order
const SECRET_KEY_VARS: [&str; 2] = ["SECRET_KEY", "FLASK_SECRET_KEY"];

/// Main configuration structure for the check-in desk
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CheckinConfig {
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub store: StoreConfig,
    pub event: EventConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// HMAC key for the session cookie; generated per process when unset
    pub secret_key: Option<String>,
    pub cookie_name: String,
    pub max_age_minutes: u32,
    /// Only send the cookie over HTTPS
    pub secure_cookie: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            cookie_name: "checkin_session".to_string(),
            max_age_minutes: 120,
            secure_cookie: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sheets,
    Memory,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub spreadsheet_name: String,
    pub spreadsheet_id: Option<String>,
    pub people_sheet: String,
    pub registrations_sheet: String,
    /// Service account key file contents
    pub credentials_json: Option<String>,
    pub sheets_api_base: String,
    pub drive_api_base: String,
    pub request_timeout_seconds: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let location = SheetsLocation::default();
        Self {
            backend: StoreBackend::Sheets,
            spreadsheet_name: location.spreadsheet_name,
            spreadsheet_id: None,
            people_sheet: location.people_sheet,
            registrations_sheet: location.registrations_sheet,
            credentials_json: None,
            sheets_api_base: DEFAULT_SHEETS_API_BASE.to_string(),
            drive_api_base: DEFAULT_DRIVE_API_BASE.to_string(),
            request_timeout_seconds: location.request_timeout.as_secs(),
        }
    }
}

impl StoreConfig {
    pub fn sheets_location(&self) -> SheetsLocation {
        SheetsLocation {
            spreadsheet_name: self.spreadsheet_name.clone(),
            spreadsheet_id: self.spreadsheet_id.clone(),
            people_sheet: self.people_sheet.clone(),
            registrations_sheet: self.registrations_sheet.clone(),
            sheets_api_base: self.sheets_api_base.clone(),
            drive_api_base: self.drive_api_base.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_seconds),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EventConfig {
    /// Offset used for registration timestamps, e.g. "-05:00"
    pub utc_offset: String,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            utc_offset: "-05:00".to_string(),
        }
    }
}

impl EventConfig {
    pub fn offset(&self) -> Result<FixedOffset> {
        self.utc_offset
            .parse::<FixedOffset>()
            .with_context(|| format!("invalid event.utc_offset '{}'", self.utc_offset))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level, overridden by RUST_LOG
    pub log_level: String,
    /// JSON lines instead of human readable output
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: true,
        }
    }
}

impl CheckinConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. `checkin-desk.toml` in the working directory
    /// 3. Environment variables (`CHECKIN__SECTION__KEY`)
    /// 4. Deployment fallbacks (`GOOGLE_CREDENTIALS_JSON`, `SECRET_KEY` or
    ///    `FLASK_SECRET_KEY`, `PORT`)
    pub fn load() -> Result<Self> {
        let file = Path::new(CONFIG_FILE);
        Self::load_from(file.exists().then_some(file))
    }

    /// Like [`CheckinConfig::load`] with an explicit configuration file.
    pub fn load_from(file: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = file {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let mut config: CheckinConfig = builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Failed to parse configuration")?;

        config.apply_fallbacks(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Fill gaps from the plain variables a hosting platform usually sets.
    pub fn apply_fallbacks<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.store.credentials_json.is_none() {
            self.store.credentials_json = lookup("GOOGLE_CREDENTIALS_JSON");
        }
        if self.session.secret_key.is_none() {
            self.session.secret_key = SECRET_KEY_VARS.iter().find_map(|name| lookup(name));
        }
        if lookup("CHECKIN__SERVER__PORT").is_none() {
            if let Some(port) = lookup("PORT") {
                self.server.port = port
                    .parse()
                    .with_context(|| format!("invalid PORT '{port}'"))?;
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.event.offset()?;
        if self.session.cookie_name.trim().is_empty() {
            anyhow::bail!("session.cookie_name must not be empty");
        }
        if self.session.max_age_minutes == 0 {
            anyhow::bail!("session.max_age_minutes must be positive");
        }
        Ok(())
    }

    /// Copy safe to print
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.session.secret_key.is_some() {
            copy.session.secret_key = Some(REDACTED.to_string());
        }
        if copy.store.credentials_json.is_some() {
            copy.store.credentials_json = Some(REDACTED.to_string());
        }
        copy
    }

    /// Effective configuration as TOML with secrets redacted
    pub fn to_redacted_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(&self.redacted())?)
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_match_deployment() {
        let config = CheckinConfig::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.store.people_sheet, "base_datos");
        assert_eq!(config.store.registrations_sheet, "registros");
        assert_eq!(config.store.backend, StoreBackend::Sheets);
        assert_eq!(
            config.event.offset().unwrap(),
            FixedOffset::west_opt(5 * 3600).unwrap()
        );
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 8080

[store]
backend = "memory"
spreadsheet_id = "sheet-123"

[event]
utc_offset = "+01:00"
"#
        )
        .unwrap();

        let config = CheckinConfig::load_from(Some(file.path())).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.store.spreadsheet_id.as_deref(), Some("sheet-123"));
        assert_eq!(config.store.sheets_location().people_sheet, "base_datos");
    }

    #[test]
    fn test_invalid_offset_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[event]\nutc_offset = \"bogota\"").unwrap();

        assert!(CheckinConfig::load_from(Some(file.path())).is_err());
    }

    #[test]
    fn test_fallbacks_fill_only_gaps() {
        let mut config = CheckinConfig::default();
        config.session.secret_key = Some("from-file".into());
        config
            .apply_fallbacks(lookup_from(&[
                ("SECRET_KEY", "from-env"),
                ("GOOGLE_CREDENTIALS_JSON", "{}"),
                ("PORT", "9000"),
            ]))
            .unwrap();

        assert_eq!(config.session.secret_key.as_deref(), Some("from-file"));
        assert_eq!(config.store.credentials_json.as_deref(), Some("{}"));
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_legacy_secret_key_variable() {
        let mut config = CheckinConfig::default();
        config
            .apply_fallbacks(lookup_from(&[("FLASK_SECRET_KEY", "deployed-secret")]))
            .unwrap();
        assert_eq!(config.session.secret_key.as_deref(), Some("deployed-secret"));

        let mut config = CheckinConfig::default();
        config
            .apply_fallbacks(lookup_from(&[
                ("FLASK_SECRET_KEY", "deployed-secret"),
                ("SECRET_KEY", "preferred"),
            ]))
            .unwrap();
        assert_eq!(config.session.secret_key.as_deref(), Some("preferred"));
    }

    #[test]
    fn test_prefixed_port_beats_platform_port() {
        let mut config = CheckinConfig::default();
        config.server.port = 7000;
        config
            .apply_fallbacks(lookup_from(&[
                ("CHECKIN__SERVER__PORT", "7000"),
                ("PORT", "9000"),
            ]))
            .unwrap();
        assert_eq!(config.server.port, 7000);
    }

    #[test]
    fn test_show_redacts_secrets() {
        let mut config = CheckinConfig::default();
        config.session.secret_key = Some("hunter2".into());
        config.store.credentials_json = Some("{\"private_key\":\"x\"}".into());

        let shown = config.to_redacted_toml().unwrap();
        assert!(!shown.contains("hunter2"));
        assert!(!shown.contains("private_key"));
        assert!(shown.contains(REDACTED));
        assert!(shown.contains("[server]"));
    }
}
