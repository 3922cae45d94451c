use anyhow::{Context, Result};
use serde::Serialize;

use super::Command;
use crate::app::build_store;
use crate::cli::DoctorFormat;
use crate::config::CheckinConfig;
use crate::registry::{read_snapshot, DuplicateReport, RegistryStore};

/// Registry health: connectivity, row counts and duplicate anomalies
pub struct DoctorCommand {
    config: CheckinConfig,
    format: DoctorFormat,
}

/// What the doctor found in the registry
#[derive(Debug, Serialize)]
pub struct DoctorReport {
    pub backend: &'static str,
    pub people: usize,
    pub registrations: usize,
    pub duplicates: DuplicateReport,
}

impl DoctorReport {
    pub fn is_healthy(&self) -> bool {
        self.duplicates.is_clean()
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Registry backend: {}\n", self.backend));
        out.push_str(&format!("People rows:        {}\n", self.people));
        out.push_str(&format!("Registration rows:  {}\n", self.registrations));

        if self.duplicates.is_clean() {
            out.push_str("No duplicate registrations found.\n");
            return out;
        }
        for document in &self.duplicates.duplicate_documents {
            out.push_str(&format!("Document registered more than once: {document}\n"));
        }
        for code in &self.duplicates.duplicate_codes {
            out.push_str(&format!("Code registered more than once: {code}\n"));
        }
        out
    }
}

impl DoctorCommand {
    pub fn new(config: CheckinConfig, format: DoctorFormat) -> Self {
        Self { config, format }
    }

    pub async fn run_diagnostics(store: &dyn RegistryStore) -> Result<DoctorReport> {
        let snapshot = read_snapshot(store)
            .await
            .context("Could not read the registry")?;

        Ok(DoctorReport {
            backend: store.backend_name(),
            people: snapshot.people().len(),
            registrations: snapshot.registrations().len(),
            duplicates: snapshot.duplicate_report(),
        })
    }
}

impl Command for DoctorCommand {
    async fn execute(&self) -> Result<()> {
        let store = build_store(&self.config, false)?;
        let report = Self::run_diagnostics(store.as_ref()).await?;

        match self.format {
            DoctorFormat::Text => print!("{}", report.to_text()),
            DoctorFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        }

        // Exit with error if the registry holds duplicates
        if !report.is_healthy() {
            std::process::exit(1);
        }
        Ok(())
    }
}
