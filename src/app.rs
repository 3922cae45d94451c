use anyhow::{Context, Result};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::{CheckinConfig, StoreBackend};
use crate::http::AppState;
use crate::registry::{
    InMemoryRegistry, RegistryStore, ServiceAccountTokenProvider, SheetsRegistry,
};
use crate::session::SessionCodec;
use crate::workflows::CheckinWorkflow;

const GENERATED_SECRET_LEN: usize = 32;

/// Open the configured Registry Store.
///
/// `force_memory` overrides the configured backend (`serve --memory`).
pub fn build_store(config: &CheckinConfig, force_memory: bool) -> Result<Arc<dyn RegistryStore>> {
    let backend = if force_memory {
        StoreBackend::Memory
    } else {
        config.store.backend
    };

    match backend {
        StoreBackend::Memory => {
            warn!("Using the in-memory registry; nothing will be persisted");
            Ok(Arc::new(InMemoryRegistry::new()))
        }
        StoreBackend::Sheets => {
            let raw = config.store.credentials_json.as_deref().unwrap_or_default();
            let http_client = reqwest::Client::builder()
                .timeout(Duration::from_secs(config.store.request_timeout_seconds))
                .build()
                .context("Failed to build HTTP client")?;

            // Bad credentials are reported per request, never at startup
            let tokens = ServiceAccountTokenProvider::from_json(raw, http_client.clone());
            match tokens.credentials() {
                Ok(credentials) => info!(
                    client_email = %credentials.client_email,
                    spreadsheet = %config.store.spreadsheet_name,
                    "Using Google Sheets registry"
                ),
                Err(e) => warn!(
                    error = %e,
                    spreadsheet = %config.store.spreadsheet_name,
                    "Spreadsheet credentials unusable; registry calls will fail until they are fixed"
                ),
            }

            Ok(Arc::new(SheetsRegistry::new(
                config.store.sheets_location(),
                http_client,
                Arc::new(tokens),
            )))
        }
    }
}

/// Session signer from configuration, with a per-process key when none is set.
pub fn session_codec(config: &CheckinConfig) -> SessionCodec {
    let session = &config.session;
    let secret = match session.secret_key.as_deref().filter(|s| !s.is_empty()) {
        Some(secret) => secret.as_bytes().to_vec(),
        None => {
            warn!("No session secret configured; generated a random one, sessions will not survive a restart");
            let mut key = [0u8; GENERATED_SECRET_LEN];
            rand::rng().fill(&mut key);
            key.to_vec()
        }
    };

    SessionCodec::new(
        &secret,
        &session.cookie_name,
        i64::from(session.max_age_minutes) * 60,
        session.secure_cookie,
    )
}

/// Everything the router needs.
pub fn build_state(config: &CheckinConfig, store: Arc<dyn RegistryStore>) -> Result<AppState> {
    let workflow = CheckinWorkflow::new(store, config.event.offset()?);
    Ok(AppState::new(workflow, session_codec(config)))
}
