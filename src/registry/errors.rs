use thiserror::Error;

/// Longest error body kept from a store response. Store errors end up in
/// session notices, which live in a size-limited cookie.
pub const MAX_ERROR_MESSAGE_CHARS: usize = 200;

/// Trim a response body down to something fit for a notice.
pub fn truncate_message(body: &str) -> String {
    let body = body.trim();
    match body.char_indices().nth(MAX_ERROR_MESSAGE_CHARS) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

/// Failures talking to the Registry Store.
///
/// Every variant belongs to the same user-facing class: the store could not be
/// reached or refused us. Callers surface these as danger notices and never
/// crash the request.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("registry store unreachable: {0}")]
    Unavailable(String),

    #[error("registry store rejected our credentials: {0}")]
    Unauthorized(String),

    #[error("service account credentials are missing or invalid: {0}")]
    Credentials(String),

    #[error("spreadsheet '{0}' not found or not shared with the service account")]
    SpreadsheetNotFound(String),

    #[error("registry store returned {status}: {message}")]
    Api { status: u16, message: String },
}

impl StoreError {
    /// True when retrying later could succeed without operator action.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Unavailable(_) => true,
            StoreError::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) if status.as_u16() == 401 || status.as_u16() == 403 => {
                StoreError::Unauthorized(err.to_string())
            }
            Some(status) => StoreError::Api {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => StoreError::Unavailable(err.to_string()),
        }
    }
}
