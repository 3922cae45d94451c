use axum::http::{header, HeaderMap, HeaderValue};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use tracing::debug;

use super::state::Session;

type HmacSha256 = Hmac<Sha256>;
const TOKEN_VERSION_V1: &str = "v1";
// Browsers drop cookies above 4096 bytes
const MAX_TOKEN_LEN: usize = 4000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("session token is malformed: {0}")]
    Malformed(String),
    #[error("unsupported session token version")]
    UnsupportedVersion,
    #[error("session token signature mismatch")]
    BadSignature,
    #[error("session token expired")]
    Expired,
    #[error("session token exceeds {MAX_TOKEN_LEN} bytes")]
    TooLarge,
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenPayload {
    expires_at: i64,
    session: Session,
}

/// Signs sessions into a cookie value and verifies them on the way back.
///
/// Format: `v1.<base64url(json)>.<base64url(hmac-sha256)>`. The expiry is
/// inside the signed payload, so the cookie's own Max-Age is advisory only.
#[derive(Clone)]
pub struct SessionCodec {
    secret: Vec<u8>,
    cookie_name: String,
    max_age_secs: i64,
    secure: bool,
}

impl std::fmt::Debug for SessionCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCodec")
            .field("cookie_name", &self.cookie_name)
            .field("max_age_secs", &self.max_age_secs)
            .field("secure", &self.secure)
            .finish_non_exhaustive()
    }
}

impl SessionCodec {
    pub fn new(secret: &[u8], cookie_name: &str, max_age_secs: i64, secure: bool) -> Self {
        Self {
            secret: secret.to_vec(),
            cookie_name: cookie_name.to_string(),
            max_age_secs,
            secure,
        }
    }

    fn mac(&self) -> Result<HmacSha256, SessionError> {
        HmacSha256::new_from_slice(&self.secret).map_err(|e| SessionError::Malformed(e.to_string()))
    }

    pub fn encode(&self, session: &Session, now: i64) -> Result<String, SessionError> {
        let payload = TokenPayload {
            expires_at: now + self.max_age_secs,
            session: session.clone(),
        };
        let payload_bytes =
            serde_json::to_vec(&payload).map_err(|e| SessionError::Malformed(e.to_string()))?;
        let payload_part = URL_SAFE_NO_PAD.encode(payload_bytes);

        let mut mac = self.mac()?;
        mac.update(payload_part.as_bytes());
        let sig_part = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        let token = format!("{TOKEN_VERSION_V1}.{payload_part}.{sig_part}");
        if token.len() > MAX_TOKEN_LEN {
            return Err(SessionError::TooLarge);
        }
        Ok(token)
    }

    pub fn decode(&self, token: &str, now: i64) -> Result<Session, SessionError> {
        if token.len() > MAX_TOKEN_LEN {
            return Err(SessionError::TooLarge);
        }
        let mut parts = token.split('.');
        let (Some(version), Some(payload_part), Some(sig_part), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(SessionError::Malformed("expected three parts".to_string()));
        };
        if version != TOKEN_VERSION_V1 {
            return Err(SessionError::UnsupportedVersion);
        }

        let signature = URL_SAFE_NO_PAD
            .decode(sig_part)
            .map_err(|e| SessionError::Malformed(e.to_string()))?;
        let mut mac = self.mac()?;
        mac.update(payload_part.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| SessionError::BadSignature)?;

        let payload_bytes = URL_SAFE_NO_PAD
            .decode(payload_part)
            .map_err(|e| SessionError::Malformed(e.to_string()))?;
        let payload: TokenPayload = serde_json::from_slice(&payload_bytes)
            .map_err(|e| SessionError::Malformed(e.to_string()))?;
        if payload.expires_at <= now {
            return Err(SessionError::Expired);
        }
        Ok(payload.session)
    }

    /// Session carried by the request, or a fresh one.
    ///
    /// A bad cookie is never an error for the visitor: they just start over.
    pub fn from_headers(&self, headers: &HeaderMap, now: i64) -> Session {
        let Some(token) = cookie_value(headers, &self.cookie_name) else {
            return Session::new();
        };
        match self.decode(token, now) {
            Ok(session) => session,
            Err(e) => {
                debug!(error = %e, "Discarding session cookie");
                Session::new()
            }
        }
    }

    /// `Set-Cookie` header carrying the session.
    pub fn set_cookie(&self, session: &Session, now: i64) -> Result<HeaderValue, SessionError> {
        let token = self.encode(session, now)?;
        let mut cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            self.cookie_name, token, self.max_age_secs
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie).map_err(|e| SessionError::Malformed(e.to_string()))
    }
}

/// Find a cookie by name across all `Cookie` headers.
fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim())
}
