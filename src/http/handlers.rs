use axum::{
    extract::{FromRequest, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use super::pages;
use super::AppState;
use crate::registry::errors::truncate_message;
use crate::session::{Session, SessionError};
use crate::workflows::{CheckinError, CheckinPhase, Step};

#[derive(Debug, Deserialize)]
pub struct LookupForm {
    #[serde(default)]
    pub documento: String,
}

#[derive(Debug, Deserialize)]
pub struct RegistrantForm {
    #[serde(default)]
    pub nombre: String,
    #[serde(default)]
    pub celular: String,
}

/// Body of `POST /set-codigo`, either from the scanner (JSON) or the manual form.
#[derive(Debug, Default, Deserialize)]
pub struct CodeSubmission {
    #[serde(default)]
    pub codigo: Option<serde_json::Value>,
    #[serde(default)]
    pub manual_codigo: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CodeForm {
    #[serde(default)]
    codigo: Option<String>,
    #[serde(default)]
    manual_codigo: Option<String>,
}

impl CodeSubmission {
    /// The manual entry wins when both are present
    pub fn code(&self) -> Option<String> {
        if let Some(manual) = self.manual_codigo.as_ref().filter(|m| !m.is_empty()) {
            return Some(manual.clone());
        }
        match self.codigo.as_ref()? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

impl From<CodeForm> for CodeSubmission {
    fn from(form: CodeForm) -> Self {
        Self {
            codigo: form.codigo.map(serde_json::Value::String),
            manual_codigo: form.manual_codigo,
        }
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

impl AppState {
    fn session(&self, headers: &HeaderMap) -> Session {
        self.sessions.from_headers(headers, now())
    }

    /// Attach the session cookie to a response.
    fn with_session(&self, mut response: Response, session: &Session) -> Response {
        if let Some(cookie) = self.session_cookie(session) {
            response.headers_mut().append(header::SET_COOKIE, cookie);
        }
        response
    }

    /// Cookie for `session`. A session too large for its cookie sheds notice
    /// text, then the notices, before the workflow state is given up.
    fn session_cookie(&self, session: &Session) -> Option<HeaderValue> {
        let err = match self.sessions.set_cookie(session, now()) {
            Ok(cookie) => return Some(cookie),
            Err(e) => e,
        };

        if err == SessionError::TooLarge {
            let mut shortened = session.clone();
            for flash in &mut shortened.flashes {
                flash.message = truncate_message(&flash.message);
            }
            if let Ok(cookie) = self.sessions.set_cookie(&shortened, now()) {
                warn!("Session too large for its cookie, shortened notices");
                return Some(cookie);
            }

            shortened.flashes.clear();
            if let Ok(cookie) = self.sessions.set_cookie(&shortened, now()) {
                warn!("Session too large for its cookie, dropped notices");
                return Some(cookie);
            }
        }

        warn!(error = %err, "Could not store session, resetting it");
        self.sessions.set_cookie(&Session::new(), now()).ok()
    }

    /// Redirect to the page of the phase a step ended in.
    ///
    /// `before` is the session the step started from; a failed step is
    /// recovered from it.
    fn advance(&self, before: Session, result: Result<Step, CheckinError>) -> Response {
        let (phase, session) = match result {
            Ok(step) => (step.phase, step.session),
            Err(err) => {
                let mut session = before;
                let phase = err.recover(&mut session);
                debug!(error = %err, phase = phase.as_str(), "Check-in step did not go through");
                (phase, session)
            }
        };
        self.with_session(Redirect::to(phase.route()).into_response(), &session)
    }
}

pub async fn healthz() -> &'static str {
    "ok"
}

/// GET /
pub async fn lookup_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let mut session = state.session(&headers);
    let flashes = session.take_flashes();
    let last = session.take_last_registration();

    let page = pages::lookup_page(&flashes, last.as_ref());
    state.with_session(page.into_response(), &session)
}

/// POST /
pub async fn lookup(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<LookupForm>,
) -> Response {
    let session = state.session(&headers);
    let result = state.workflow.lookup(session.clone(), &form.documento).await;
    state.advance(session, result)
}

/// GET /nuevo-registro
pub async fn new_registrant_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let mut session = state.session(&headers);
    let Some(document) = session.pending_document.clone() else {
        let before = session.clone();
        return state.advance(
            before,
            Err(CheckinError::precondition("Look up a document first.")),
        );
    };

    let flashes = session.take_flashes();
    let page = pages::new_registrant_page(&flashes, &document);
    state.with_session(page.into_response(), &session)
}

/// POST /nuevo-registro
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<RegistrantForm>,
) -> Response {
    let session = state.session(&headers);
    let result = state
        .workflow
        .register(session.clone(), &form.nombre, &form.celular)
        .await;
    state.advance(session, result)
}

/// GET /scan
pub async fn scan_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session = state.session(&headers);
    match state.workflow.require_identity(session.clone()) {
        Ok(Step { mut session, .. }) => {
            let flashes = session.take_flashes();
            let page = match &session.identity {
                Some(identity) => pages::scan_page(&flashes, identity),
                None => pages::lookup_page(&flashes, None),
            };
            state.with_session(page.into_response(), &session)
        }
        Err(err) => state.advance(session, Err(err)),
    }
}

fn wants_html(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("text/html"))
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"))
}

/// POST /set-codigo
///
/// The scanner widget posts JSON and reads `{ok}` back; the manual form is a
/// plain browser submission and gets a redirect instead.
pub async fn set_code(State(state): State<AppState>, request: Request) -> Response {
    let headers = request.headers().clone();
    let session = state.session(&headers);
    let from_form = !is_json(&headers) && wants_html(&headers);

    let submission = if is_json(&headers) {
        Json::<CodeSubmission>::from_request(request, &())
            .await
            .map(|Json(body)| body)
            .unwrap_or_default()
    } else {
        Form::<CodeForm>::from_request(request, &())
            .await
            .map(|Form(form)| CodeSubmission::from(form))
            .unwrap_or_default()
    };
    let code = submission.code().unwrap_or_default();

    match state.workflow.capture_code(session.clone(), &code) {
        Ok(step) if from_form => {
            state.with_session(Redirect::to(CheckinPhase::Confirm.route()).into_response(), &step.session)
        }
        Ok(step) => state.with_session(Json(json!({ "ok": true })).into_response(), &step.session),
        Err(err) if from_form => state.advance(session, Err(err)),
        Err(err) => {
            debug!(error = %err, "Rejected code submission");
            let body = (StatusCode::BAD_REQUEST, Json(json!({ "ok": false, "error": err.to_string() })));
            state.with_session(body.into_response(), &session)
        }
    }
}

/// GET /confirmar
pub async fn confirm_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session = state.session(&headers);
    match state.workflow.review(session.clone()) {
        Ok(Step { mut session, .. }) => {
            let flashes = session.take_flashes();
            let page = match &session.identity {
                Some(identity) => {
                    pages::confirm_page(&flashes, identity, session.detected_code.as_deref())
                }
                None => pages::lookup_page(&flashes, None),
            };
            state.with_session(page.into_response(), &session)
        }
        Err(err) => state.advance(session, Err(err)),
    }
}

/// POST /confirmar
pub async fn confirm(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session = state.session(&headers);
    let result = state.workflow.confirm(session.clone()).await;
    state.advance(session, result)
}
