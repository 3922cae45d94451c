// HTTP surface: axum router, per-request spans and graceful serving

pub mod handlers;
pub mod pages;

use anyhow::Result;
use axum::{
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tracing::{info, Instrument};

use crate::observability::create_request_span;
use crate::session::SessionCodec;
use crate::shutdown::shutdown_signal;
use crate::telemetry::generate_correlation_id;
use crate::workflows::CheckinWorkflow;

/// Shared by every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub workflow: CheckinWorkflow,
    pub sessions: SessionCodec,
}

impl AppState {
    pub fn new(workflow: CheckinWorkflow, sessions: SessionCodec) -> Self {
        Self { workflow, sessions }
    }
}

async fn trace_request(request: Request, next: Next) -> Response {
    let correlation_id = generate_correlation_id();
    let span = create_request_span(
        request.method().as_str(),
        request.uri().path(),
        &correlation_id,
    );

    async move {
        let response = next.run(request).await;
        info!(status = response.status().as_u16(), "Request completed");
        response
    }
    .instrument(span)
    .await
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::lookup_page).post(handlers::lookup))
        .route(
            "/nuevo-registro",
            get(handlers::new_registrant_page).post(handlers::register),
        )
        .route("/scan", get(handlers::scan_page))
        .route("/set-codigo", post(handlers::set_code))
        .route(
            "/confirmar",
            get(handlers::confirm_page).post(handlers::confirm),
        )
        .route("/healthz", get(handlers::healthz))
        .layer(middleware::from_fn(trace_request))
        .with_state(state)
}

/// Serve until SIGINT/SIGTERM.
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    let address = listener.local_addr()?;
    info!(%address, backend = state.workflow.store().backend_name(), "Check-in desk listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}
