// Checkin Desk Library - event check-in against a spreadsheet registry
// This exposes the core components for testing and integration

pub mod app;
pub mod cli;
pub mod config;
pub mod http;
pub mod observability;
pub mod registry;
pub mod session;
pub mod shutdown;
pub mod telemetry;
pub mod workflows;

// Re-export key types for easy access
pub use app::{build_state, build_store, session_codec};
pub use config::{CheckinConfig, StoreBackend};
pub use http::{build_router, serve, AppState};
pub use observability::{create_request_span, OperationTimer};
pub use registry::{
    read_snapshot, InMemoryRegistry, Person, Registration, RegistrySnapshot, RegistryStore,
    SheetsLocation, SheetsRegistry, StoreError,
};
pub use session::{Flash, FlashLevel, Session, SessionCodec};
pub use telemetry::{generate_correlation_id, init_telemetry};
pub use workflows::{CheckinError, CheckinPhase, CheckinWorkflow, ConflictKind, Step};
