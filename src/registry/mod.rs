// Registry Store: the spreadsheet acting as the system of record

pub mod auth;
pub mod errors;
pub mod memory;
pub mod sheets;
pub mod snapshot;
pub mod store;
pub mod types;

pub use auth::{
    AccessTokenProvider, ServiceAccountCredentials, ServiceAccountTokenProvider,
    StaticTokenProvider,
};
pub use errors::StoreError;
pub use memory::InMemoryRegistry;
pub use sheets::{SheetsLocation, SheetsRegistry};
pub use snapshot::{DuplicateReport, RegistrySnapshot};
pub use store::{read_snapshot, RegistryStore};
pub use types::{Person, Registration};

#[cfg(any(test, feature = "testing"))]
pub use store::MockRegistryStore;
