use async_trait::async_trait;
use tracing::debug;

use super::errors::StoreError;
use super::snapshot::RegistrySnapshot;
use super::types::{Person, Registration};
use crate::observability::OperationTimer;

/// The system of record for people and registrations.
///
/// Reads always return the whole table. An absent or malformed table reads as
/// empty; only connectivity and credential problems are errors. The store
/// offers no append-if-absent primitive, so duplicate prevention lives with the
/// caller.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait RegistryStore: Send + Sync {
    async fn load_people(&self) -> Result<Vec<Person>, StoreError>;

    async fn load_registrations(&self) -> Result<Vec<Registration>, StoreError>;

    async fn append_person(&self, person: &Person) -> Result<(), StoreError>;

    async fn append_registration(&self, registration: &Registration) -> Result<(), StoreError>;

    /// Short label for logs ("sheets", "memory")
    fn backend_name(&self) -> &'static str;
}

/// Read both tables and index them.
pub async fn read_snapshot(store: &dyn RegistryStore) -> Result<RegistrySnapshot, StoreError> {
    let timer = OperationTimer::new("registry.read_snapshot");
    let people = store.load_people().await?;
    let registrations = store.load_registrations().await?;
    timer.finish();

    debug!(
        backend = store.backend_name(),
        people = people.len(),
        registrations = registrations.len(),
        "Loaded registry snapshot"
    );
    Ok(RegistrySnapshot::new(people, registrations))
}
