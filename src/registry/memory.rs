use async_trait::async_trait;
use tokio::sync::RwLock;

use super::errors::StoreError;
use super::store::RegistryStore;
use super::types::{Person, Registration};

/// Process-local registry used for demos and tests.
///
/// Behaves like the spreadsheet: whole-table reads, row appends, no
/// uniqueness enforcement of its own.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    people: RwLock<Vec<Person>>,
    registrations: RwLock<Vec<Registration>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_people(people: Vec<Person>) -> Self {
        Self {
            people: RwLock::new(people),
            registrations: RwLock::new(Vec::new()),
        }
    }

    pub fn seeded(people: Vec<Person>, registrations: Vec<Registration>) -> Self {
        Self {
            people: RwLock::new(people),
            registrations: RwLock::new(registrations),
        }
    }

    pub async fn people_count(&self) -> usize {
        self.people.read().await.len()
    }

    pub async fn registration_count(&self) -> usize {
        self.registrations.read().await.len()
    }
}

#[async_trait]
impl RegistryStore for InMemoryRegistry {
    async fn load_people(&self) -> Result<Vec<Person>, StoreError> {
        Ok(self.people.read().await.clone())
    }

    async fn load_registrations(&self) -> Result<Vec<Registration>, StoreError> {
        Ok(self.registrations.read().await.clone())
    }

    async fn append_person(&self, person: &Person) -> Result<(), StoreError> {
        self.people.write().await.push(person.clone());
        Ok(())
    }

    async fn append_registration(&self, registration: &Registration) -> Result<(), StoreError> {
        self.registrations.write().await.push(registration.clone());
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_appends_are_visible_to_reads() {
        let registry = InMemoryRegistry::new();
        assert!(registry.load_people().await.unwrap().is_empty());

        let ana = Person::new("123", "Ana", "555");
        registry.append_person(&ana).await.unwrap();
        registry
            .append_registration(&Registration::new("2026-10-16 09:00:00", &ana, "QR1"))
            .await
            .unwrap();

        assert_eq!(registry.load_people().await.unwrap(), vec![ana]);
        assert_eq!(registry.registration_count().await, 1);
    }
}
