use crate::domain::principal::Principal;
use crate::domain::repository::PrincipalRepository;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument, trace};

/// Process-lifetime principal store keyed by id. Clones share the same map.
#[derive(Clone)]
pub struct InMemoryPrincipalRepository {
    storage: Arc<RwLock<HashMap<String, Principal>>>,
}

impl InMemoryPrincipalRepository {
    pub fn new() -> Self {
        Self {
            storage: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn len(&self) -> usize {
        self.storage.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.storage.read().await.is_empty()
    }
}

impl Default for InMemoryPrincipalRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PrincipalRepository for InMemoryPrincipalRepository {
    #[instrument(skip_all, fields(principal_id = %principal.id, role = %principal.role))]
    async fn save(&self, principal: Principal) -> Result<Principal> {
        trace!("Acquiring write lock for principal storage");
        let mut storage = self.storage.write().await;
        storage.insert(principal.id.clone(), principal.clone());
        debug!(
            principal_id = %principal.id,
            stored = storage.len(),
            "Principal saved to memory storage"
        );
        Ok(principal)
    }

    #[instrument(skip(self))]
    async fn find_all(&self) -> Result<Vec<Principal>> {
        trace!("Acquiring read lock for principal storage");
        let storage = self.storage.read().await;
        let principals: Vec<Principal> = storage.values().cloned().collect();
        debug!(count = principals.len(), "Principals listed from storage");
        Ok(principals)
    }

    #[instrument(skip(self), fields(email = email))]
    async fn find_by_email(&self, email: &str) -> Result<Option<Principal>> {
        trace!("Acquiring read lock for principal storage");
        let storage = self.storage.read().await;
        let principal = storage.values().find(|p| p.email == email).cloned();
        match &principal {
            Some(p) => debug!(principal_id = %p.id, "Principal found by email"),
            None => trace!(email = email, "No principal with this email"),
        }
        Ok(principal)
    }

    #[instrument(skip_all, fields(principal_id = %principal.id, email = %principal.email))]
    async fn save_if_email_absent(&self, principal: Principal) -> Result<Option<Principal>> {
        trace!("Acquiring write lock for principal storage");
        let mut storage = self.storage.write().await;
        if storage.values().any(|p| p.email == principal.email) {
            debug!("Email already present, principal not saved");
            return Ok(None);
        }
        storage.insert(principal.id.clone(), principal.clone());
        debug!(stored = storage.len(), "Principal saved to memory storage");
        Ok(Some(principal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::principal::Role;
    use chrono::Utc;

    fn principal(id: &str, firstname: &str, email: &str) -> Principal {
        Principal {
            id: id.to_string(),
            role: Role::User,
            firstname: firstname.to_string(),
            lastname: "Tester".to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_save_returns_entity_unchanged() {
        let repo = InMemoryPrincipalRepository::new();
        let p = principal("p-1", "Alice", "alice@example.com");

        let saved = repo.save(p.clone()).await.unwrap();

        assert_eq!(saved, p);
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn test_save_same_entity_twice_keeps_one_entry() {
        let repo = InMemoryPrincipalRepository::new();
        let p = principal("p-2", "Bob", "bob@example.com");

        repo.save(p.clone()).await.unwrap();
        repo.save(p.clone()).await.unwrap();

        let all = repo.find_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0], p);
    }

    #[tokio::test]
    async fn test_save_overwrites_existing_id() {
        let repo = InMemoryPrincipalRepository::new();
        repo.save(principal("p-3", "First", "first@example.com"))
            .await
            .unwrap();
        repo.save(principal("p-3", "Second", "second@example.com"))
            .await
            .unwrap();

        let all = repo.find_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].firstname, "Second");
    }

    #[tokio::test]
    async fn test_find_all_on_empty_store() {
        let repo = InMemoryPrincipalRepository::new();

        assert!(repo.find_all().await.unwrap().is_empty());
        assert!(repo.is_empty().await);
    }

    #[tokio::test]
    async fn test_find_all_returns_detached_copy() {
        let repo = InMemoryPrincipalRepository::new();
        repo.save(principal("p-4", "Carol", "carol@example.com"))
            .await
            .unwrap();

        let mut snapshot = repo.find_all().await.unwrap();
        snapshot.clear();
        snapshot.push(principal("p-x", "Mallory", "m@example.com"));

        let again = repo.find_all().await.unwrap();
        assert_eq!(again.len(), 1);
        assert_eq!(again[0].id, "p-4");
    }

    #[tokio::test]
    async fn test_snapshot_unaffected_by_later_saves() {
        let repo = InMemoryPrincipalRepository::new();
        repo.save(principal("p-5", "Dan", "dan@example.com"))
            .await
            .unwrap();

        let before = repo.find_all().await.unwrap();
        repo.save(principal("p-6", "Eve", "eve@example.com"))
            .await
            .unwrap();

        assert_eq!(before.len(), 1);
        assert_eq!(repo.find_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_find_by_email_is_exact_match() {
        let repo = InMemoryPrincipalRepository::new();
        repo.save(principal("p-7", "Frank", "Frank@Example.com"))
            .await
            .unwrap();

        let found = repo.find_by_email("Frank@Example.com").await.unwrap();
        assert_eq!(found.unwrap().id, "p-7");

        let not_found = repo.find_by_email("frank@example.com").await.unwrap();
        assert!(not_found.is_none());
    }

    #[tokio::test]
    async fn test_save_if_email_absent() {
        let repo = InMemoryPrincipalRepository::new();

        let first = repo
            .save_if_email_absent(principal("p-8", "Gina", "gina@example.com"))
            .await
            .unwrap();
        assert_eq!(first.unwrap().id, "p-8");

        let second = repo
            .save_if_email_absent(principal("p-9", "Gina", "gina@example.com"))
            .await
            .unwrap();
        assert!(second.is_none());
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_writes() {
        let repo = InMemoryPrincipalRepository::new();

        let handles: Vec<_> = (0..10)
            .map(|i| {
                let repo_clone = repo.clone();
                let p = principal(
                    &format!("p-{}", i),
                    &format!("Name{}", i),
                    &format!("user{}@example.com", i),
                );
                tokio::spawn(async move { repo_clone.save(p).await })
            })
            .collect();

        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        assert_eq!(repo.find_all().await.unwrap().len(), 10);
    }
}
