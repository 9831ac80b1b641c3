//! Abstract repository contracts (spec §6) plus `dashmap`-backed in-memory
//! reference implementations, sufficient to run and test the engine
//! without a real persistence backend (persistence itself stays a
//! non-goal — these are fakes, not a storage layer).

use crate::model::{Response, Service};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;

/// `ServiceRepository.findByNameAndVersion`.
#[async_trait]
pub trait ServiceRepository: Send + Sync {
    async fn find_by_name_and_version(&self, name: &str, version: &str) -> Option<Service>;
}

/// `ResponseRepository.*`.
#[async_trait]
pub trait ResponseRepository: Send + Sync {
    async fn find_by_operation_id_and_dispatch_criteria(
        &self,
        operation_id: &str,
        criteria: &str,
    ) -> Vec<Response>;

    async fn find_by_operation_id_and_name(&self, operation_id: &str, name: &str) -> Vec<Response>;

    async fn find_by_operation_id(&self, operation_id: &str) -> Vec<Response>;
}

/// `ServiceStateRepository` — key/value store keyed by `(serviceId, key)`.
#[async_trait]
pub trait ServiceStateRepository: Send + Sync {
    async fn get(&self, service_id: &str, key: &str) -> Option<serde_json::Value>;
    async fn put(&self, service_id: &str, key: &str, value: serde_json::Value);
    /// Full key/value snapshot for one service, consumed by the `SCRIPT`
    /// evaluator's `store` binding.
    async fn snapshot(&self, service_id: &str) -> HashMap<String, serde_json::Value>;
}

/// In-memory [`ServiceRepository`] keyed by `"<name>\u{0}<version>"`.
#[derive(Default)]
pub struct InMemoryServiceRepository {
    services: DashMap<String, Service>,
}

impl InMemoryServiceRepository {
    pub fn insert(&self, service: Service) {
        let key = format!("{}\u{0}{}", service.name, service.version);
        self.services.insert(key, service);
    }
}

#[async_trait]
impl ServiceRepository for InMemoryServiceRepository {
    async fn find_by_name_and_version(&self, name: &str, version: &str) -> Option<Service> {
        let key = format!("{name}\u{0}{version}");
        self.services.get(&key).map(|r| r.clone())
    }
}

/// In-memory [`ResponseRepository`] keyed by operation id.
#[derive(Default)]
pub struct InMemoryResponseRepository {
    by_operation: DashMap<String, Vec<Response>>,
}

impl InMemoryResponseRepository {
    pub fn insert(&self, response: Response) {
        self.by_operation
            .entry(response.operation_id.clone())
            .or_default()
            .push(response);
    }
}

#[async_trait]
impl ResponseRepository for InMemoryResponseRepository {
    async fn find_by_operation_id_and_dispatch_criteria(
        &self,
        operation_id: &str,
        criteria: &str,
    ) -> Vec<Response> {
        self.by_operation
            .get(operation_id)
            .map(|responses| {
                responses
                    .iter()
                    .filter(|r| r.dispatch_criteria.as_deref() == Some(criteria))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    async fn find_by_operation_id_and_name(&self, operation_id: &str, name: &str) -> Vec<Response> {
        self.by_operation
            .get(operation_id)
            .map(|responses| {
                responses
                    .iter()
                    .filter(|r| r.name == name)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    async fn find_by_operation_id(&self, operation_id: &str) -> Vec<Response> {
        self.by_operation
            .get(operation_id)
            .map(|responses| responses.clone())
            .unwrap_or_default()
    }
}

/// In-memory [`ServiceStateRepository`], safe for concurrent access without
/// external locking.
#[derive(Default)]
pub struct InMemoryServiceStateRepository {
    state: DashMap<(String, String), serde_json::Value>,
}

#[async_trait]
impl ServiceStateRepository for InMemoryServiceStateRepository {
    async fn get(&self, service_id: &str, key: &str) -> Option<serde_json::Value> {
        self.state
            .get(&(service_id.to_string(), key.to_string()))
            .map(|r| r.clone())
    }

    async fn put(&self, service_id: &str, key: &str, value: serde_json::Value) {
        self.state
            .insert((service_id.to_string(), key.to_string()), value);
    }

    async fn snapshot(&self, service_id: &str) -> HashMap<String, serde_json::Value> {
        self.state
            .iter()
            .filter(|entry| entry.key().0 == service_id)
            .map(|entry| (entry.key().1.clone(), entry.value().clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Operation;

    fn sample_service() -> Service {
        Service {
            id: "svc-1".to_string(),
            name: "Pets".to_string(),
            version: "1.0".to_string(),
            operations: vec![Operation {
                name: "GET /pets/{id}".to_string(),
                method: "GET".to_string(),
                resource_paths: vec!["/pets/1".to_string()],
                dispatcher: Some("SEQUENCE".to_string()),
                dispatcher_rules: Some("id".to_string()),
                parameter_constraints: vec![],
                default_delay: None,
                id_path: None,
                fallback: None,
                proxy_fallback: None,
            }],
        }
    }

    #[tokio::test]
    async fn finds_service_by_name_and_version() {
        let repo = InMemoryServiceRepository::default();
        repo.insert(sample_service());
        assert!(repo.find_by_name_and_version("Pets", "1.0").await.is_some());
        assert!(repo.find_by_name_and_version("Pets", "2.0").await.is_none());
    }

    #[tokio::test]
    async fn state_repository_round_trips_per_service() {
        let repo = InMemoryServiceStateRepository::default();
        repo.put("svc-1", "counter", serde_json::json!(1)).await;
        repo.put("svc-2", "counter", serde_json::json!(99)).await;
        assert_eq!(repo.get("svc-1", "counter").await, Some(serde_json::json!(1)));
        let snap = repo.snapshot("svc-1").await;
        assert_eq!(snap.get("counter"), Some(&serde_json::json!(1)));
        assert_eq!(snap.len(), 1);
    }
}
