//! Service trait for entity CRUD operations

use crate::core::entity::{Entity, EntityId};
use crate::core::error::GatewayError;
use crate::core::query::ListQuery;
use async_trait::async_trait;
use serde_json::Value;

/// Outcome of deleting several records one request at a time
#[derive(Debug, Clone, Default)]
pub struct BulkDeleteReport {
    /// Ids whose DELETE succeeded
    pub deleted: Vec<EntityId>,

    /// Ids whose DELETE failed, with the reason
    pub failed: Vec<(EntityId, GatewayError)>,
}

impl BulkDeleteReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.deleted.len() + self.failed.len()
    }
}

/// Service trait for managing records of one entity type
///
/// List screens are written against this trait so they can run over the
/// live backend or the local fallback data alike.
#[async_trait]
pub trait DataService<T: Entity>: Send + Sync {
    /// List records, optionally paginated and filtered
    async fn list(&self, query: &ListQuery) -> Result<Vec<T>, GatewayError>;

    /// Get a record by ID
    async fn get(&self, id: &EntityId) -> Result<T, GatewayError>;

    /// Create a record from a draft; the backend assigns the id
    async fn create(&self, draft: Value) -> Result<T, GatewayError>;

    /// Replace an existing record
    async fn update(&self, id: &EntityId, entity: &T) -> Result<T, GatewayError>;

    /// Delete a record
    async fn delete(&self, id: &EntityId) -> Result<(), GatewayError>;

    /// Delete several records, tracking each outcome separately
    async fn delete_many(&self, ids: Vec<EntityId>) -> BulkDeleteReport;
}
