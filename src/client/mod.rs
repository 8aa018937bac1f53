//! Typed per-entity API clients built on the request gateway

pub mod retry;

pub use retry::RetryPolicy;

use crate::config::RetryConfig;
use crate::core::entity::{Entity, EntityId};
use crate::core::error::GatewayError;
use crate::core::query::ListQuery;
use crate::core::service::{BulkDeleteReport, DataService};
use crate::gateway::transport::HttpMethod;
use crate::gateway::{RequestGateway, RequestOptions};
use async_trait::async_trait;
use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::marker::PhantomData;

/// REST client for one entity type
///
/// Reads go through [`RequestGateway::get_deduped`], so two screens asking
/// for the same page at once cost one request. Reads and mutations each get
/// their own [`RetryPolicy`].
pub struct ResourceClient<T: Entity> {
    gateway: RequestGateway,
    retry: RetryConfig,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Clone for ResourceClient<T> {
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
            retry: self.retry.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> ResourceClient<T> {
    pub fn new(gateway: RequestGateway) -> Self {
        Self::with_retry(gateway, RetryConfig::default())
    }

    pub fn with_retry(gateway: RequestGateway, retry: RetryConfig) -> Self {
        Self {
            gateway,
            retry,
            _entity: PhantomData,
        }
    }

    pub fn gateway(&self) -> &RequestGateway {
        &self.gateway
    }

    /// Abort every in-flight request for this resource (e.g. on navigation),
    /// including calls waiting out a retry delay
    pub fn cancel_pending(&self) -> usize {
        self.gateway.cancel_by_pattern(&T::collection_path())
    }

    async fn read<R: DeserializeOwned>(&self, url: String) -> Result<R, GatewayError> {
        let value = self
            .retry
            .reads
            .run_with_backoff(
                &url,
                || self.gateway.get_deduped(&url, RequestOptions::new()),
                |delay| self.gateway.backoff(&url, delay),
            )
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn mutate(
        &self,
        method: HttpMethod,
        url: String,
        body: Option<Value>,
    ) -> Result<Value, GatewayError> {
        let label = format!("{} {}", method, url);
        self.retry
            .mutations
            .run_with_backoff(
                &label,
                || {
                    let mut options = RequestOptions::new();
                    options.body = body.clone();
                    self.gateway.request(method, &url, options)
                },
                |delay| self.gateway.backoff(&label, delay),
            )
            .await
    }
}

#[async_trait]
impl<T: Entity> DataService<T> for ResourceClient<T> {
    async fn list(&self, query: &ListQuery) -> Result<Vec<T>, GatewayError> {
        self.read(query.apply_to(&T::collection_path())).await
    }

    async fn get(&self, id: &EntityId) -> Result<T, GatewayError> {
        self.read(T::item_path(id)).await
    }

    async fn create(&self, draft: Value) -> Result<T, GatewayError> {
        let created = self
            .mutate(HttpMethod::Post, T::collection_path(), Some(draft))
            .await?;
        Ok(serde_json::from_value(created)?)
    }

    async fn update(&self, id: &EntityId, entity: &T) -> Result<T, GatewayError> {
        let body = serde_json::to_value(entity)?;
        let updated = self
            .mutate(HttpMethod::Put, T::item_path(id), Some(body))
            .await?;
        Ok(serde_json::from_value(updated)?)
    }

    async fn delete(&self, id: &EntityId) -> Result<(), GatewayError> {
        self.mutate(HttpMethod::Delete, T::item_path(id), None)
            .await
            .map(|_| ())
    }

    async fn delete_many(&self, ids: Vec<EntityId>) -> BulkDeleteReport {
        let outcomes = join_all(ids.into_iter().map(|id| async move {
            let result = self.delete(&id).await;
            (id, result)
        }))
        .await;

        let mut report = BulkDeleteReport::default();
        for (id, result) in outcomes {
            match result {
                Ok(()) => report.deleted.push(id),
                Err(e) => report.failed.push((id, e)),
            }
        }

        tracing::info!(
            resource = T::resource_name(),
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            "Bulk delete finished"
        );
        report
    }
}
