//! # crudkit
//!
//! The non-UI core of a CRUD demo over a REST placeholder backend (users,
//! posts, todos, comments, photos and calendar entries).
//!
//! ## Features
//!
//! - **Selection State**: [`SelectionStore`](selection::SelectionStore) tracks checked rows per list screen, with select-all and indeterminate queries
//! - **Request Gateway**: Timeout-bounded, cancellable requests with an abort registry
//! - **De-duplication**: Identical concurrent reads share one underlying request
//! - **Typed Clients**: One [`ResourceClient`](client::ResourceClient) per entity, with parallel bulk delete
//! - **Pluggable Transport**: `reqwest` over HTTP, or local JSON data in memory
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use crudkit::prelude::*;
//!
//! let transport = Arc::new(ReqwestTransport::new(DEFAULT_BASE_URL));
//! let gateway = RequestGateway::new(transport);
//! let todos = ResourceClient::<Todo>::new(gateway.clone());
//!
//! let page = todos.list(&ListQuery::new().page(1).limit(10)).await?;
//! let visible: Vec<EntityId> = page.iter().map(|t| t.id()).collect();
//!
//! let mut selection = SelectionStore::new();
//! selection.toggle_all(&visible);
//! let report = todos.delete_many(selection.selected_ids()).await;
//! selection.clear();
//!
//! // Leaving the screen
//! todos.cancel_pending();
//! ```

pub mod client;
pub mod config;
pub mod core;
pub mod entities;
pub mod gateway;
pub mod selection;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core Traits ===
    pub use crate::core::{
        BulkDeleteReport, ConfigError, DataService, Entity, EntityId, ErrorKind, ErrorResponse,
        GatewayError, ListQuery,
    };

    // === Entities ===
    pub use crate::entities::{CalendarEvent, Comment, Photo, Post, Todo, User};
    pub use crate::impl_entity;

    // === Selection ===
    pub use crate::selection::SelectionStore;

    // === Gateway ===
    pub use crate::gateway::transport::{
        HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, Transport, TransportError,
    };
    pub use crate::gateway::{DEFAULT_TIMEOUT, RequestGateway, RequestOptions, RequestState};

    // === Clients ===
    pub use crate::client::{ResourceClient, RetryPolicy};

    // === Storage ===
    pub use crate::storage::InMemoryTransport;

    // === Config ===
    pub use crate::config::{ClientConfig, DEFAULT_BASE_URL, EntityConfig, RetryConfig};

    // === External dependencies ===
    pub use async_trait::async_trait;
    pub use serde::{Deserialize, Serialize};
    pub use std::sync::Arc;
}
