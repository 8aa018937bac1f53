//! Core module containing fundamental traits and types for the crate

pub mod entity;
pub mod error;
pub mod query;
pub mod service;

pub use entity::{Entity, EntityId};
pub use error::{ConfigError, ErrorKind, ErrorResponse, GatewayError};
pub use query::ListQuery;
pub use service::{BulkDeleteReport, DataService};
