//! In-memory REST backend serving local JSON data
//!
//! Used as the offline fallback for the CRUD screens and as a backend for
//! tests. It speaks the same contract as the placeholder API:
//! `GET /{entity}`, `GET /{entity}/{id}`, `POST /{entity}`,
//! `PUT|PATCH /{entity}/{id}`, `DELETE /{entity}/{id}`.

use crate::gateway::transport::{HttpMethod, HttpRequest, HttpResponse, Transport, TransportError};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use url::Url;

const LOCAL_ORIGIN: &str = "http://localhost/";

/// Default page size when `_page` is given without `_limit`
const DEFAULT_PAGE_SIZE: usize = 10;

/// In-memory transport implementation
///
/// Collections are JSON arrays keyed by resource name. Uses RwLock for
/// thread-safe access; clones share the same data.
#[derive(Clone, Default)]
pub struct InMemoryTransport {
    collections: Arc<RwLock<HashMap<String, Vec<Value>>>>,
    latency: Option<Duration>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a document shaped like `{ "users": [...], "posts": [...] }`
    pub fn from_json_str(json: &str) -> Result<Self> {
        let document: Value = serde_json::from_str(json).context("invalid fallback data")?;
        let Value::Object(document) = document else {
            return Err(anyhow!("fallback data must be a JSON object of collections"));
        };

        let transport = Self::new();
        for (name, records) in document {
            let Value::Array(records) = records else {
                return Err(anyhow!("collection '{}' is not an array", name));
            };
            transport.insert_collection(&name, records)?;
        }
        Ok(transport)
    }

    pub fn from_json_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read fallback data from {}", path))?;
        Self::from_json_str(&content)
    }

    /// Delay every response, to exercise timeouts and cancellation
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn insert_collection(&self, name: &str, records: Vec<Value>) -> Result<()> {
        let mut collections = self
            .collections
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        collections.insert(name.to_string(), records);

        Ok(())
    }

    /// Current records of a collection
    pub fn records(&self, name: &str) -> Result<Vec<Value>> {
        let collections = self
            .collections
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(collections.get(name).cloned().unwrap_or_default())
    }

    fn handle(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let (path, query) = split_url(&request.url)
            .map_err(|e| TransportError::Other(format!("invalid url '{}': {}", request.url, e)))?;
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let mut collections = self
            .collections
            .write()
            .map_err(|e| TransportError::Other(format!("Failed to acquire write lock: {}", e)))?;

        let response = match (request.method, segments.as_slice()) {
            (HttpMethod::Get, [resource]) => match collections.get(*resource) {
                Some(records) => HttpResponse::json(200, &Value::Array(list(records, &query))),
                None => not_found(),
            },
            (HttpMethod::Get, [resource, id]) => {
                match collections
                    .get(*resource)
                    .and_then(|records| records.iter().find(|r| id_matches(r, id)))
                {
                    Some(record) => HttpResponse::json(200, record),
                    None => not_found(),
                }
            }
            (HttpMethod::Post, [resource]) => {
                let records = collections.entry(resource.to_string()).or_default();
                let mut record = body_object(request);
                record.insert("id".to_string(), json!(next_id(records)));
                let record = Value::Object(record);
                records.push(record.clone());
                HttpResponse::json(201, &record)
            }
            (HttpMethod::Put | HttpMethod::Patch, [resource, id]) => {
                let existing = collections
                    .get_mut(*resource)
                    .and_then(|records| records.iter_mut().find(|r| id_matches(r, id)));
                match existing {
                    Some(record) => {
                        let original_id = record.get("id").cloned().unwrap_or(Value::Null);
                        let mut updated = if request.method == HttpMethod::Patch {
                            record.as_object().cloned().unwrap_or_default()
                        } else {
                            Map::new()
                        };
                        updated.extend(body_object(request));
                        updated.insert("id".to_string(), original_id);
                        *record = Value::Object(updated);
                        HttpResponse::json(200, record)
                    }
                    None => not_found(),
                }
            }
            (HttpMethod::Delete, [resource, id]) => {
                let removed = collections.get_mut(*resource).and_then(|records| {
                    let index = records.iter().position(|r| id_matches(r, id))?;
                    Some(records.remove(index))
                });
                match removed {
                    Some(_) => HttpResponse::json(200, &json!({})),
                    None => not_found(),
                }
            }
            _ => HttpResponse::json(405, &json!({})),
        };

        Ok(response)
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let response = self.handle(&request)?;
        tracing::trace!(method = %request.method, url = %request.url, status = response.status, "Served from local data");
        Ok(response)
    }
}

fn not_found() -> HttpResponse {
    HttpResponse::json(404, &json!({}))
}

fn split_url(raw: &str) -> Result<(String, Vec<(String, String)>), url::ParseError> {
    // Relative urls resolve against a placeholder origin; only path and query matter
    let url = Url::parse(LOCAL_ORIGIN)?.join(raw)?;
    let pairs = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    Ok((url.path().to_string(), pairs))
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn id_matches(record: &Value, id: &str) -> bool {
    record.get("id").is_some_and(|v| scalar_text(v) == id)
}

fn next_id(records: &[Value]) -> u64 {
    records
        .iter()
        .filter_map(|r| r.get("id").and_then(Value::as_u64))
        .max()
        .unwrap_or(0)
        + 1
}

fn body_object(request: &HttpRequest) -> Map<String, Value> {
    match &request.body {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    }
}

fn compare_field(a: &Value, b: &Value, field: &str) -> Ordering {
    match (a.get(field), b.get(field)) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(x), Some(y)) => scalar_text(x).cmp(&scalar_text(y)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Filter, sort and paginate a collection the way the placeholder API does
fn list(records: &[Value], query: &[(String, String)]) -> Vec<Value> {
    let mut page = None;
    let mut limit = None;
    let mut sort = None;
    let mut descending = false;
    let mut filters = Vec::new();

    for (key, value) in query {
        match key.as_str() {
            "_page" => page = value.parse::<usize>().ok().map(|p| p.max(1)),
            "_limit" => limit = value.parse::<usize>().ok(),
            "_sort" => sort = Some(value.as_str()),
            "_order" => descending = value.eq_ignore_ascii_case("desc"),
            _ => filters.push((key.as_str(), value.as_str())),
        }
    }

    let mut matching: Vec<Value> = records
        .iter()
        .filter(|record| {
            filters
                .iter()
                .all(|(field, expected)| record.get(*field).is_some_and(|v| scalar_text(v) == *expected))
        })
        .cloned()
        .collect();

    if let Some(field) = sort {
        matching.sort_by(|a, b| {
            let ordering = compare_field(a, b, field);
            if descending { ordering.reverse() } else { ordering }
        });
    }

    match (page, limit) {
        (None, None) => matching,
        (None, Some(limit)) => matching.into_iter().take(limit).collect(),
        (Some(page), limit) => {
            let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE);
            matching
                .into_iter()
                .skip((page - 1).saturating_mul(limit))
                .take(limit)
                .collect()
        }
    }
}
