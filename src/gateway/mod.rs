//! Request gateway: timeouts, cancellation and de-duplication around a transport
//!
//! # Architecture
//!
//! ```text
//! request() ─────────────┐
//!                        ├──▶ register token ──▶ select! { cancelled | timeout(transport.send) }
//! get_deduped() ──join?──┘                              │
//!      │                                                ▼
//!      └── pending map (shared result)          guard dropped: deregistered
//! ```
//!
//! Every request gets a [`CancellationToken`](tokio_util::sync::CancellationToken)
//! registered under a key before the transport is called. The registration
//! is owned by a guard, so whichever way the request ends (success, HTTP
//! error, timeout, cancellation, or the future simply being dropped) the
//! entry is removed exactly once.
//!
//! The gateway never retries. Retry policy belongs to the caller, see
//! [`RetryPolicy`](crate::client::RetryPolicy).

pub mod registry;
pub mod transport;

use crate::config::ClientConfig;
use crate::core::error::GatewayError;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use registry::InFlightRegistry;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use transport::{HttpMethod, HttpRequest, Transport};

pub use registry::RegistrationGuard;
pub use transport::{HttpResponse, ReqwestTransport, TransportError};

/// Timeout applied when neither the call nor the config sets one
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Lifecycle of a single request
///
/// `Idle → InFlight → {Succeeded, Failed, TimedOut, Cancelled}`; every
/// terminal state implies the registry entry is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Idle,
    InFlight,
    Succeeded,
    Failed,
    TimedOut,
    Cancelled,
}

impl RequestState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestState::Idle | RequestState::InFlight)
    }

    pub fn of<T>(result: &Result<T, GatewayError>) -> Self {
        match result {
            Ok(_) => RequestState::Succeeded,
            Err(GatewayError::Timeout { .. }) => RequestState::TimedOut,
            Err(GatewayError::Cancelled { .. }) => RequestState::Cancelled,
            Err(_) => RequestState::Failed,
        }
    }
}

/// Per-call options
///
/// Serialized (with sorted headers) to build the de-duplication key.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RequestOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(timeout.as_millis() as u64);
        self
    }
}

type SharedResult = Shared<BoxFuture<'static, Result<Value, GatewayError>>>;

struct PendingEntry {
    generation: u64,
    result: SharedResult,
}

struct GatewayInner {
    transport: Arc<dyn Transport>,
    registry: Arc<InFlightRegistry>,
    pending: Mutex<HashMap<String, PendingEntry>>,
    next_generation: AtomicU64,
    next_nonce: AtomicU64,
    default_timeout: Duration,
}

/// Issues requests with enforced timeouts, external cancellation and
/// coalescing of identical concurrent reads
///
/// Cheap to clone; clones share the registry and the pending map.
#[derive(Clone)]
pub struct RequestGateway {
    inner: Arc<GatewayInner>,
}

impl RequestGateway {
    /// Create a gateway with the default 10s timeout
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_timeout(transport, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(transport: Arc<dyn Transport>, default_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(GatewayInner {
                transport,
                registry: Arc::new(InFlightRegistry::new()),
                pending: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
                next_nonce: AtomicU64::new(0),
                default_timeout,
            }),
        }
    }

    pub fn from_config(config: &ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self::with_timeout(transport, config.timeout())
    }

    pub fn default_timeout(&self) -> Duration {
        self.inner.default_timeout
    }

    /// Issue a request
    ///
    /// The call is registered under `METHOD url @issue-time#seq`, so two
    /// identical calls never share a cancellation handle.
    pub async fn request(
        &self,
        method: HttpMethod,
        url: &str,
        options: RequestOptions,
    ) -> Result<Value, GatewayError> {
        let key = self.issue_key(&format!("{} {}", method, url));
        let guard = self.inner.registry.register(key);
        Arc::clone(&self.inner)
            .execute(guard, method, url.to_string(), options)
            .await
    }

    /// Issue a GET, joining an identical request that is already in flight
    ///
    /// Identity is method, url and serialized options. The entry is evicted
    /// as soon as the underlying request settles, so a later call issues a
    /// fresh request. The underlying request runs on its own task and keeps
    /// going even if every caller stops waiting.
    pub async fn get_deduped(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<Value, GatewayError> {
        let key = dedup_key(HttpMethod::Get, url, &options);

        let shared = {
            let mut pending = self.inner.lock_pending();
            let existing = pending.get(&key).map(|entry| entry.result.clone());
            match existing {
                Some(result) => {
                    tracing::debug!(key = %key, "Joining in-flight request");
                    result
                }
                None => {
                    let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
                    let inner = Arc::clone(&self.inner);
                    let task_key = key.clone();
                    let url = url.to_string();

                    // Registered and spawned while the pending lock is held:
                    // a cancel issued from here on reaches the request, and
                    // eviction can only run after the entry below is inserted.
                    let guard = self.inner.registry.register(key.clone());
                    let task = tokio::spawn(async move {
                        let result = Arc::clone(&inner)
                            .execute(guard, HttpMethod::Get, url, options)
                            .await;
                        inner.evict_pending(&task_key, generation);
                        result
                    });

                    let result: SharedResult = async move {
                        task.await.unwrap_or_else(|e| {
                            Err(GatewayError::other(format!("request task failed: {}", e)))
                        })
                    }
                    .boxed()
                    .shared();

                    pending.insert(
                        key.clone(),
                        PendingEntry {
                            generation,
                            result: result.clone(),
                        },
                    );
                    result
                }
            }
        };

        shared.await
    }

    /// Wait out a retry delay, registered like a request
    ///
    /// The wait is keyed `BACKOFF label @issue-time#seq`, so cancelling a
    /// resource also stops callers that are about to retry it.
    pub async fn backoff(&self, label: &str, delay: Duration) -> Result<(), GatewayError> {
        let guard = self
            .inner
            .registry
            .register(self.issue_key(&format!("BACKOFF {}", label)));

        tokio::select! {
            biased;
            _ = guard.token().cancelled() => {
                tracing::debug!(key = %guard.key(), "Retry backoff cancelled");
                Err(GatewayError::Cancelled {
                    key: guard.key().to_string(),
                })
            }
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }

    /// Abort every in-flight request; returns how many were cancelled
    pub fn cancel_all(&self) -> usize {
        self.inner.lock_pending().clear();
        let cancelled = self.inner.registry.cancel_all();
        if cancelled > 0 {
            tracing::debug!(count = cancelled, "Cancelled all in-flight requests");
        }
        cancelled
    }

    /// Abort in-flight requests whose key contains `pattern`
    ///
    /// Keys start with `METHOD url`, so a resource path such as `/posts`
    /// selects every request for that resource.
    pub fn cancel_by_pattern(&self, pattern: &str) -> usize {
        self.inner
            .lock_pending()
            .retain(|key, _| !key.contains(pattern));
        let cancelled = self.inner.registry.cancel_matching(pattern);
        if cancelled > 0 {
            tracing::debug!(pattern = %pattern, count = cancelled, "Cancelled in-flight requests");
        }
        cancelled
    }

    pub fn in_flight_count(&self) -> usize {
        self.inner.registry.len()
    }

    pub fn in_flight_keys(&self) -> Vec<String> {
        self.inner.registry.keys()
    }

    pub fn pending_dedup_count(&self) -> usize {
        self.inner.lock_pending().len()
    }
}

impl RequestGateway {
    fn issue_key(&self, prefix: &str) -> String {
        let nonce = self.inner.next_nonce.fetch_add(1, Ordering::Relaxed);
        format!(
            "{} @{}#{}",
            prefix,
            chrono::Utc::now().timestamp_millis(),
            nonce
        )
    }
}

impl GatewayInner {
    fn lock_pending(&self) -> MutexGuard<'_, HashMap<String, PendingEntry>> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn evict_pending(&self, key: &str, generation: u64) {
        let mut pending = self.lock_pending();
        if pending
            .get(key)
            .is_some_and(|entry| entry.generation == generation)
        {
            pending.remove(key);
        }
    }

    async fn execute(
        self: Arc<Self>,
        guard: RegistrationGuard,
        method: HttpMethod,
        url: String,
        options: RequestOptions,
    ) -> Result<Value, GatewayError> {
        let timeout = options
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(self.default_timeout);
        let request = HttpRequest {
            method,
            url: url.clone(),
            headers: options.headers,
            body: options.body,
        };

        let token = guard.token().clone();
        let started = Instant::now();

        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => Err(GatewayError::Cancelled {
                key: guard.key().to_string(),
            }),
            result = tokio::time::timeout(timeout, self.transport.send(request)) => match result {
                Ok(Ok(response)) => Ok(response),
                Ok(Err(e)) => Err(e.into_gateway_error(&url)),
                Err(_) => Err(GatewayError::Timeout {
                    method: method.to_string(),
                    url: url.clone(),
                    timeout_ms: timeout.as_millis() as u64,
                }),
            },
        };
        drop(guard);

        let result = outcome.and_then(|response| {
            if response.is_success() {
                response.parse_json()
            } else {
                Err(GatewayError::HttpStatus {
                    url: url.clone(),
                    status: response.status,
                    status_text: response.status_text,
                })
            }
        });

        let state = RequestState::of(&result);
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Err(GatewayError::Timeout { .. }) => {
                tracing::warn!(method = %method, url = %url, elapsed_ms, "Request timed out");
            }
            _ => {
                tracing::debug!(method = %method, url = %url, state = ?state, elapsed_ms, "Request settled");
            }
        }

        result
    }
}

fn dedup_key(method: HttpMethod, url: &str, options: &RequestOptions) -> String {
    let options = serde_json::to_string(options).unwrap_or_default();
    format!("{} {} {}", method, url, options)
}
