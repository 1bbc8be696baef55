//! Per-request context.

use crate::exception::HttpException;
use axum::body::{Body, Bytes};
use axum::extract::{FromRequestParts, Query, RawPathParams};
use axum::http::request::Parts;
use axum::http::{HeaderMap, Method, Request, Uri};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Upper bound on buffered request bodies.
const BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Cooperative cancellation flag carried by every request context.
///
/// Handlers that start background work (timers, streams) should clone
/// the signal and poll [`CancellationSignal::is_cancelled`] so a client
/// disconnect can release those resources. No deadline is imposed.
#[derive(Clone, Default)]
pub struct CancellationSignal {
    flag: Arc<AtomicBool>,
}

impl CancellationSignal {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// State seeded by middleware for the downstream pipeline.
///
/// Middleware runs before routing and cannot see the [`RequestContext`];
/// it communicates by inserting a `StateSeed` into the request
/// extensions, which the dispatcher drains into the context's `states`.
#[derive(Clone, Default)]
pub struct StateSeed(pub HashMap<String, Value>);

/// Everything the pipeline knows about one in-flight request.
///
/// Created when a matched route begins dispatch, destroyed once the
/// response is produced. The `states` bag is the sanctioned place for
/// cross-stage data (an authenticated user injected by a guard, cache
/// keys computed by an interceptor, and so on).
pub struct RequestContext {
    pub id: Uuid,
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub path_params: HashMap<String, String>,
    pub query: HashMap<String, String>,
    pub body: Bytes,
    pub states: HashMap<String, Value>,
    pub started_at: DateTime<Utc>,
    cancellation: CancellationSignal,
}

impl RequestContext {
    /// Build a context from a matched request, buffering the body.
    pub async fn from_request(request: Request<Body>) -> Result<Self, HttpException> {
        let (mut parts, body) = request.into_parts();
        let mut ctx = Self::from_parts(&mut parts).await;
        ctx.body = axum::body::to_bytes(body, BODY_LIMIT)
            .await
            .map_err(|e| {
                HttpException::payload_too_large("Request body too large or unreadable")
                    .with_cause(anyhow::anyhow!(e))
            })?;
        Ok(ctx)
    }

    async fn from_parts(parts: &mut Parts) -> Self {
        let path_params = RawPathParams::from_request_parts(parts, &())
            .await
            .map(|params| {
                params
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect()
            })
            .unwrap_or_default();

        let query = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
            .map(|q| q.0)
            .unwrap_or_default();

        let states = parts
            .extensions
            .remove::<StateSeed>()
            .map(|seed| seed.0)
            .unwrap_or_default();

        Self {
            id: Uuid::new_v4(),
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            headers: parts.headers.clone(),
            path_params,
            query,
            body: Bytes::new(),
            states,
            started_at: Utc::now(),
            cancellation: CancellationSignal::default(),
        }
    }

    /// Store a value for later pipeline stages.
    pub fn set_state(&mut self, key: impl Into<String>, value: Value) {
        self.states.insert(key.into(), value);
    }

    pub fn state(&self, key: &str) -> Option<&Value> {
        self.states.get(key)
    }

    pub fn cancellation(&self) -> CancellationSignal {
        self.cancellation.clone()
    }

    /// Parse the buffered body as JSON. An empty body yields `Null`.
    pub fn body_json(&self) -> Result<Value, HttpException> {
        if self.body.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&self.body)
            .map_err(|e| HttpException::bad_request(format!("Invalid JSON body: {e}")))
    }

    /// Immutable snapshot handed to exception filters after the context
    /// has been consumed by the handler chain.
    pub fn snapshot(&self) -> RequestSnapshot {
        RequestSnapshot {
            id: self.id,
            method: self.method.clone(),
            uri: self.uri.clone(),
            started_at: self.started_at,
        }
    }
}

/// The request facts that survive into the exception-filter layer.
#[derive(Clone)]
pub struct RequestSnapshot {
    pub id: Uuid,
    pub method: Method,
    pub uri: Uri,
    pub started_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with_body(body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/cats?limit=5&offset=10")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn query_and_body_are_captured() {
        let ctx = RequestContext::from_request(request_with_body(r#"{"name":"Tom"}"#))
            .await
            .unwrap();

        assert_eq!(ctx.query.get("limit").map(String::as_str), Some("5"));
        assert_eq!(ctx.query.get("offset").map(String::as_str), Some("10"));
        assert_eq!(ctx.body_json().unwrap()["name"], "Tom");
    }

    #[tokio::test]
    async fn empty_body_parses_as_null() {
        let ctx = RequestContext::from_request(request_with_body("")).await.unwrap();
        assert_eq!(ctx.body_json().unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn invalid_json_body_is_a_bad_request() {
        let ctx = RequestContext::from_request(request_with_body("{nope")).await.unwrap();
        let err = ctx.body_json().unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn middleware_seed_lands_in_states() {
        let mut request = request_with_body("");
        request.extensions_mut().insert(StateSeed(
            [("user".to_string(), Value::String("alice".into()))].into(),
        ));
        let ctx = RequestContext::from_request(request).await.unwrap();
        assert_eq!(ctx.state("user"), Some(&Value::String("alice".into())));
    }

    #[test]
    fn cancellation_signal_is_shared_between_clones() {
        let signal = CancellationSignal::default();
        let clone = signal.clone();
        assert!(!clone.is_cancelled());
        signal.cancel();
        assert!(clone.is_cancelled());
    }
}
