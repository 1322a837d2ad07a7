//! Shared fixtures for portal-client integration tests.
//!
//! # Purpose
//! Runs an in-process mock of the portal backend (identity, DNC check and
//! request endpoints) and mints test bearer tokens.
//!
//! # Concurrency + ordering guarantees
//! - The mock binds to 127.0.0.1:0 so tests never share a port.
//! - The listener is bound before the address is returned, so requests made
//!   after `spawn` cannot race the bind.
#![allow(dead_code)]

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use jsonwebtoken::{EncodingKey, Header};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

const TEST_SECRET: &[u8] = b"portal-client-test-secret";

/// Mint an HS256 token carrying the given `roles` claim.
pub fn token_with_roles(roles: Value) -> String {
    jsonwebtoken::encode(
        &Header::default(),
        &json!({"sub": "7", "roles": roles, "org_id": 12, "user_id": 7, "exp": 4_102_444_800u64}),
        &EncodingKey::from_secret(TEST_SECRET),
    )
    .expect("encode token")
}

/// Scripted backend state, inspected by tests after the fact.
pub struct MockBackend {
    identity: Mutex<(StatusCode, Value)>,
    identity_calls: AtomicUsize,
    identity_headers: Mutex<Vec<HeaderMap>>,
    listed: HashSet<String>,
    submitted_batches: Mutex<Vec<Vec<String>>>,
    submitted_notes: Mutex<Vec<Option<String>>>,
    fail_submit_after: Option<usize>,
    pages: HashMap<String, Value>,
    page_queries: Mutex<Vec<HashMap<String, String>>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            identity: Mutex::new((StatusCode::OK, json!({}))),
            identity_calls: AtomicUsize::new(0),
            identity_headers: Mutex::new(Vec::new()),
            listed: HashSet::new(),
            submitted_batches: Mutex::new(Vec::new()),
            submitted_notes: Mutex::new(Vec::new()),
            fail_submit_after: None,
            pages: HashMap::new(),
            page_queries: Mutex::new(Vec::new()),
        }
    }

    pub fn with_identity(self, status: StatusCode, body: Value) -> Self {
        *self.identity.lock() = (status, body);
        self
    }

    pub fn with_listed(mut self, numbers: &[&str]) -> Self {
        self.listed = numbers.iter().map(|number| number.to_string()).collect();
        self
    }

    pub fn with_failing_submit_after(mut self, batches: usize) -> Self {
        self.fail_submit_after = Some(batches);
        self
    }

    /// Register the page served for `cursor` ("" is the first page).
    pub fn with_page(mut self, cursor: &str, body: Value) -> Self {
        self.pages.insert(cursor.to_string(), body);
        self
    }

    pub fn set_identity(&self, status: StatusCode, body: Value) {
        *self.identity.lock() = (status, body);
    }

    pub fn identity_calls(&self) -> usize {
        self.identity_calls.load(Ordering::SeqCst)
    }

    pub fn identity_headers(&self) -> Vec<HeaderMap> {
        self.identity_headers.lock().clone()
    }

    pub fn submitted_batches(&self) -> Vec<Vec<String>> {
        self.submitted_batches.lock().clone()
    }

    pub fn submitted_notes(&self) -> Vec<Option<String>> {
        self.submitted_notes.lock().clone()
    }

    pub fn page_queries(&self) -> Vec<HashMap<String, String>> {
        self.page_queries.lock().clone()
    }
}

/// Serve `backend` on an ephemeral local port and return its address.
pub async fn spawn(backend: Arc<MockBackend>) -> SocketAddr {
    let app = Router::new()
        .route("/api/v1/tenants/auth/me", get(identity))
        .route("/api/v1/dnc/check", post(check))
        .route(
            "/api/v1/tenants/:org_id/dnc/requests",
            post(submit).get(history),
        )
        .with_state(backend);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app.into_make_service()).await;
    });
    addr
}

pub fn base_url(addr: SocketAddr) -> String {
    format!("http://{addr}")
}

async fn identity(
    State(backend): State<Arc<MockBackend>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    backend.identity_calls.fetch_add(1, Ordering::SeqCst);
    backend.identity_headers.lock().push(headers);
    let (status, body) = backend.identity.lock().clone();
    (status, Json(body))
}

async fn check(
    State(backend): State<Arc<MockBackend>>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let results: Vec<Value> = phone_numbers(&body)
        .into_iter()
        .map(|number| {
            let listed = backend.listed.contains(&number);
            json!({
                "phone_number": number,
                "is_dnc": listed,
                "source": if listed { Some("federal") } else { None },
            })
        })
        .collect();
    Json(json!({ "results": results }))
}

async fn submit(
    State(backend): State<Arc<MockBackend>>,
    Path(org_id): Path<i64>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let batch = phone_numbers(&body);
    let mut batches = backend.submitted_batches.lock();
    if backend
        .fail_submit_after
        .is_some_and(|limit| batches.len() >= limit)
    {
        return (StatusCode::BAD_GATEWAY, Json(json!({"detail": "upstream"})));
    }
    let first_id = batches.iter().map(Vec::len).sum::<usize>() as i64 + 1;
    let notes = body
        .get("notes")
        .and_then(Value::as_str)
        .map(str::to_string);
    backend.submitted_notes.lock().push(notes.clone());
    let requests: Vec<Value> = batch
        .iter()
        .enumerate()
        .map(|(offset, number)| {
            json!({
                "id": first_id + offset as i64,
                "phone_number": number,
                "status": "pending",
                "notes": notes,
                "requested_by": org_id * 100,
            })
        })
        .collect();
    batches.push(batch);
    (StatusCode::CREATED, Json(json!({ "requests": requests })))
}

async fn history(
    State(backend): State<Arc<MockBackend>>,
    Path(_org_id): Path<i64>,
    Query(query): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    let cursor = query.get("cursor").cloned().unwrap_or_default();
    backend.page_queries.lock().push(query);
    match backend.pages.get(&cursor) {
        Some(page) => (StatusCode::OK, Json(page.clone())),
        None => (StatusCode::NOT_FOUND, Json(json!({"detail": "no such cursor"}))),
    }
}

fn phone_numbers(body: &Value) -> Vec<String> {
    body.get("phone_numbers")
        .and_then(Value::as_array)
        .map(|numbers| {
            numbers
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Restores an environment variable when dropped.
pub struct EnvGuard {
    key: &'static str,
    previous: Option<String>,
}

impl EnvGuard {
    pub fn set(key: &'static str, value: &str) -> Self {
        let previous = std::env::var(key).ok();
        unsafe { std::env::set_var(key, value) };
        Self { key, previous }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        match &self.previous {
            Some(value) => unsafe { std::env::set_var(self.key, value) },
            None => unsafe { std::env::remove_var(self.key) },
        }
    }
}
