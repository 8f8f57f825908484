//! Minimal broker REST stub for HttpStore tests.
//!
//! An axum router serving `GET /reports/:thing` from an in-memory JSON report
//! and merging `PATCH /reports/:thing` bodies (`{"item": {...}}`) into it.
//! Every request is recorded.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{Method, StatusCode, Uri};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Map, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A request the stub received.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub body: Option<Value>,
}

#[derive(Default)]
struct StubState {
    report: Map<String, Value>,
    requests: Vec<Recorded>,
    fail_gets: bool,
    patch_failures: usize,
}

type Shared = Arc<Mutex<StubState>>;

pub struct BrokerStub {
    addr: SocketAddr,
    state: Shared,
    task: JoinHandle<()>,
}

impl BrokerStub {
    /// Start on an ephemeral localhost port.
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(StubState::default()));
        let app = Router::new()
            .route("/reports/:thing", get(get_report).patch(patch_report))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, state, task }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Replace the stored report.
    pub fn set_report(&self, report: Value) {
        let Value::Object(map) = report else {
            panic!("report must be an object");
        };
        self.state.lock().unwrap().report = map;
    }

    pub fn report(&self) -> Value {
        Value::Object(self.state.lock().unwrap().report.clone())
    }

    /// Answer every GET with 503 while set.
    pub fn fail_gets(&self, fail: bool) {
        self.state.lock().unwrap().fail_gets = fail;
    }

    /// Answer the next `n` PATCHes with 503 without touching the report.
    pub fn fail_patches(&self, n: usize) {
        self.state.lock().unwrap().patch_failures = n;
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn gets(&self) -> Vec<Recorded> {
        self.requests_with(Method::GET)
    }

    pub fn patches(&self) -> Vec<Recorded> {
        self.requests_with(Method::PATCH)
    }

    fn requests_with(&self, method: Method) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method.as_str())
            .collect()
    }
}

impl Drop for BrokerStub {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn record(state: &mut StubState, method: Method, uri: &Uri, body: Option<Value>) {
    state.requests.push(Recorded {
        method: method.to_string(),
        path: uri.path().to_string(),
        body,
    });
}

async fn get_report(
    State(state): State<Shared>,
    Path(_thing): Path<String>,
    uri: Uri,
) -> (StatusCode, Json<Value>) {
    let mut state = state.lock().unwrap();
    record(&mut state, Method::GET, &uri, None);

    if state.fail_gets {
        return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"error": "unavailable"})));
    }
    (StatusCode::OK, Json(json!({ "item": Value::Object(state.report.clone()) })))
}

async fn patch_report(
    State(state): State<Shared>,
    Path(_thing): Path<String>,
    uri: Uri,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let body: Option<Value> = serde_json::from_slice(&body).ok();
    let mut state = state.lock().unwrap();
    record(&mut state, Method::PATCH, &uri, body.clone());

    if state.patch_failures > 0 {
        state.patch_failures -= 1;
        return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"error": "unavailable"})));
    }

    match body.and_then(|b| b.get("item").cloned()) {
        Some(Value::Object(item)) => {
            merge(&mut state.report, item);
            (StatusCode::OK, Json(json!({})))
        }
        _ => (StatusCode::BAD_REQUEST, Json(json!({"error": "missing item"}))),
    }
}

fn merge(target: &mut Map<String, Value>, patch: Map<String, Value>) {
    for (key, value) in patch {
        match value {
            Value::Object(child) if matches!(target.get(&key), Some(Value::Object(_))) => {
                if let Some(Value::Object(existing)) = target.get_mut(&key) {
                    merge(existing, child);
                }
            }
            value => {
                target.insert(key, value);
            }
        }
    }
}
