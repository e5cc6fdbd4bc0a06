#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use hostwatch_api::config::ServerConfig;
use hostwatch_api::router::build_app_router;
use hostwatch_api::state::AppState;
use hostwatch_core::alerting::AlertManager;
use hostwatch_core::metric::{DiskPartition, MetricSnapshot};
use hostwatch_core::ring_buffer::MetricHistory;
use hostwatch_core::sampler::{CollectionError, Sampler};
use hostwatch_core::store::MemoryStore;

pub const TEST_HOST: &str = "test-host";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        database_url: None,
        hostname: Some(TEST_HOST.to_string()),
        store_call_timeout_secs: 2,
    }
}

// ---------------------------------------------------------------------------
// Scripted sampler
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Reading {
    cpu: f64,
    memory: f64,
    disk: f64,
    sent: f64,
    recv: f64,
    failing: bool,
}

/// A sampler whose readings are set by the test.
pub struct FakeSampler {
    reading: Mutex<Reading>,
    calls: Mutex<usize>,
}

impl FakeSampler {
    pub fn new() -> Self {
        Self {
            reading: Mutex::new(Reading {
                cpu: 10.0,
                memory: 20.0,
                disk: 30.0,
                sent: 100.0,
                recv: 300.0,
                failing: false,
            }),
            calls: Mutex::new(0),
        }
    }

    pub fn set_cpu(&self, value: f64) {
        self.reading.lock().unwrap().cpu = value;
    }

    pub fn set_memory(&self, value: f64) {
        self.reading.lock().unwrap().memory = value;
    }

    pub fn set_failing(&self, failing: bool) {
        self.reading.lock().unwrap().failing = failing;
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl Sampler for FakeSampler {
    fn sample(&self) -> Result<MetricSnapshot, CollectionError> {
        *self.calls.lock().unwrap() += 1;
        let r = self.reading.lock().unwrap().clone();
        if r.failing {
            return Err(CollectionError::Unavailable("scripted failure".into()));
        }

        Ok(MetricSnapshot {
            hostname: TEST_HOST.to_string(),
            cpu_percent: r.cpu,
            memory_percent: r.memory,
            memory_total_bytes: 8_000,
            memory_used_bytes: (80.0 * r.memory) as u64,
            disk_percent: r.disk,
            partitions: vec![DiskPartition {
                device: "/dev/sda1".into(),
                mount_point: "/".into(),
                filesystem: "ext4".into(),
                total_bytes: 1_000,
                used_bytes: (10.0 * r.disk) as u64,
                usage_percent: r.disk,
            }],
            network_sent_per_sec: r.sent,
            network_recv_per_sec: r.recv,
            timestamp: Utc::now(),
        })
    }
}

// ---------------------------------------------------------------------------
// Test application
// ---------------------------------------------------------------------------

/// Router plus handles on everything behind it.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub sampler: Arc<FakeSampler>,
    pub alerts: Arc<AlertManager>,
    pub history: Arc<MetricHistory>,
}

/// Build the full application router with all middleware layers over an
/// empty in-memory store.
pub fn build_test_app() -> TestApp {
    let config = test_config();
    let store = Arc::new(MemoryStore::new());
    let sampler = Arc::new(FakeSampler::new());
    let alerts = Arc::new(AlertManager::new(store.clone()));
    let history = Arc::new(MetricHistory::default());

    let state = AppState {
        alerts: Arc::clone(&alerts),
        history: Arc::clone(&history),
        sampler: sampler.clone(),
        config: Arc::new(config.clone()),
    };

    TestApp {
        router: build_app_router(state, &config),
        store,
        sampler,
        alerts,
        history,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: &TestApp, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None).await
}

/// POST without a body or content type.
pub async fn post(app: &TestApp, uri: &str) -> Response<Body> {
    send(app, Method::POST, uri, None).await
}

pub async fn post_json(app: &TestApp, uri: &str, body: Value) -> Response<Body> {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn put_json(app: &TestApp, uri: &str, body: Value) -> Response<Body> {
    send(app, Method::PUT, uri, Some(body)).await
}

pub async fn delete(app: &TestApp, uri: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, None).await
}

async fn send(app: &TestApp, method: Method, uri: &str, body: Option<Value>) -> Response<Body> {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.router.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
