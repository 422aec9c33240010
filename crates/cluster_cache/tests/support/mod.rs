// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! A fake etcd v2 keys endpoint serving one key.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use parking_lot::Mutex;
use serde_json::json;
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};

pub const KEY_PATH: &str = "/v2/keys/translations/generation";

#[derive(Debug, Default)]
pub struct EtcdState {
    /// Current key value; `None` answers 404.
    pub value: Mutex<Option<String>>,
    /// Forces every GET to answer with this status and an empty body.
    pub status: Mutex<Option<StatusCode>>,
    /// Forces every GET to answer 200 with this body.
    pub raw_body: Mutex<Option<String>>,
    /// Delays every request.
    pub delay: Mutex<Option<Duration>>,
    /// Raw bodies of every PUT, in arrival order.
    pub puts: Mutex<Vec<String>>,
    pub gets: Mutex<usize>,
}

pub struct FakeEtcd {
    addr: SocketAddr,
    state: Arc<EtcdState>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl FakeEtcd {
    pub async fn start() -> Self {
        let state = Arc::new(EtcdState::default());
        let app = Router::new()
            .route(KEY_PATH, get(read_key).put(write_key))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind fake etcd");
        let addr = listener.local_addr().expect("fake etcd address");
        let (shutdown, signal) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = signal.await;
                })
                .await
                .expect("fake etcd server");
        });

        Self {
            addr,
            state,
            shutdown: Some(shutdown),
            handle: Some(handle),
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}{KEY_PATH}", self.addr)
    }

    pub fn state(&self) -> &EtcdState {
        &self.state
    }

    pub fn set_value(&self, value: impl Into<String>) {
        *self.state.value.lock() = Some(value.into());
    }

    pub fn value(&self) -> Option<String> {
        self.state.value.lock().clone()
    }

    pub fn gets(&self) -> usize {
        *self.state.gets.lock()
    }

    pub fn puts(&self) -> Vec<String> {
        self.state.puts.lock().clone()
    }

    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

/// An address nothing listens on.
pub async fn closed_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind probe");
    let addr = listener.local_addr().expect("probe address");
    drop(listener);
    format!("http://{addr}{KEY_PATH}")
}

async fn read_key(State(state): State<Arc<EtcdState>>) -> Response {
    *state.gets.lock() += 1;
    let delay = *state.delay.lock();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    if let Some(status) = *state.status.lock() {
        return status.into_response();
    }
    if let Some(body) = state.raw_body.lock().clone() {
        return (StatusCode::OK, body).into_response();
    }

    let value = state.value.lock().clone();
    match value {
        Some(value) => Json(json!({
            "action": "get",
            "node": { "key": "/translations/generation", "value": value, "modifiedIndex": 7, "createdIndex": 7 }
        }))
        .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "errorCode": 100, "message": "Key not found", "cause": "/translations/generation", "index": 7 })),
        )
            .into_response(),
    }
}

async fn write_key(State(state): State<Arc<EtcdState>>, body: String) -> Response {
    let delay = *state.delay.lock();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    state.puts.lock().push(body.clone());
    let value = body.strip_prefix("value=").map(str::to_string);
    *state.value.lock() = value.clone();

    Json(json!({
        "action": "set",
        "node": { "key": "/translations/generation", "value": value, "modifiedIndex": 8, "createdIndex": 8 }
    }))
    .into_response()
}
