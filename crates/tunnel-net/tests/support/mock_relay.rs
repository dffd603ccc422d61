//! In-memory one-shot mailbox relay, standing in for a real piping server
//! in end-to-end tests (`spec.md` §8). Grounded in the teacher's own
//! `axum`+`dashmap` stack (`tallow-relay`), used here purely as a test
//! fixture — this crate does not ship a relay binary (`spec.md` §2 excludes
//! a relay server from the core).

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Router;
use dashmap::DashMap;
use tokio::sync::oneshot;

#[derive(Clone, Default)]
struct MailboxState {
    waiting: Arc<DashMap<String, oneshot::Sender<Bytes>>>,
    delivered: Arc<DashMap<String, Bytes>>,
}

/// A running mock relay. Dropping this stops accepting new connections on
/// the next request (the listener task is detached, matching how a real
/// relay outlives any one client).
pub struct MockRelay {
    pub base_url: String,
}

/// Start a mock relay on an ephemeral port and return its base URL.
pub async fn spawn() -> MockRelay {
    let state = MailboxState::default();
    let app = Router::new()
        .route("/{*path}", post(handle_post).get(handle_get))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockRelay {
        base_url: format!("http://{addr}/"),
    }
}

async fn handle_post(
    State(state): State<MailboxState>,
    Path(path): Path<String>,
    body: Bytes,
) -> &'static str {
    if let Some((_, tx)) = state.waiting.remove(&path) {
        let _ = tx.send(body);
    } else {
        state.delivered.insert(path, body);
    }
    "ok"
}

async fn handle_get(State(state): State<MailboxState>, Path(path): Path<String>) -> Bytes {
    if let Some((_, body)) = state.delivered.remove(&path) {
        return body;
    }
    let (tx, rx) = oneshot::channel();
    state.waiting.insert(path, tx);
    rx.await.unwrap_or_default()
}
