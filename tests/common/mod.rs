//! Shared helpers: a fake upstream plays feed served from the JSON fixtures in `tests/testdata`,
//! and a way to run an axum router on an ephemeral port.

#![allow(dead_code)]

use std::{
    collections::HashMap,
    net::{SocketAddr, TcpListener},
    path::PathBuf,
    sync::{Arc, Mutex},
};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::Value;

/// How the fake feed answers.
#[derive(Clone, Copy)]
pub enum FeedMode {
    /// The fixture on the first page, then an empty page.
    Fixture(&'static str),
    /// The fixture, without any pointer to the next page.
    MissingNext(&'static str),
    /// The fixture on every page, forever.
    Endless(&'static str),
    /// Internal server errors.
    Failing,
}

#[derive(Clone)]
struct FeedState {
    mode: FeedMode,
    base_url: String,
    requests: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

pub struct MockFeed {
    /// First page of the feed, to be used as the plays API url.
    pub url: String,
    requests: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

impl MockFeed {
    /// Query parameters of every request received so far.
    pub fn requests(&self) -> Vec<HashMap<String, String>> {
        self.requests.lock().unwrap().clone()
    }
}

pub fn fixture(name: &str) -> Value {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("testdata")
        .join(name);
    let content = std::fs::read_to_string(&path)
        .unwrap_or_else(|err| panic!("unable to read fixture {path:?}: {err}"));
    serde_json::from_str(&content).unwrap()
}

fn with_next(mut page: Value, next: Option<String>) -> Value {
    let obj = page.as_object_mut().unwrap();
    match next {
        Some(next) => {
            obj.insert("next".to_owned(), Value::String(next));
        }
        None => {
            obj.remove("next");
        }
    }
    page
}

async fn feed(
    State(state): State<FeedState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state.requests.lock().unwrap().push(params.clone());

    let page: usize = params
        .get("page")
        .and_then(|page| page.parse().ok())
        .unwrap_or(1);
    let next_url = format!("{}?page={}", state.base_url, page + 1);

    match state.mode {
        FeedMode::Fixture(name) => {
            if page == 1 {
                Json(with_next(fixture(name), Some(next_url))).into_response()
            } else {
                // Mimics the real API running out of plays.
                Json(serde_json::json!({})).into_response()
            }
        }
        FeedMode::MissingNext(name) => Json(with_next(fixture(name), None)).into_response(),
        FeedMode::Endless(name) => Json(with_next(fixture(name), Some(next_url))).into_response(),
        FeedMode::Failing => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
    }
}

/// Serves `app` on an ephemeral local port, in the background.
pub fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let addr = listener.local_addr().unwrap();

    let server = axum::Server::from_tcp(listener)
        .unwrap()
        .serve(app.into_make_service());
    tokio::spawn(async move {
        server.await.unwrap();
    });

    addr
}

pub fn spawn_feed(mode: FeedMode) -> MockFeed {
    // Bind first, since pages point to each other with absolute urls.
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let addr = listener.local_addr().unwrap();
    let url = format!("http://{addr}/play/");

    let requests = Arc::new(Mutex::new(Vec::new()));
    let state = FeedState {
        mode,
        base_url: url.clone(),
        requests: requests.clone(),
    };

    let app = Router::new().route("/play/", get(feed)).with_state(state);
    let server = axum::Server::from_tcp(listener)
        .unwrap()
        .serve(app.into_make_service());
    tokio::spawn(async move {
        server.await.unwrap();
    });

    MockFeed { url, requests }
}
