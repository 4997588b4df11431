//! Purpose: In-process fake location directory for integration tests.
//! Exports: `FakeDirectory`, `unreachable_url`.
//! Role: Speaks the plain-text lookup/add/remove dialect over loopback HTTP.
//! Invariants: Each instance owns its runtime and in-memory table; dropping it stops the server.
//! Invariants: Scripted routes under `/reply/*` return fixed bodies regardless of parameters.
#![allow(dead_code)]

use axum::extract::{Path, Query, State};
use axum::http::{Method, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{any, get};
use axum::{Form, Router};
use std::collections::{BTreeMap, HashMap};
use std::net::{SocketAddr, TcpListener};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub type TestResult<T> = Result<T, Box<dyn std::error::Error>>;

type Table = Arc<Mutex<BTreeMap<String, Vec<String>>>>;

pub struct FakeDirectory {
    addr: SocketAddr,
    table: Table,
    _runtime: tokio::runtime::Runtime,
}

impl FakeDirectory {
    pub fn start() -> TestResult<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;
        let table: Table = Arc::new(Mutex::new(BTreeMap::new()));

        let app = Router::new()
            .route("/locationdb", get(lookup).post(mutate))
            .route("/reply/:scenario", any(scripted))
            .route("/status/:code", any(status))
            .route("/slow", any(slow))
            .route("/redirect/:code", any(redirect))
            .route("/redirect-target", any(redirect_target))
            .route("/latin1/:scenario", any(latin1))
            .with_state(table.clone());

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()?;
        runtime.spawn(async move {
            let listener = tokio::net::TcpListener::from_std(listener).expect("tokio listener");
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            addr,
            table,
            _runtime: runtime,
        })
    }

    pub fn url(&self) -> String {
        format!("http://{}/locationdb", self.addr)
    }

    pub fn reply_url(&self, scenario: &str) -> String {
        format!("http://{}/reply/{scenario}", self.addr)
    }

    pub fn status_url(&self, code: u16) -> String {
        format!("http://{}/status/{code}", self.addr)
    }

    /// Answers every request with `code` and a `Location` to a route that accepts any method.
    pub fn redirect_url(&self, code: u16) -> String {
        format!("http://{}/redirect/{code}", self.addr)
    }

    pub fn latin1_url(&self, scenario: &str) -> String {
        format!("http://{}/latin1/{scenario}", self.addr)
    }

    pub fn slow_url(&self) -> String {
        format!("http://{}/slow", self.addr)
    }

    pub fn locations(&self, name: &str) -> Vec<String> {
        self.table
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .get(name)
            .cloned()
            .unwrap_or_default()
    }
}

/// A loopback URL with nothing listening behind it.
pub fn unreachable_url() -> TestResult<String> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(format!("http://{addr}/locationdb"))
}

async fn lookup(
    State(table): State<Table>,
    Query(params): Query<HashMap<String, String>>,
) -> String {
    if params.get("operation").map(String::as_str) != Some("lookup") {
        return "ERROR unknown operation".to_string();
    }
    let Some(name) = params.get("name") else {
        return "ERROR missing name argument".to_string();
    };
    let table = table.lock().unwrap_or_else(|poison| poison.into_inner());
    match table.get(name) {
        Some(urls) if !urls.is_empty() => format!("OK {}", urls.join("\n")),
        _ => format!("ERROR No locations for {name}"),
    }
}

async fn mutate(State(table): State<Table>, Form(params): Form<HashMap<String, String>>) -> String {
    let (Some(operation), Some(name), Some(url)) =
        (params.get("operation"), params.get("name"), params.get("url"))
    else {
        return "ERROR missing argument".to_string();
    };
    let mut table = table.lock().unwrap_or_else(|poison| poison.into_inner());
    match operation.as_str() {
        "add" => {
            let urls = table.entry(name.clone()).or_default();
            if !urls.contains(url) {
                urls.push(url.clone());
            }
            "OK added".to_string()
        }
        "remove" => {
            if let Some(urls) = table.get_mut(name) {
                urls.retain(|known| known != url);
            }
            "OK removed".to_string()
        }
        other => format!("ERROR unknown operation {other}"),
    }
}

async fn scripted(Path(scenario): Path<String>) -> String {
    match scenario.as_str() {
        "blank-first" => "OK \nfoo\nbar",
        "bare-ok" => "OK ",
        "ok-no-space" => "OK",
        "trailing-newline" => "OK http://node1/a.arc\n",
        "no-location" => "ERROR No locations for a.arc",
        "looks-like-payload" => "http://node1/a.arc\nhttp://node2/a.arc",
        _ => "malformed",
    }
    .to_string()
}

async fn status(Path(code): Path<u16>) -> impl IntoResponse {
    let code = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (code, "OK this body must be ignored")
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_secs(3)).await;
    "OK late"
}

async fn redirect(Path(code): Path<u16>) -> impl IntoResponse {
    let code = StatusCode::from_u16(code).unwrap_or(StatusCode::FOUND);
    (code, [(header::LOCATION, "/redirect-target")], "OK moved")
}

async fn redirect_target(method: Method) -> String {
    if method == Method::POST {
        "OK posted".to_string()
    } else {
        format!("OK followed with {method}")
    }
}

async fn latin1(Path(scenario): Path<String>) -> impl IntoResponse {
    let (content_type, body): (&'static str, &'static [u8]) = match scenario.as_str() {
        "ok" => ("text/plain; charset=ISO-8859-1", b"OK http://n/caf\xe9.arc"),
        "error" => ("text/plain; charset=ISO-8859-1", b"ERROR bad name caf\xe9"),
        _ => ("text/plain", b"OK http://n/caf\xe9.arc"),
    };
    ([(header::CONTENT_TYPE, content_type)], body.to_vec())
}
