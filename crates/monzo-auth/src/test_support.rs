//! Local HTTP server for exercising the client against real sockets.
//!
//! Answers from a fixed route table and records every request it sees.
//! Shared with `monzo-api` tests through the `test-support` feature.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tokio::net::TcpListener;

/// Canned response for one method + path.
#[derive(Debug, Clone)]
pub struct Route {
    method: String,
    path: String,
    status: u16,
    body: String,
    delay: Option<Duration>,
}

impl Route {
    pub fn json(
        method: impl Into<String>,
        path: impl Into<String>,
        status: u16,
        body: serde_json::Value,
    ) -> Self {
        Self::text(method, path, status, body.to_string())
    }

    pub fn empty(method: impl Into<String>, path: impl Into<String>, status: u16) -> Self {
        Self::text(method, path, status, "")
    }

    pub fn text(
        method: impl Into<String>,
        path: impl Into<String>,
        status: u16,
        body: impl Into<String>,
    ) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            status,
            body: body.into(),
            delay: None,
        }
    }

    /// Hold the response back for `delay` before answering.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// A request as the server received it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    }

    /// Form body decoded into pairs.
    pub fn form(&self) -> Vec<(String, String)> {
        serde_urlencoded::from_str(&self.body).unwrap_or_default()
    }

    pub fn form_value(&self, key: &str) -> Option<String> {
        self.form()
            .into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

pub struct MockServer {
    pub url: String,
    log: Arc<Mutex<Vec<RecordedRequest>>>,
    _handle: tokio::task::JoinHandle<()>,
}

impl MockServer {
    /// Bind to an ephemeral port and start serving. Unknown routes get 404.
    pub async fn start(routes: Vec<Route>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let log: Arc<Mutex<Vec<RecordedRequest>>> = Arc::new(Mutex::new(Vec::new()));
        let routes = Arc::new(routes);

        let app_log = log.clone();
        let app = axum::Router::new().fallback(move |request: Request<Body>| {
            let log = app_log.clone();
            let routes = routes.clone();
            async move {
                let method = request.method().to_string();
                let path = request.uri().path().to_string();
                let query = request.uri().query().unwrap_or("").to_string();
                let headers = request
                    .headers()
                    .iter()
                    .map(|(n, v)| (n.to_string(), v.to_str().unwrap_or("").to_string()))
                    .collect();
                let bytes = axum::body::to_bytes(request.into_body(), 10 * 1024 * 1024)
                    .await
                    .unwrap();
                let body = String::from_utf8_lossy(&bytes).to_string();

                log.lock().unwrap().push(RecordedRequest {
                    method: method.clone(),
                    path: path.clone(),
                    query,
                    headers,
                    body,
                });

                let route = routes
                    .iter()
                    .find(|r| r.method.eq_ignore_ascii_case(&method) && r.path == path)
                    .cloned();
                if let Some(delay) = route.as_ref().and_then(|r| r.delay) {
                    tokio::time::sleep(delay).await;
                }

                match route {
                    Some(route) => (
                        StatusCode::from_u16(route.status).unwrap(),
                        [(axum::http::header::CONTENT_TYPE, "application/json")],
                        route.body,
                    ),
                    None => (
                        StatusCode::NOT_FOUND,
                        [(axum::http::header::CONTENT_TYPE, "application/json")],
                        r#"{"code":"not_found"}"#.to_string(),
                    ),
                }
            }
        });

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{addr}"),
            log,
            _handle: handle,
        }
    }

    /// Snapshot of every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.log.lock().unwrap().clone()
    }

    /// Requests received for one path.
    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }
}
