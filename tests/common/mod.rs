#![allow(dead_code)]

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde_json::{json, Value};
use simple_github::ClientConfig;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// What the mock server saw for one request.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub authorization: Option<String>,
    pub accept: Option<String>,
    pub params: HashMap<String, String>,
}

#[derive(Clone, Default)]
struct MockState {
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockState {
    fn record(&self, path: String, headers: &HeaderMap, params: HashMap<String, String>) {
        let header_value = |name: header::HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        self.requests.lock().unwrap().push(RecordedRequest {
            path,
            authorization: header_value(header::AUTHORIZATION),
            accept: header_value(header::ACCEPT),
            params,
        });
    }
}

/// In-process stand-in for both the identity host and the REST API.
pub struct MockGitHub {
    pub base_url: String,
    state: MockState,
    server: JoinHandle<()>,
}

impl MockGitHub {
    pub async fn start() -> Self {
        let state = MockState::default();
        let app = Router::new()
            .route("/login/oauth/access_token", post(access_token))
            .route("/search/repositories", get(search_repositories))
            .route("/repos/:owner/:name", get(repository))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock server");
        let addr = listener.local_addr().expect("Failed to read mock address");
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Mock server failed");
        });

        MockGitHub {
            base_url: format!("http://{}", addr),
            state,
            server,
        }
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig::with_base_urls(&self.base_url, &self.base_url).expect("valid mock URLs")
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }
}

impl Drop for MockGitHub {
    fn drop(&mut self) {
        self.server.abort();
    }
}

pub fn repo_json(id: u64, owner: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "full_name": format!("{}/{}", owner, name),
        "owner": {
            "login": owner,
            "avatar_url": format!("https://avatars.example.com/{}.png", owner),
        },
        "description": "Type-safe HTTP",
        "language": "Java",
        "stargazers_count": 42000,
        "updated_at": "2020-01-02T03:04:05Z",
        "private": false,
        "html_url": format!("https://github.com/{}/{}", owner, name),
    })
}

async fn access_token(
    State(state): State<MockState>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let code = form.get("code").cloned().unwrap_or_default();
    state.record("/login/oauth/access_token".to_string(), &headers, form);

    match code.as_str() {
        "abc123" => Json(json!({
            "access_token": "gho_xyz",
            "token_type": "bearer",
            "scope": ""
        }))
        .into_response(),
        "declined" => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "bad_verification_code" })),
        )
            .into_response(),
        "expired" => Json(json!({
            "error": "bad_verification_code",
            "error_description": "The code passed is incorrect or expired.",
            "error_uri": "https://docs.github.com/apps/troubleshooting"
        }))
        .into_response(),
        "garbage" => (StatusCode::OK, "<html>not json</html>").into_response(),
        "empty-token" => Json(json!({
            "access_token": "",
            "token_type": "bearer",
            "scope": ""
        }))
        .into_response(),
        "slow" => {
            tokio::time::sleep(Duration::from_secs(30)).await;
            StatusCode::GATEWAY_TIMEOUT.into_response()
        }
        _ => (StatusCode::BAD_REQUEST, Json(json!({ "error": "unexpected_code" }))).into_response(),
    }
}

async fn search_repositories(
    State(state): State<MockState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let query = params.get("q").cloned().unwrap_or_default();
    state.record("/search/repositories".to_string(), &headers, params);

    match query.as_str() {
        "retrofit" => Json(json!({
            "total_count": 2,
            "incomplete_results": false,
            "items": [repo_json(1, "square", "retrofit"), repo_json(2, "bumptech", "retrofit-kit")]
        }))
        .into_response(),
        "zzzqqq" => Json(json!({ "total_count": 0, "items": [] })).into_response(),
        "broken" => Json(json!({ "total_count": 1 })).into_response(),
        "inflated" => Json(json!({
            "total_count": 1,
            "items": [repo_json(1, "a", "b"), repo_json(2, "c", "d")]
        }))
        .into_response(),
        "invalid" => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "message": "Validation Failed" })),
        )
            .into_response(),
        "slow" => {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Json(json!({ "total_count": 0, "items": [] })).into_response()
        }
        other => Json(json!({
            "total_count": 1,
            "items": [repo_json(99, "echo", other)]
        }))
        .into_response(),
    }
}

async fn repository(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path((owner, name)): Path<(String, String)>,
) -> Response {
    state.record(format!("/repos/{}/{}", owner, name), &headers, HashMap::new());

    match (owner.as_str(), name.as_str()) {
        ("ghost", "missing") => {
            (StatusCode::NOT_FOUND, Json(json!({ "message": "Not Found" }))).into_response()
        }
        ("boom", _) => (StatusCode::INTERNAL_SERVER_ERROR, "").into_response(),
        ("nulls", _) => {
            let mut repo = repo_json(5, &owner, &name);
            repo["description"] = Value::Null;
            repo["language"] = Value::Null;
            Json(repo).into_response()
        }
        ("negative", _) => {
            let mut repo = repo_json(6, &owner, &name);
            repo["stargazers_count"] = json!(-1);
            Json(repo).into_response()
        }
        _ => Json(repo_json(7, &owner, &name)).into_response(),
    }
}

/// A local port with nothing listening on it.
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to read address");
    drop(listener);
    format!("http://{}", addr)
}
