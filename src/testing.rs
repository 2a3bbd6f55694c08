//! Local stand-ins for the completion provider and the identity provider.

use axum::Router;
use axum::extract::{Json, State};
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::animation::openai::ChatCompletion;

pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    format!("http://{addr}")
}

pub fn content_reply(content: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

pub fn function_reply(arguments: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_test",
                    "type": "function",
                    "function": { "name": "create_animation", "arguments": arguments }
                }]
            },
            "finish_reason": "stop"
        }]
    })
}

pub fn content_completion(content: &str) -> ChatCompletion {
    serde_json::from_value(content_reply(content)).unwrap()
}

#[derive(Clone, Default)]
struct Seen {
    body: Option<Value>,
    authorization: Option<String>,
}

/// Answers every chat completion with a canned reply, or with 401 when it has none.
#[derive(Clone)]
pub struct FakeProvider {
    reply: Option<Value>,
    seen: Arc<Mutex<Seen>>,
}

impl FakeProvider {
    pub fn replying(reply: Value) -> Self {
        Self {
            reply: Some(reply),
            seen: Arc::default(),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            seen: Arc::default(),
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/chat/completions", post(chat_completions))
            .with_state(self.clone())
    }

    pub fn last_request(&self) -> Option<Value> {
        self.seen.lock().unwrap().body.clone()
    }

    pub fn last_authorization(&self) -> Option<String> {
        self.seen.lock().unwrap().authorization.clone()
    }
}

async fn chat_completions(
    State(provider): State<FakeProvider>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    *provider.seen.lock().unwrap() = Seen {
        body: Some(body),
        authorization: headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned),
    };

    match provider.reply {
        Some(reply) => Json(reply).into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": { "message": "Incorrect API key provided" } })),
        )
            .into_response(),
    }
}

/// Key the fake identity provider accepts in `x-goog-api-key`.
pub const IDENTITY_API_KEY: &str = "fb-key";

/// Account lookup keyed by identity token. Served as a fallback so the
/// `accounts:lookup` path needs no route pattern.
pub fn fake_identity(accounts: &[(&str, &str)]) -> Router {
    let accounts: Arc<HashMap<String, String>> = Arc::new(
        accounts
            .iter()
            .map(|(token, uid)| (token.to_string(), uid.to_string()))
            .collect(),
    );

    Router::new()
        .fallback(lookup_account)
        .with_state(accounts)
}

/// Identity provider that answers every lookup with a 500.
pub fn failing_identity() -> Router {
    Router::new().fallback(|| async {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": { "code": 500, "message": "BACKEND_ERROR" } })),
        )
    })
}

async fn lookup_account(
    State(accounts): State<Arc<HashMap<String, String>>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let key = headers
        .get("x-goog-api-key")
        .and_then(|value| value.to_str().ok());
    if key != Some(IDENTITY_API_KEY) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": {
                    "code": 400,
                    "message": "API key not valid. Please pass a valid API key."
                }
            })),
        )
            .into_response();
    }

    let uid = body["idToken"]
        .as_str()
        .and_then(|token| accounts.get(token));

    match uid {
        Some(uid) => Json(json!({
            "kind": "identitytoolkit#GetAccountInfoResponse",
            "users": [{ "localId": uid }]
        }))
        .into_response(),
        None => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": { "code": 400, "message": "INVALID_ID_TOKEN" } })),
        )
            .into_response(),
    }
}
