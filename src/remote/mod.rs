//! Remote API Clients
//!
//! Thin clients for the speaking-practice REST API. Each operation maps to
//! one endpoint and returns either the decoded payload or a [`ClientError`]
//! whose text is shown to the user unchanged.
//!
//! ## Error mapping
//!
//! - no response at all: [`ClientError::Network`]
//! - non-2xx: the body's `detail` field as [`ClientError::Server`]
//! - 2xx with an unexpected body: [`ClientError::Parse`]
//!
//! Nothing is retried.

mod auth;
mod metrics;
mod questions;

pub use auth::AuthClient;
pub use metrics::{duration_series, MetricsClient};
pub use questions::{
    practice_request, QuestionClient, QuestionCommand, CREATE_REQUIRED, UPDATE_REQUIRED,
};

use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::error::{ClientError, ClientResult};
use crate::transport::{ApiRequest, ApiResponse, HttpTransport};

/// Shared request executor used by every remote client
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn HttpTransport>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// The underlying transport, for callers that fire detached requests
    pub fn transport(&self) -> Arc<dyn HttpTransport> {
        Arc::clone(&self.transport)
    }

    /// Send a request and decode a 2xx body as `T`
    pub async fn execute<T: DeserializeOwned>(&self, request: ApiRequest) -> ClientResult<T> {
        self.execute_with_fallback(request, None).await
    }

    /// Like [`execute`](Self::execute), using `fallback` as the error text
    /// when a failed response carries no `detail`
    pub async fn execute_with_fallback<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
        fallback: Option<&str>,
    ) -> ClientResult<T> {
        let method = request.method.as_str();
        let path = request.path.clone();

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        decode_response(method, &path, response, fallback)
    }
}

fn decode_response<T: DeserializeOwned>(
    method: &str,
    path: &str,
    response: ApiResponse,
    fallback: Option<&str>,
) -> ClientResult<T> {
    if !response.is_success() {
        let detail = detail_message(&response.body).unwrap_or_else(|| match fallback {
            Some(text) => text.to_string(),
            None => format!("Request failed with status {}", response.status),
        });
        tracing::warn!(method, path, status = response.status, detail = %detail, "API request failed");
        return Err(ClientError::Server {
            status: response.status,
            detail,
        });
    }

    // Some endpoints answer 2xx with no body at all
    let body = if response.body.trim().is_empty() {
        "{}"
    } else {
        response.body.as_str()
    };

    serde_json::from_str(body).map_err(|e| ClientError::Parse(e.to_string()))
}

/// Extract the server's `detail` message from an error body
///
/// FastAPI-style validation errors carry a list of objects in `detail`;
/// their `msg` fields are joined.
fn detail_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Array(items) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                .collect();
            if messages.is_empty() {
                None
            } else {
                Some(messages.join("; "))
            }
        }
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}
