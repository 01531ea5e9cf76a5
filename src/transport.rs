//! HTTP Transport
//!
//! The seam between the API clients and the network. Clients describe a
//! request as an [`ApiRequest`]; a transport turns it into an
//! [`ApiResponse`] or a [`TransportError`] when no response arrived at all.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

/// HTTP verbs used by the speaking-practice API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

/// A transport-independent description of one API call
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API origin, starting with `/`
    pub path: String,
    pub query: Vec<(String, String)>,
    /// Bearer credential for authenticated endpoints
    pub bearer: Option<String>,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            bearer: None,
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(Method::Post, path).json(body)
    }

    pub fn put(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(Method::Put, path).json(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn bearer(mut self, token: &str) -> Self {
        self.bearer = Some(token.to_string());
        self
    }

    /// Look up a query parameter by name
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Full URL against `base_url`, with query values percent-encoded
    pub fn url(&self, base_url: &str) -> String {
        let mut url = format!("{}{}", base_url.trim_end_matches('/'), self.path);

        for (i, (key, value)) in self.query.iter().enumerate() {
            url.push(if i == 0 { '?' } else { '&' });
            url.push_str(&urlencoding::encode(key));
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }

        url
    }
}

/// Status and raw body of a completed exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The request produced no HTTP response
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Anything that can carry an [`ApiRequest`] to the API
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;
}

/// Production transport over reqwest
pub struct ReqwestTransport {
    client: Client,
    base_url: String,
}

impl ReqwestTransport {
    /// Create a transport for `base_url` with a per-request timeout
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("speaking-console/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = request.url(&self.base_url);
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        tracing::debug!(method = request.method.as_str(), url = %url, "Sending API request");

        let mut builder = self.client.request(method, &url);
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError("request timed out".to_string())
            } else if e.is_connect() {
                TransportError(format!("failed to connect to {}", self.base_url))
            } else {
                TransportError(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError(e.to_string()))?;

        tracing::debug!(status, "Received API response");

        Ok(ApiResponse { status, body })
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Bytes,
        http::{HeaderMap, Method as HttpMethod, StatusCode, Uri},
        response::{IntoResponse, Response},
        Json, Router,
    };
    use serde_json::json;

    async fn echo(method: HttpMethod, uri: Uri, headers: HeaderMap, body: Bytes) -> Response {
        if uri.path() == "/unauthorized" {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "detail": "Invalid token" })),
            )
                .into_response();
        }

        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap_or(json!(null));

        Json(json!({
            "method": method.as_str(),
            "path": uri.path(),
            "query": uri.query(),
            "authorization": auth,
            "body": body,
        }))
        .into_response()
    }

    async fn spawn_stub_server() -> String {
        let app = Router::new().fallback(echo);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_url_encodes_query() {
        let request = ApiRequest::get("/api/speaking/part1")
            .query("user_id", "anonymous")
            .query("device_id", "a b&c");
        assert_eq!(
            request.url("https://example.com/"),
            "https://example.com/api/speaking/part1?user_id=anonymous&device_id=a%20b%26c"
        );
        assert_eq!(request.query_value("device_id"), Some("a b&c"));
        assert_eq!(request.query_value("duration"), None);
    }

    #[tokio::test]
    async fn test_reqwest_transport_sends_bearer_and_body() {
        let base = spawn_stub_server().await;
        let transport = ReqwestTransport::new(&base, Duration::from_secs(5)).unwrap();

        let response = transport
            .send(ApiRequest::put("/api/speaking/part2/9", json!({ "question": "New?" })).bearer("tok"))
            .await
            .unwrap();
        assert!(response.is_success());

        let echoed: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(echoed["method"], "PUT");
        assert_eq!(echoed["path"], "/api/speaking/part2/9");
        assert_eq!(echoed["authorization"], "Bearer tok");
        assert_eq!(echoed["body"]["question"], "New?");
    }

    #[tokio::test]
    async fn test_reqwest_transport_passes_query_and_error_status() {
        let base = spawn_stub_server().await;
        let transport = ReqwestTransport::new(&base, Duration::from_secs(5)).unwrap();

        let response = transport
            .send(ApiRequest::get("/api/speaking/part1").query("duration", 5))
            .await
            .unwrap();
        let echoed: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(echoed["query"], "duration=5");
        assert_eq!(echoed["authorization"], json!(null));

        let response = transport
            .send(ApiRequest::get("/unauthorized"))
            .await
            .unwrap();
        assert_eq!(response.status, 401);
        assert!(response.body.contains("Invalid token"));
    }

    #[tokio::test]
    async fn test_reqwest_transport_connection_refused() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport =
            ReqwestTransport::new(&format!("http://{}", addr), Duration::from_secs(5)).unwrap();
        let result = transport.send(ApiRequest::get("/api/speaking/count")).await;
        assert!(result.is_err());
    }
}
