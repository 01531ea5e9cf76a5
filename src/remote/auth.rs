//! Admin authentication endpoint

use serde::Deserialize;
use serde_json::json;

use super::ApiClient;
use crate::error::ClientResult;
use crate::transport::ApiRequest;

const LOGIN_PATH: &str = "/api/auth/admin-login";

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access_token: String,
}

/// Client for `POST /api/auth/admin-login`
#[derive(Clone)]
pub struct AuthClient {
    api: ApiClient,
}

impl AuthClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Exchange admin credentials for a bearer token
    pub async fn login(&self, username: &str, password: &str) -> ClientResult<String> {
        let body = json!({ "username": username, "password": password });

        let response: LoginResponse = self
            .api
            .execute_with_fallback(ApiRequest::post(LOGIN_PATH, body), Some("Login failed"))
            .await?;

        Ok(response.access_token)
    }
}
