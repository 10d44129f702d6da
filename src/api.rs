use std::sync::Arc;

use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::Error;
use crate::oauth::{CodeExchange, TokenResponse};
use crate::store::TokenStore;
use crate::types::{NewTask, Task, TaskId, TaskPatch, User};

/// HTTP client for the Task Tracker backend.
///
/// Every task and logout request picks up the
/// current access token from the shared [`TokenStore`] just before it is
/// sent, so a login or logout is seen by the next call without rebuilding
/// the client.
#[derive(Clone)]
pub struct ApiClient {
    base: Url,
    http: reqwest::Client,
    tokens: Arc<dyn TokenStore>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient").field("base", &self.base).finish_non_exhaustive()
    }
}

impl ApiClient {
    /// `base` must end with `/`; [`ClientConfig::api_url`](crate::ClientConfig::api_url)
    /// already does.
    #[must_use]
    pub fn new(base: Url, tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            base,
            http: reqwest::Client::new(),
            tokens,
        }
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    #[must_use]
    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    // ── Session endpoints ──────────────────────────────────────────────

    /// `GET /auth/user/` with an explicit bearer token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Api`] if
    /// the token is rejected.
    pub async fn current_user(&self, access_token: &str) -> Result<User, Error> {
        let response = self
            .request(Method::GET, "auth/user/")?
            .bearer_auth(access_token)
            .send()
            .await?;
        Self::json(response, "session check").await
    }

    /// `POST /auth/google/`: trade an authorization code for tokens.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Api`] if
    /// the backend (or Google behind it) rejects the code.
    pub async fn exchange_google_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse, Error> {
        let response = self
            .request(Method::POST, "auth/google/")?
            .json(&CodeExchange { code, redirect_uri })
            .send()
            .await?;
        Self::json(response, "code exchange").await
    }

    /// `POST /auth/logout/` with the stored token, if any.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Api`] on a
    /// non-success status.
    pub async fn logout(&self) -> Result<(), Error> {
        let response = self
            .authorized(Method::POST, "auth/logout/")?
            .json(&serde_json::json!({}))
            .send()
            .await?;
        Self::ensure_success(response, "logout").await?;
        Ok(())
    }

    // ── Task endpoints ─────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns [`Error::Http`] or [`Error::Api`] on failure.
    pub async fn list_tasks(&self) -> Result<Vec<Task>, Error> {
        let response = self.authorized(Method::GET, "api/tasks/")?.send().await?;
        Self::json(response, "fetch tasks").await
    }

    /// # Errors
    ///
    /// Returns [`Error::Http`] or [`Error::Api`] on failure.
    pub async fn create_task(&self, title: &str) -> Result<Task, Error> {
        let response = self
            .authorized(Method::POST, "api/tasks/")?
            .json(&NewTask { title })
            .send()
            .await?;
        Self::json(response, "create task").await
    }

    /// # Errors
    ///
    /// Returns [`Error::Http`] or [`Error::Api`] on failure.
    pub async fn update_task(&self, id: TaskId, completed: bool) -> Result<Task, Error> {
        let response = self
            .authorized(Method::PATCH, &format!("api/tasks/{id}/"))?
            .json(&TaskPatch { completed })
            .send()
            .await?;
        Self::json(response, "update task").await
    }

    /// # Errors
    ///
    /// Returns [`Error::Http`] or [`Error::Api`] on failure.
    pub async fn delete_task(&self, id: TaskId) -> Result<(), Error> {
        let response = self
            .authorized(Method::DELETE, &format!("api/tasks/{id}/"))?
            .send()
            .await?;
        Self::ensure_success(response, "delete task").await?;
        Ok(())
    }

    // ── Helpers ────────────────────────────────────────────────────────

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, Error> {
        let url = self.base.join(path)?;
        tracing::debug!(%method, %url, "API request");
        Ok(self.http.request(method, url))
    }

    /// Build a request and attach `Authorization: Bearer <token>` when a
    /// token is stored. Without one the request goes out bare and the
    /// server decides.
    fn authorized(&self, method: Method, path: &str) -> Result<RequestBuilder, Error> {
        let request = self.request(method, path)?;
        Ok(match self.tokens.access_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        })
    }

    async fn json<T: DeserializeOwned>(
        response: reqwest::Response,
        operation: &'static str,
    ) -> Result<T, Error> {
        let response = Self::ensure_success(response, operation).await?;
        response.json::<T>().await.map_err(Into::into)
    }

    /// Checks HTTP response status; returns the response on success or an error with details.
    async fn ensure_success(
        response: reqwest::Response,
        operation: &'static str,
    ) -> Result<reqwest::Response, Error> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let detail = response.text().await.unwrap_or_default();
        Err(Error::Api {
            operation,
            status,
            detail,
        })
    }
}
