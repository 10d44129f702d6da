use std::sync::Arc;

use url::Url;

use crate::api::ApiClient;
use crate::config::ClientConfig;
use crate::error::Error;
use crate::oauth::{self, CallbackOutcome};
use crate::session::{SessionManager, SessionState};
use crate::store::TokenStore;
use crate::tasks::TaskListManager;
use crate::types::{Task, TaskId};

/// Wires a [`SessionManager`] and a [`TaskListManager`] to one token store
/// and sequences them the way the home and callback pages do.
///
/// The two managers never call each other; everything that depends on
/// both goes through here.
#[derive(Debug)]
pub struct TaskTracker {
    config: ClientConfig,
    session: SessionManager,
    tasks: TaskListManager,
}

impl TaskTracker {
    #[must_use]
    pub fn new(config: ClientConfig, tokens: Arc<dyn TokenStore>) -> Self {
        let api = ApiClient::new(config.api_url().clone(), tokens);
        Self::with_api_client(config, api)
    }

    /// Build from an existing client (for a custom `reqwest::Client`).
    #[must_use]
    pub fn with_api_client(config: ClientConfig, api: ApiClient) -> Self {
        Self {
            session: SessionManager::new(api.clone(), &config),
            tasks: TaskListManager::new(api),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    #[must_use]
    pub fn tasks(&self) -> &TaskListManager {
        &self.tasks
    }

    /// Where to send the browser to start a Google login.
    #[must_use]
    pub fn login_url(&self) -> Url {
        oauth::authorization_url(&self.config)
    }

    /// Resolve the session, then load tasks if signed in.
    ///
    /// # Errors
    ///
    /// Returns the task fetch failure. The session stays as resolved and
    /// the list is left empty.
    pub async fn load(&self) -> Result<SessionState, Error> {
        let state = self.session.check_auth().await;
        if state.is_authenticated() {
            self.tasks.fetch_tasks().await?;
        }
        Ok(state)
    }

    /// Page load: like [`load`](Self::load), but a failed task fetch only
    /// leaves the list empty and the session state is returned either way.
    pub async fn on_load(&self) -> SessionState {
        self.load()
            .await
            .unwrap_or_else(|_| self.session.state())
    }

    /// Handle the provider's redirect back to the callback path.
    pub async fn complete_login(&self, callback: &Url) -> CallbackOutcome {
        let Some(code) = oauth::callback_code(callback) else {
            tracing::warn!("Callback carried no authorization code");
            return CallbackOutcome::NoCode;
        };

        match self.session.handle_google_callback(&code).await {
            Ok(state) => {
                if state.is_authenticated() {
                    if let Err(e) = self.tasks.fetch_tasks().await {
                        tracing::warn!(error = %e, "Signed in without loading tasks");
                    }
                }
                CallbackOutcome::SignedIn
            }
            Err(e) => {
                tracing::error!(error = %e, "Authentication failed");
                CallbackOutcome::AuthFailed
            }
        }
    }

    /// Add a task from user input. Blank input is ignored (`Ok(None)`);
    /// otherwise the title is sent as typed.
    ///
    /// # Errors
    ///
    /// Returns the create failure.
    pub async fn submit_task(&self, title: &str) -> Result<Option<Task>, Error> {
        if title.trim().is_empty() {
            return Ok(None);
        }
        self.tasks.add_task(title).await.map(Some)
    }

    /// # Errors
    ///
    /// See [`TaskListManager::toggle_task`].
    pub async fn toggle_task(&self, id: TaskId) -> Result<Task, Error> {
        self.tasks.toggle_task(id).await
    }

    /// # Errors
    ///
    /// See [`TaskListManager::delete_task`].
    pub async fn delete_task(&self, id: TaskId) -> Result<(), Error> {
        self.tasks.delete_task(id).await
    }

    /// # Errors
    ///
    /// Returns the remote logout failure; local cleanup has happened regardless.
    pub async fn logout(&self) -> Result<(), Error> {
        self.session.logout().await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::store::CookieTokenStore;

    const CALLBACK: &str = "http://localhost:3000/auth/callback";

    fn tracker(server: &MockServer) -> (TaskTracker, Arc<CookieTokenStore>) {
        let store = Arc::new(CookieTokenStore::in_memory());
        let config = ClientConfig::new("cid", CALLBACK.parse().unwrap())
            .with_api_url(server.uri().parse().unwrap());
        (TaskTracker::new(config, store.clone()), store)
    }

    async fn mount_backend(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/auth/google/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "tok",
                "refresh_token": "ref"
            })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/auth/user/"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "email": "ada@example.com"
            })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/tasks/"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": 1,
                "title": "Buy milk",
                "completed": false,
                "created_at": "2024-05-01T10:00:00Z"
            }])))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_on_load_without_token_skips_tasks() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tasks/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let (tracker, _) = tracker(&server);
        let state = tracker.on_load().await;

        assert_eq!(state, SessionState::Unauthenticated);
        assert!(tracker.tasks().tasks().is_empty());
    }

    #[tokio::test]
    async fn test_on_load_with_token_fetches_tasks() {
        let server = MockServer::start().await;
        mount_backend(&server).await;

        let (tracker, store) = tracker(&server);
        store.store_tokens("tok", None).unwrap();

        assert!(tracker.on_load().await.is_authenticated());
        assert_eq!(tracker.tasks().tasks().len(), 1);
    }

    #[tokio::test]
    async fn test_load_surfaces_fetch_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/user/"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "email": "ada@example.com"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/tasks/"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(2)
            .mount(&server)
            .await;

        let (tracker, store) = tracker(&server);
        store.store_tokens("tok", None).unwrap();

        let err = tracker.load().await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert!(tracker.tasks().tasks().is_empty());
        assert!(tracker.session().state().is_authenticated());

        let state = tracker.on_load().await;
        assert!(state.is_authenticated());
        assert!(tracker.tasks().tasks().is_empty());
    }

    #[tokio::test]
    async fn test_complete_login_signs_in_and_loads_tasks() {
        let server = MockServer::start().await;
        mount_backend(&server).await;

        let (tracker, store) = tracker(&server);
        let callback: Url = format!("{CALLBACK}?code=valid-code").parse().unwrap();

        let outcome = tracker.complete_login(&callback).await;

        assert_eq!(outcome, CallbackOutcome::SignedIn);
        assert_eq!(outcome.redirect_target(), "/");
        assert!(tracker.session().state().is_authenticated());
        assert_eq!(store.refresh_token().as_deref(), Some("ref"));
        assert_eq!(tracker.tasks().tasks()[0].title, "Buy milk");
    }

    #[tokio::test]
    async fn test_complete_login_without_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let (tracker, _) = tracker(&server);
        let callback: Url = format!("{CALLBACK}?error=access_denied").parse().unwrap();

        let outcome = tracker.complete_login(&callback).await;

        assert_eq!(outcome, CallbackOutcome::NoCode);
        assert_eq!(outcome.redirect_target(), "/?error=no_code");
    }

    #[tokio::test]
    async fn test_complete_login_exchange_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/google/"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        let (tracker, _) = tracker(&server);
        let callback: Url = format!("{CALLBACK}?code=expired").parse().unwrap();

        let outcome = tracker.complete_login(&callback).await;

        assert_eq!(outcome, CallbackOutcome::AuthFailed);
        assert_eq!(outcome.redirect_target(), "/?error=auth_failed");
    }

    #[tokio::test]
    async fn test_blank_titles_are_not_sent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/tasks/"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let (tracker, _) = tracker(&server);

        assert_eq!(tracker.submit_task("   ").await.unwrap(), None);
        assert_eq!(tracker.submit_task("").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_login_url_uses_configured_redirect() {
        let server = MockServer::start().await;
        let (tracker, _) = tracker(&server);

        let url = tracker.login_url();
        assert!(url
            .query_pairs()
            .any(|(k, v)| k == "redirect_uri" && v == CALLBACK));
    }
}
