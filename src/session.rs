//! Client-side authentication lifecycle.
//!
//! ```text
//!             check_auth ok                 logout / failed check_auth
//!  Loading ─────────────────▶ Authenticated ─────────────────────────▶ Unauthenticated
//!     │                            ▲                                         │
//!     └─── no token / check fails ─┼────────────────────────────────────────▶│
//!                                  └──────── handle_google_callback ◀────────┘
//! ```

use tokio::sync::watch;

use crate::api::ApiClient;
use crate::config::ClientConfig;
use crate::error::Error;
use crate::types::User;

/// Authentication status as seen by the presentation layer.
///
/// "Authenticated" and "has a user" are the same variant, so they cannot
/// disagree.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Process start, before the first [`SessionManager::check_auth`] resolves.
    #[default]
    Loading,
    Authenticated(User),
    Unauthenticated,
}

impl SessionState {
    #[must_use]
    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

/// Owns [`SessionState`] and the token side effects of login and logout.
///
/// State is published through a [`watch`] channel; [`subscribe`](Self::subscribe)
/// to observe transitions, or read a snapshot with [`state`](Self::state).
#[derive(Debug)]
pub struct SessionManager {
    api: ApiClient,
    redirect_uri: String,
    state: watch::Sender<SessionState>,
}

impl SessionManager {
    #[must_use]
    pub fn new(api: ApiClient, config: &ClientConfig) -> Self {
        Self {
            api,
            redirect_uri: config.redirect_uri().to_string(),
            state: watch::Sender::new(SessionState::Loading),
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Resolve the session from the stored access token.
    ///
    /// No token means logged out. A token the server does not accept, or
    /// any failure reaching it, also means logged out: both tokens are
    /// deleted and nothing is retried.
    pub async fn check_auth(&self) -> SessionState {
        let Some(token) = self.api.tokens().access_token() else {
            return self.set(SessionState::Unauthenticated);
        };

        match self.api.current_user(&token).await {
            Ok(user) => {
                tracing::debug!(email = %user.email, "Session check succeeded");
                self.set(SessionState::Authenticated(user))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Session check failed, clearing tokens");
                self.clear_tokens();
                self.set(SessionState::Unauthenticated)
            }
        }
    }

    /// Exchange the authorization code from the callback redirect, store the
    /// resulting tokens, and re-check the session.
    ///
    /// A response without an access token (missing or empty) leaves
    /// everything as it was.
    ///
    /// # Errors
    ///
    /// Returns the exchange failure ([`Error::Http`] or [`Error::Api`]) or a
    /// token store write failure. Session state is untouched in that case.
    pub async fn handle_google_callback(&self, code: &str) -> Result<SessionState, Error> {
        tracing::debug!(redirect_uri = %self.redirect_uri, "Exchanging authorization code");

        let tokens = self
            .api
            .exchange_google_code(code, &self.redirect_uri)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Google callback failed"))?;

        let Some(access_token) = tokens.access_token.as_deref().filter(|t| !t.is_empty()) else {
            tracing::warn!("Code exchange returned no access token");
            return Ok(self.state());
        };

        self.api
            .tokens()
            .store_tokens(
                access_token,
                tokens.refresh_token.as_deref().filter(|t| !t.is_empty()),
            )
            .inspect_err(|e| tracing::error!(error = %e, "Storing tokens failed"))?;

        let state = self.check_auth().await;
        if let Some(user) = state.user() {
            tracing::info!(email = %user.email, "Google login successful");
        }
        Ok(state)
    }

    /// Tell the server the session is over, then drop local credentials.
    ///
    /// Local cleanup always runs. A session still loading stays loading;
    /// anything else becomes unauthenticated.
    ///
    /// # Errors
    ///
    /// Returns the remote failure, after cleanup has already happened.
    pub async fn logout(&self) -> Result<(), Error> {
        let remote = self.api.logout().await;
        if let Err(e) = &remote {
            tracing::warn!(error = %e, "Logout request failed");
        }

        self.clear_tokens();
        self.state.send_modify(|state| {
            if !state.is_loading() {
                *state = SessionState::Unauthenticated;
            }
        });
        tracing::info!("Logged out");

        remote
    }

    fn clear_tokens(&self) {
        if let Err(e) = self.api.tokens().clear_tokens() {
            tracing::error!(error = %e, "Clearing stored tokens failed");
        }
    }

    fn set(&self, state: SessionState) -> SessionState {
        self.state.send_replace(state.clone());
        state
    }
}
