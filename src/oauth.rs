use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::ClientConfig;
use crate::types::User;

/// Build the Google consent-screen URL for the authorization-code flow.
///
/// `access_type=offline` and `prompt=consent` make Google issue a refresh
/// token on every login, which the backend passes through.
#[must_use]
pub fn authorization_url(config: &ClientConfig) -> Url {
    let scope = config.scopes.join(" ");

    let mut url = config.auth_url.clone();
    url.query_pairs_mut()
        .append_pair("client_id", &config.google_client_id)
        .append_pair("redirect_uri", config.redirect_uri.as_str())
        .append_pair("response_type", "code")
        .append_pair("scope", &scope)
        .append_pair("access_type", "offline")
        .append_pair("prompt", "consent");
    url
}

/// Body of `POST /auth/google/`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct CodeExchange<'a> {
    pub(crate) code: &'a str,
    pub(crate) redirect_uri: &'a str,
}

/// Response from the backend's code exchange.
///
/// The backend answers 2xx only with tokens, but a body without
/// `access_token` is tolerated and leaves the session untouched.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
}

/// Where the callback page sends the browser once it is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Code exchanged; go home.
    SignedIn,
    /// The redirect carried no `code` parameter.
    NoCode,
    /// The backend rejected the code or could not be reached.
    AuthFailed,
}

impl CallbackOutcome {
    /// Error tag carried in the `error` query parameter on the home path.
    #[must_use]
    pub fn error_code(self) -> Option<&'static str> {
        match self {
            Self::SignedIn => None,
            Self::NoCode => Some("no_code"),
            Self::AuthFailed => Some("auth_failed"),
        }
    }

    /// Path to redirect to: `/` or `/?error=<tag>`.
    #[must_use]
    pub fn redirect_target(self) -> String {
        match self.error_code() {
            None => "/".to_string(),
            Some(code) => format!("/?error={}", urlencoding::encode(code)),
        }
    }
}

/// Pull the non-empty `code` query parameter out of a callback URL.
#[must_use]
pub fn callback_code(callback: &Url) -> Option<String> {
    callback
        .query_pairs()
        .find(|(k, _)| k == "code")
        .map(|(_, v)| v.into_owned())
        .filter(|code| !code.is_empty())
}
