use url::Url;

use crate::error::Error;

const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_APP_ORIGIN: &str = "http://localhost:3000";
const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
/// Path the consent screen redirects back to, relative to the app origin.
pub const CALLBACK_PATH: &str = "/auth/callback";

/// Task Tracker client configuration.
///
/// Required fields are constructor parameters; everything else has a
/// default and a `with_*` override.
///
/// ```rust,ignore
/// use tasktrack_client::ClientConfig;
///
/// let config = ClientConfig::new(
///     "1234.apps.googleusercontent.com",
///     "https://tasks.example.com/auth/callback".parse()?,
/// )
/// .with_api_url("https://api.tasks.example.com".parse()?);
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ClientConfig {
    pub(crate) api_url: Url,
    pub(crate) google_client_id: String,
    pub(crate) redirect_uri: Url,
    pub(crate) auth_url: Url,
    pub(crate) scopes: Vec<String>,
}

impl ClientConfig {
    #[must_use]
    pub fn new(google_client_id: impl Into<String>, redirect_uri: Url) -> Self {
        Self {
            api_url: normalize_base(parse_default(DEFAULT_API_URL)),
            google_client_id: google_client_id.into(),
            redirect_uri,
            auth_url: parse_default(GOOGLE_AUTH_URL),
            scopes: vec!["openid".into(), "email".into(), "profile".into()],
        }
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `GOOGLE_CLIENT_ID`: OAuth2 client ID of the web application
    ///
    /// # Optional env vars
    /// - `TASKTRACK_API_URL`: API base URL (default `http://localhost:8000`)
    /// - `TASKTRACK_APP_ORIGIN`: origin the callback lives on (default `http://localhost:3000`)
    /// - `TASKTRACK_REDIRECT_URI`: full callback URI, overrides the origin-derived one
    /// - `GOOGLE_AUTH_URL`: override the Google consent endpoint
    /// - `GOOGLE_SCOPES`: comma-separated OAuth2 scopes
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the client ID is missing or a URL is invalid.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let client_id = lookup("GOOGLE_CLIENT_ID")
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| Error::Config("GOOGLE_CLIENT_ID is required".into()))?;

        let redirect_uri = match lookup("TASKTRACK_REDIRECT_URI") {
            Some(uri) => parse_var("TASKTRACK_REDIRECT_URI", &uri)?,
            None => {
                let origin = lookup("TASKTRACK_APP_ORIGIN")
                    .unwrap_or_else(|| DEFAULT_APP_ORIGIN.to_string());
                callback_uri(&parse_var("TASKTRACK_APP_ORIGIN", &origin)?)?
            }
        };

        let mut config = Self::new(client_id, redirect_uri);

        if let Some(url) = lookup("TASKTRACK_API_URL") {
            config = config.with_api_url(parse_var("TASKTRACK_API_URL", &url)?);
        }
        if let Some(url) = lookup("GOOGLE_AUTH_URL") {
            config = config.with_auth_url(parse_var("GOOGLE_AUTH_URL", &url)?);
        }
        if let Some(scopes) = lookup("GOOGLE_SCOPES") {
            config = config.with_scopes(
                scopes
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            );
        }

        Ok(config)
    }

    /// Override the API base URL. A missing trailing slash is added so that
    /// endpoint paths join underneath it.
    #[must_use]
    pub fn with_api_url(mut self, url: Url) -> Self {
        self.api_url = normalize_base(url);
        self
    }

    /// Override the Google consent endpoint.
    #[must_use]
    pub fn with_auth_url(mut self, url: Url) -> Self {
        self.auth_url = url;
        self
    }

    /// Override the OAuth2 scopes (default: `["openid", "email", "profile"]`).
    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    #[must_use]
    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    #[must_use]
    pub fn google_client_id(&self) -> &str {
        &self.google_client_id
    }

    /// Callback URI. Sent both in the consent request and in the code
    /// exchange; the provider rejects the exchange unless they match.
    #[must_use]
    pub fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }

    #[must_use]
    pub fn auth_url(&self) -> &Url {
        &self.auth_url
    }

    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }
}

/// `<origin>/auth/callback`.
///
/// # Errors
///
/// Returns [`Error::InvalidUrl`] if the origin cannot be a base URL.
pub fn callback_uri(origin: &Url) -> Result<Url, Error> {
    Ok(origin.join(CALLBACK_PATH)?)
}

fn parse_var(name: &str, value: &str) -> Result<Url, Error> {
    value
        .parse()
        .map_err(|e| Error::Config(format!("{name}: {e}")))
}

fn parse_default(url: &str) -> Url {
    url.parse().expect("valid default URL")
}

fn normalize_base(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_constructor() {
        let config = ClientConfig::new(
            "my-app",
            "https://tasks.example.com/auth/callback".parse().unwrap(),
        );

        assert_eq!(config.google_client_id(), "my-app");
        assert_eq!(config.api_url().as_str(), "http://localhost:8000/");
        assert_eq!(
            config.auth_url().as_str(),
            "https://accounts.google.com/o/oauth2/v2/auth"
        );
        assert_eq!(config.scopes(), &["openid", "email", "profile"]);
    }

    #[test]
    fn test_api_url_gets_trailing_slash() {
        let config = ClientConfig::new("id", "http://localhost:3000/auth/callback".parse().unwrap())
            .with_api_url("https://api.example.com/v1".parse().unwrap());

        assert_eq!(config.api_url().as_str(), "https://api.example.com/v1/");
        assert_eq!(
            config.api_url().join("api/tasks/").unwrap().as_str(),
            "https://api.example.com/v1/api/tasks/"
        );
    }

    #[test]
    fn test_from_env_defaults() {
        let config = ClientConfig::from_lookup(lookup_from(&[("GOOGLE_CLIENT_ID", "cid")])).unwrap();

        assert_eq!(config.google_client_id(), "cid");
        assert_eq!(config.api_url().as_str(), "http://localhost:8000/");
        assert_eq!(
            config.redirect_uri().as_str(),
            "http://localhost:3000/auth/callback"
        );
    }

    #[test]
    fn test_from_env_overrides() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            ("GOOGLE_CLIENT_ID", "cid"),
            ("TASKTRACK_API_URL", "https://api.example.com"),
            ("TASKTRACK_APP_ORIGIN", "https://tasks.example.com"),
            ("GOOGLE_SCOPES", "openid, email"),
        ]))
        .unwrap();

        assert_eq!(config.api_url().as_str(), "https://api.example.com/");
        assert_eq!(
            config.redirect_uri().as_str(),
            "https://tasks.example.com/auth/callback"
        );
        assert_eq!(config.scopes(), &["openid", "email"]);
    }

    #[test]
    fn test_explicit_redirect_uri_wins() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            ("GOOGLE_CLIENT_ID", "cid"),
            ("TASKTRACK_APP_ORIGIN", "https://ignored.example.com"),
            ("TASKTRACK_REDIRECT_URI", "https://tasks.example.com/oauth/done"),
        ]))
        .unwrap();

        assert_eq!(
            config.redirect_uri().as_str(),
            "https://tasks.example.com/oauth/done"
        );
    }

    #[test]
    fn test_from_env_requires_client_id() {
        let err = ClientConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("GOOGLE_CLIENT_ID")));
    }

    #[test]
    fn test_from_env_rejects_bad_url() {
        let err = ClientConfig::from_lookup(lookup_from(&[
            ("GOOGLE_CLIENT_ID", "cid"),
            ("TASKTRACK_API_URL", "not a url"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.starts_with("TASKTRACK_API_URL")));
    }
}
