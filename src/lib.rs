#![doc = include_str!("../README.md")]

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod oauth;
pub mod session;
pub mod store;
pub mod tasks;
pub mod types;

// Re-exports for convenient access
pub use api::ApiClient;
pub use app::TaskTracker;
pub use config::ClientConfig;
pub use error::Error;
pub use oauth::{CallbackOutcome, TokenResponse, authorization_url, callback_code};
pub use session::{SessionManager, SessionState};
pub use store::{AUTH_COOKIE, CookieTokenStore, REFRESH_COOKIE, TokenStore};
pub use tasks::TaskListManager;
pub use types::{Task, TaskId, User};
