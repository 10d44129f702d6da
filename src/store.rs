//! Durable client-side token storage.
//!
//! Tokens live in two named cookies, [`AUTH_COOKIE`] and [`REFRESH_COOKIE`].
//! [`CookieTokenStore`] keeps them in a [`cookie::CookieJar`], optionally
//! mirrored to a cookie file so a session survives process restarts.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use cookie::{Cookie, CookieJar};

use crate::error::Error;

/// Cookie holding the bearer access token.
pub const AUTH_COOKIE: &str = "auth-token";
/// Cookie holding the refresh token. Stored, never exchanged.
pub const REFRESH_COOKIE: &str = "refresh-token";

/// Storage for the session token pair.
///
/// Shared between the session manager (which writes it) and the API client
/// (which reads it before every request), so implementations use interior
/// mutability.
pub trait TokenStore: Send + Sync {
    /// Read a named entry.
    fn get(&self, name: &str) -> Option<String>;

    /// Create or overwrite a named entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the backing storage cannot be written.
    fn set(&self, name: &str, value: &str) -> Result<(), Error>;

    /// Delete a named entry. Deleting a missing entry is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the backing storage cannot be written.
    fn remove(&self, name: &str) -> Result<(), Error>;

    /// The stored access token. An empty value counts as no token.
    fn access_token(&self) -> Option<String> {
        self.get(AUTH_COOKIE).filter(|t| !t.is_empty())
    }

    fn refresh_token(&self) -> Option<String> {
        self.get(REFRESH_COOKIE).filter(|t| !t.is_empty())
    }

    /// Store an access token and, when present, a refresh token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the backing storage cannot be written.
    fn store_tokens(&self, access_token: &str, refresh_token: Option<&str>) -> Result<(), Error> {
        self.set(AUTH_COOKIE, access_token)?;
        if let Some(refresh) = refresh_token {
            self.set(REFRESH_COOKIE, refresh)?;
        }
        Ok(())
    }

    /// Delete both tokens.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the backing storage cannot be written.
    fn clear_tokens(&self) -> Result<(), Error> {
        self.remove(AUTH_COOKIE)?;
        self.remove(REFRESH_COOKIE)
    }
}

/// Cookie-jar token store, in memory or backed by a cookie file.
///
/// The file holds one percent-encoded `name=value; Path=/` line per live
/// cookie. It is rewritten on every change by replacing it with a fresh
/// owner-only file, so readers never see a half-written jar.
#[derive(Debug)]
pub struct CookieTokenStore {
    jar: Mutex<CookieJar>,
    path: Option<PathBuf>,
}

impl CookieTokenStore {
    /// A store that lives only as long as the process.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            jar: Mutex::new(CookieJar::new()),
            path: None,
        }
    }

    /// Open (or start) a cookie file at `path`.
    ///
    /// A missing file is an empty store; it is created on the first write.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the file exists but cannot be read or
    /// contains a malformed line.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();
        let mut jar = CookieJar::new();

        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                for line in contents.lines().map(str::trim).filter(|l| !l.is_empty()) {
                    let cookie = Cookie::parse_encoded(line.to_owned()).map_err(|e| {
                        Error::Store(format!("{}: malformed cookie line: {e}", path.display()))
                    })?;
                    jar.add_original(cookie);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(Error::Store(format!("{}: {e}", path.display()))),
        }

        tracing::debug!(path = %path.display(), "Opened cookie file");

        Ok(Self {
            jar: Mutex::new(jar),
            path: Some(path),
        })
    }

    /// Backing file, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> MutexGuard<'_, CookieJar> {
        self.jar.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, jar: &CookieJar) -> Result<(), Error> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let store_err = |e: &dyn std::fmt::Display| Error::Store(format!("{}: {e}", path.display()));

        let contents: String = jar.iter().map(|c| format!("{}\n", c.encoded())).collect();
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };

        // NamedTempFile is created 0600 on unix.
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| store_err(&e))?;
        tmp.write_all(contents.as_bytes()).map_err(|e| store_err(&e))?;
        tmp.as_file().sync_all().map_err(|e| store_err(&e))?;
        tmp.persist(path).map_err(|e| store_err(&e.error))?;
        Ok(())
    }
}

impl Default for CookieTokenStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

fn token_cookie(name: &str, value: &str) -> Cookie<'static> {
    Cookie::build((name.to_owned(), value.to_owned()))
        .path("/")
        .build()
}

impl TokenStore for CookieTokenStore {
    fn get(&self, name: &str) -> Option<String> {
        self.lock().get(name).map(|c| c.value().to_owned())
    }

    fn set(&self, name: &str, value: &str) -> Result<(), Error> {
        let mut jar = self.lock();
        jar.add(token_cookie(name, value));
        self.persist(&jar)
    }

    fn remove(&self, name: &str) -> Result<(), Error> {
        let mut jar = self.lock();
        if jar.get(name).is_none() {
            return Ok(());
        }
        jar.remove(token_cookie(name, ""));
        self.persist(&jar)
    }
}
