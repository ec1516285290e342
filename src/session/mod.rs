//! File-backed session store.
//!
//! The [`SessionStore`] owns the portal cookies for one account. It is loaded
//! from a JSON file at startup, updated by every HTTP response through the
//! [`reqwest::cookie::CookieStore`] interface, and flushed back to the same
//! file when the client closes. Its cookie set is the only record of whether
//! the client is authenticated.

mod cookie;
mod error;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;

use reqwest::cookie::CookieStore;
use reqwest::header::HeaderValue;
use tracing::{debug, info, instrument, warn};
use url::Url;

pub use cookie::{
    CookieError, CookieUpdate, DEFAULT_MAX_AGE_SECS, StoredCookie, parse_set_cookie, unix_secs,
};
pub use error::SessionError;

/// A session is only reported valid if every cookie outlives this horizon.
pub const VALIDITY_HORIZON_SECS: u64 = 60;

/// Durable cookie jar with expiry-aware validity checks.
///
/// Interior locking exists only because `CookieStore` must be `Send + Sync`;
/// a store is meant to be driven by one client at a time.
#[derive(Debug)]
pub struct SessionStore {
    path: PathBuf,
    cookies: RwLock<Vec<StoredCookie>>,
}

impl SessionStore {
    /// Restores a session from `path`.
    ///
    /// A missing or empty file yields an empty (unauthenticated) store. Cookies
    /// that have already expired are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Read`] if the file exists but cannot be read, or
    /// [`SessionError::Corrupt`] if its content is not a serialized cookie set.
    #[instrument(level = "debug", skip(path), fields(session_file = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let path = path.as_ref().to_path_buf();
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                debug!("no session file; starting unauthenticated");
                return Ok(Self::empty(path));
            }
            Err(error) => return Err(SessionError::read(path, error)),
        };

        if contents.trim().is_empty() {
            return Ok(Self::empty(path));
        }

        let mut cookies: Vec<StoredCookie> =
            serde_json::from_str(&contents).map_err(|source| SessionError::Corrupt {
                path: path.clone(),
                source,
            })?;
        let now = now_unix();
        let total = cookies.len();
        cookies.retain(|cookie| !cookie.is_expired_at(now));
        debug!(
            loaded = cookies.len(),
            dropped_expired = total - cookies.len(),
            "restored session cookies"
        );

        Ok(Self {
            path,
            cookies: RwLock::new(cookies),
        })
    }

    /// An empty store that will flush to `path`, without reading it.
    #[must_use]
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cookies: RwLock::new(Vec::new()),
        }
    }

    /// Path of the backing session file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records the `Set-Cookie` headers of a response for `url`.
    pub fn record_cookies<'a>(&self, url: &Url, set_cookie_headers: impl IntoIterator<Item = &'a str>) {
        self.record_cookies_at(url, set_cookie_headers, now_unix());
    }

    /// Records `Set-Cookie` headers as if received at `now` (unix seconds).
    ///
    /// Cookies without `Max-Age` expire [`DEFAULT_MAX_AGE_SECS`] after `now`.
    pub fn record_cookies_at<'a>(
        &self,
        url: &Url,
        set_cookie_headers: impl IntoIterator<Item = &'a str>,
        now: u64,
    ) {
        let mut cookies = self.write();
        for header in set_cookie_headers {
            match parse_set_cookie(header, url, now) {
                Ok(CookieUpdate::Store(cookie)) => {
                    debug!(
                        domain = %cookie.domain,
                        name = %cookie.name,
                        expires = cookie.expires,
                        "recorded cookie"
                    );
                    cookies.retain(|existing| {
                        !existing.same_slot(&cookie.domain, &cookie.path, &cookie.name)
                    });
                    cookies.push(cookie);
                }
                Ok(CookieUpdate::Remove { domain, path, name }) => {
                    debug!(domain = %domain, name = %name, "removed cookie");
                    cookies.retain(|existing| !existing.same_slot(&domain, &path, &name));
                }
                Err(error) => {
                    warn!(url = %url, reason = %error, "skipping unusable Set-Cookie header");
                }
            }
        }
    }

    /// Returns true if the store holds a session that is not about to expire.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(now_unix())
    }

    /// Validity check against an explicit clock (unix seconds).
    ///
    /// Requires at least one cookie, and every cookie must expire strictly after
    /// `now + VALIDITY_HORIZON_SECS`.
    #[must_use]
    pub fn is_valid_at(&self, now: u64) -> bool {
        let horizon = now.saturating_add(VALIDITY_HORIZON_SECS);
        let cookies = self.read();
        !cookies.is_empty() && cookies.iter().all(|cookie| cookie.expires > horizon)
    }

    /// Discards every stored cookie.
    pub fn clear(&self) {
        let mut cookies = self.write();
        debug!(discarded = cookies.len(), "clearing session cookies");
        cookies.clear();
    }

    /// Number of stored cookies, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns true if no cookies are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Earliest expiry across stored cookies, if any.
    #[must_use]
    pub fn earliest_expiry(&self) -> Option<u64> {
        self.read().iter().map(|cookie| cookie.expires).min()
    }

    /// Snapshot of the stored cookies.
    #[must_use]
    pub fn cookies(&self) -> Vec<StoredCookie> {
        self.read().clone()
    }

    /// Writes the non-expired cookies to the backing file.
    ///
    /// The file is written to a sibling temp file and renamed into place, with
    /// owner-only permissions on Unix.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Write`] when the directory, temp file, or rename
    /// fails, and [`SessionError::Serialize`] if encoding fails.
    #[instrument(level = "debug", skip(self), fields(session_file = %self.path.display()))]
    pub fn flush(&self) -> Result<(), SessionError> {
        let now = now_unix();
        let live: Vec<StoredCookie> = self
            .read()
            .iter()
            .filter(|cookie| !cookie.is_expired_at(now))
            .cloned()
            .collect();
        let payload = serde_json::to_vec_pretty(&live)?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| SessionError::write(&self.path, e))?;
        }

        let temp_path = temp_path_for(&self.path);
        fs::write(&temp_path, &payload).map_err(|e| SessionError::write(&temp_path, e))?;
        set_owner_only_permissions(&temp_path).map_err(|e| SessionError::write(&temp_path, e))?;
        if let Err(error) = fs::rename(&temp_path, &self.path) {
            let _ = fs::remove_file(&temp_path);
            return Err(SessionError::write(&self.path, error));
        }

        info!(cookies = live.len(), "session flushed");
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<StoredCookie>> {
        self.cookies.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<StoredCookie>> {
        self.cookies.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CookieStore for SessionStore {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let headers: Vec<&str> = cookie_headers
            .filter_map(|value| match value.to_str() {
                Ok(header) => Some(header),
                Err(_) => {
                    warn!(url = %url, "skipping non-ASCII Set-Cookie header");
                    None
                }
            })
            .collect();
        self.record_cookies(url, headers);
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        let now = now_unix();
        let header = self
            .read()
            .iter()
            .filter(|cookie| cookie.matches_request(url, now))
            .map(|cookie| format!("{}={}", cookie.name, cookie.value()))
            .collect::<Vec<_>>()
            .join("; ");
        if header.is_empty() {
            return None;
        }
        HeaderValue::from_str(&header).ok()
    }
}

/// Current wall-clock time in unix seconds.
#[must_use]
pub fn now_unix() -> u64 {
    unix_secs(SystemTime::now())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "session".to_string());
    path.with_file_name(format!(".{file_name}.tmp"))
}

#[cfg(unix)]
fn set_owner_only_permissions(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn set_owner_only_permissions(_path: &Path) -> io::Result<()> {
    Ok(())
}
