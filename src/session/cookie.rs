//! `Set-Cookie` parsing, cookie scoping, and the persisted cookie record.
//!
//! Parses response `Set-Cookie` headers into [`StoredCookie`] records and
//! answers the request-side question of which stored cookies apply to a URL
//! (domain, path, and secure matching per RFC 6265 section 5).

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

/// Lifetime assigned to cookies that arrive without an explicit `Max-Age`.
///
/// The portal omits `Max-Age` on its session cookies; without a default they
/// would count as already expired and the session would never validate.
pub const DEFAULT_MAX_AGE_SECS: u64 = 1800;

/// A single cookie as held by the session store and written to the session file.
///
/// The value field is redacted in Debug output so session secrets never reach logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCookie {
    /// Domain the cookie is scoped to, lowercase and without a leading dot.
    pub domain: String,
    /// True when the cookie had no `Domain` attribute (exact host match only).
    pub host_only: bool,
    /// URL path scope for the cookie.
    pub path: String,
    /// Whether the cookie is only sent over HTTPS.
    pub secure: bool,
    /// Whether the cookie carried the `HttpOnly` flag.
    pub http_only: bool,
    /// Unix timestamp (seconds) after which the cookie is expired.
    pub expires: u64,
    /// Cookie name.
    pub name: String,
    /// Cookie value (sensitive, never log).
    value: String,
}

impl StoredCookie {
    /// Creates a cookie record.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        domain: impl Into<String>,
        host_only: bool,
        path: impl Into<String>,
        secure: bool,
        http_only: bool,
        expires: u64,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            host_only,
            path: path.into(),
            secure,
            http_only,
            expires,
            name: name.into(),
            value: value.into(),
        }
    }

    /// Returns the cookie value.
    ///
    /// Cookie values are sensitive, avoid logging the return value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns true if the cookie has expired at `now` (unix seconds).
    #[must_use]
    pub fn is_expired_at(&self, now: u64) -> bool {
        self.expires <= now
    }

    /// Returns true if another cookie with the same name occupies the same slot.
    #[must_use]
    pub fn same_slot(&self, domain: &str, path: &str, name: &str) -> bool {
        self.domain == domain && self.path == path && self.name == name
    }

    /// Returns true if this cookie should be attached to a request for `url` at `now`.
    #[must_use]
    pub fn matches_request(&self, url: &Url, now: u64) -> bool {
        if self.is_expired_at(now) {
            return false;
        }
        if self.secure && url.scheme() != "https" {
            return false;
        }
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        let domain_ok = if self.host_only {
            host == self.domain
        } else {
            domain_matches(&host, &self.domain)
        };
        domain_ok && path_matches(url.path(), &self.path)
    }
}

impl fmt::Debug for StoredCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredCookie")
            .field("domain", &self.domain)
            .field("host_only", &self.host_only)
            .field("path", &self.path)
            .field("secure", &self.secure)
            .field("http_only", &self.http_only)
            .field("expires", &self.expires)
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// Errors raised while interpreting a single `Set-Cookie` header.
#[derive(Debug, thiserror::Error)]
pub enum CookieError {
    /// The header does not start with a `name=value` pair.
    #[error("missing name=value pair")]
    MissingNameValue,

    /// The cookie name is empty.
    #[error("cookie name is empty")]
    EmptyName,

    /// The request URL has no host to scope the cookie to.
    #[error("request URL has no host")]
    NoHost,

    /// The `Domain` attribute names a bare top-level label such as `jp`.
    #[error("domain attribute '{domain}' is too broad")]
    DomainTooBroad {
        /// Domain attribute from the header.
        domain: String,
    },

    /// The `Domain` attribute does not cover the responding host.
    #[error("domain attribute '{domain}' does not match host '{host}'")]
    DomainMismatch {
        /// Domain attribute from the header.
        domain: String,
        /// Host the response came from.
        host: String,
    },
}

/// What a `Set-Cookie` header asks the store to do.
#[derive(Debug)]
pub enum CookieUpdate {
    /// Insert or replace a cookie.
    Store(StoredCookie),
    /// Delete the cookie in the given slot (`Max-Age <= 0`).
    Remove {
        /// Cookie domain.
        domain: String,
        /// Cookie path.
        path: String,
        /// Cookie name.
        name: String,
    },
}

/// Parses one `Set-Cookie` header received from `request_url` at `now` (unix seconds).
///
/// A missing `Max-Age` yields an expiry of `now + DEFAULT_MAX_AGE_SECS`; `Expires`
/// is ignored.
///
/// # Errors
///
/// Returns [`CookieError`] when the header is malformed or its `Domain` attribute
/// does not match the request host.
pub fn parse_set_cookie(
    header: &str,
    request_url: &Url,
    now: u64,
) -> Result<CookieUpdate, CookieError> {
    let mut parts = header.split(';');
    let pair = parts.next().unwrap_or_default();
    let (name, value) = pair.split_once('=').ok_or(CookieError::MissingNameValue)?;
    let name = name.trim();
    if name.is_empty() {
        return Err(CookieError::EmptyName);
    }
    let value = value.trim().trim_matches('"');

    let host = request_url
        .host_str()
        .ok_or(CookieError::NoHost)?
        .to_ascii_lowercase();

    let mut domain_attr: Option<String> = None;
    let mut path_attr: Option<String> = None;
    let mut max_age: Option<i64> = None;
    let mut secure = false;
    let mut http_only = false;

    for attribute in parts {
        let (key, val) = match attribute.split_once('=') {
            Some((key, val)) => (key.trim(), val.trim()),
            None => (attribute.trim(), ""),
        };
        match key.to_ascii_lowercase().as_str() {
            "domain" => {
                let domain = val.trim_start_matches('.').to_ascii_lowercase();
                if !domain.is_empty() {
                    domain_attr = Some(domain);
                }
            }
            "path" => {
                if val.starts_with('/') {
                    path_attr = Some(val.to_string());
                }
            }
            "max-age" => {
                if let Ok(secs) = val.parse::<i64>() {
                    max_age = Some(secs);
                }
            }
            "secure" => secure = true,
            "httponly" => http_only = true,
            _ => {}
        }
    }

    let (domain, host_only) = match domain_attr {
        Some(domain) => {
            if !domain.contains('.') && domain != host {
                return Err(CookieError::DomainTooBroad { domain });
            }
            if !domain_matches(&host, &domain) {
                return Err(CookieError::DomainMismatch { domain, host });
            }
            (domain, false)
        }
        None => (host, true),
    };
    let path = path_attr.unwrap_or_else(|| default_path(request_url));

    let expires = match max_age {
        Some(secs) if secs <= 0 => None,
        Some(secs) => Some(now.saturating_add(secs.unsigned_abs())),
        None => Some(now.saturating_add(DEFAULT_MAX_AGE_SECS)),
    };

    Ok(match expires {
        Some(expires) => CookieUpdate::Store(StoredCookie::new(
            domain, host_only, path, secure, http_only, expires, name, value,
        )),
        None => CookieUpdate::Remove {
            domain,
            path,
            name: name.to_string(),
        },
    })
}

/// Converts a `SystemTime` to unix seconds, clamping pre-epoch times to zero.
#[must_use]
pub fn unix_secs(at: std::time::SystemTime) -> u64 {
    at.duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

/// RFC 6265 domain-match: exact host, or a subdomain of `domain` (never for IPs).
fn domain_matches(host: &str, domain: &str) -> bool {
    if host == domain {
        return true;
    }
    if host.parse::<std::net::IpAddr>().is_ok() {
        return false;
    }
    host.strip_suffix(domain)
        .is_some_and(|prefix| prefix.ends_with('.'))
}

/// RFC 6265 path-match.
fn path_matches(request_path: &str, cookie_path: &str) -> bool {
    if request_path == cookie_path {
        return true;
    }
    request_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/')
            || request_path[cookie_path.len()..].starts_with('/'))
}

/// RFC 6265 default-path: the request path up to, not including, its last `/`.
fn default_path(url: &Url) -> String {
    let path = url.path();
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => path[..idx].to_string(),
    }
}
