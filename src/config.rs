//! Client configuration.
//!
//! Everything the portal client needs is gathered into one [`ClientConfig`]
//! value built by the caller (the CLI builds it from flags and environment)
//! and handed to [`crate::PortalClient::new`]. Nothing is read from globals.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Default session file name, relative to the working directory.
pub const DEFAULT_SESSION_FILE: &str = "cookies.json";

/// Default attendance group sent with toggle requests.
pub const DEFAULT_ADIT_GROUP_ID: &str = "3";

/// Default timeout for establishing a TCP/TLS connection.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Identity provider base URL.
pub const PRODUCTION_ID_BASE: &str = "https://id.jobcan.jp/";
/// Attendance portal base URL.
pub const PRODUCTION_ATTENDANCE_BASE: &str = "https://ssl.jobcan.jp/";

/// Application key the identity provider expects for the attendance product.
pub const APP_KEY: &str = "atd";

/// Errors raised while building or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No username was supplied.
    #[error("username must be set")]
    MissingUsername,

    /// No password was supplied.
    #[error("password must be set")]
    MissingPassword,

    /// The adit group id is empty.
    #[error("adit group id must not be empty")]
    MissingGroupId,

    /// A base URL could not be parsed.
    #[error("invalid base URL '{value}': {source}")]
    InvalidUrl {
        /// The rejected input.
        value: String,
        /// The underlying parse error.
        #[source]
        source: url::ParseError,
    },
}

/// Portal account credentials.
///
/// The password is redacted in Debug output.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Creates credentials.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Account username (email).
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Account password (sensitive, never log).
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// The four portal URLs the client talks to, plus the browser origin headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalEndpoints {
    /// Identity provider login page (GET).
    pub login_page: Url,
    /// Credential submission (POST, form).
    pub sign_in: Url,
    /// Attendance dashboard (GET).
    pub status_page: Url,
    /// Clock action endpoint (POST, form, JSON response).
    pub toggle: Url,
    /// Value of the `origin` header.
    pub origin: String,
    /// Value of the `referer` header.
    pub referer: String,
}

impl PortalEndpoints {
    /// Production endpoints.
    #[must_use]
    pub fn production() -> Self {
        Self::from_bases(PRODUCTION_ID_BASE, PRODUCTION_ATTENDANCE_BASE)
            .unwrap_or_else(|e| panic!("invalid static portal URL: {e}"))
    }

    /// Builds endpoints from the identity host and attendance host base URLs.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUrl`] when either base does not parse.
    pub fn from_bases(id_base: &str, attendance_base: &str) -> Result<Self, ConfigError> {
        let id = parse_base(id_base)?;
        let attendance = parse_base(attendance_base)?;

        let callback = join(&attendance, "jbcoauth/callback")?;
        let mut login_page = join(&id, "users/sign_in")?;
        login_page
            .query_pairs_mut()
            .append_pair("app_key", APP_KEY)
            .append_pair("redirect_to", callback.as_str());

        let origin = id.origin().ascii_serialization();
        Ok(Self {
            login_page,
            sign_in: join(&id, "users/sign_in")?,
            status_page: join(&attendance, "employee")?,
            toggle: join(&attendance, "employee/index/adit")?,
            referer: format!("{origin}/"),
            origin,
        })
    }
}

impl Default for PortalEndpoints {
    fn default() -> Self {
        Self::production()
    }
}

fn parse_base(value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|source| ConfigError::InvalidUrl {
        value: value.to_string(),
        source,
    })
}

fn join(base: &Url, path: &str) -> Result<Url, ConfigError> {
    base.join(path).map_err(|source| ConfigError::InvalidUrl {
        value: format!("{base}{path}"),
        source,
    })
}

/// Complete configuration for one portal client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Account credentials.
    pub credentials: Credentials,
    /// Session file loaded at construction and written at close.
    pub session_path: PathBuf,
    /// Portal URLs.
    pub endpoints: PortalEndpoints,
    /// `adit_group_id` form value for toggle requests.
    pub adit_group_id: String,
    /// Connect timeout for the HTTP client.
    pub connect_timeout: Duration,
}

impl ClientConfig {
    /// Creates a configuration with production endpoints and default settings.
    #[must_use]
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        session_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            credentials: Credentials::new(username, password),
            session_path: session_path.into(),
            endpoints: PortalEndpoints::production(),
            adit_group_id: DEFAULT_ADIT_GROUP_ID.to_string(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }

    /// Replaces the portal endpoints.
    #[must_use]
    pub fn with_endpoints(mut self, endpoints: PortalEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Replaces the adit group id.
    #[must_use]
    pub fn with_adit_group_id(mut self, group_id: impl Into<String>) -> Self {
        self.adit_group_id = group_id.into();
        self
    }

    /// Checks that required values are present.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for an empty username, password, or group id.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.credentials.username().trim().is_empty() {
            return Err(ConfigError::MissingUsername);
        }
        if self.credentials.password().is_empty() {
            return Err(ConfigError::MissingPassword);
        }
        if self.adit_group_id.trim().is_empty() {
            return Err(ConfigError::MissingGroupId);
        }
        Ok(())
    }
}
