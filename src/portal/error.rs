//! Error types for portal operations.

use std::fmt;

use thiserror::Error;

use crate::config::ConfigError;
use crate::extract::ExtractError;
use crate::session::SessionError;

/// The request within a logical operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// GET of the identity provider login page.
    LoginPage,
    /// POST of the credentials form.
    SignIn,
    /// GET of the attendance dashboard.
    StatusPage,
    /// POST of the clock action.
    Toggle,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::LoginPage => "login page",
            Self::SignIn => "sign in",
            Self::StatusPage => "status page",
            Self::Toggle => "toggle",
        };
        f.write_str(label)
    }
}

/// Errors returned by [`crate::PortalClient`] operations.
#[derive(Debug, Error)]
pub enum PortalError {
    /// The portal could not be reached (DNS, connect, TLS, reset, body read).
    #[error("{step} request to {url} failed: {source}")]
    Transport {
        /// Failing step.
        step: Step,
        /// Requested URL.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// The portal answered with something other than 200 OK.
    #[error("{step} returned HTTP {status} from {url}")]
    HttpStatus {
        /// Failing step.
        step: Step,
        /// Requested URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// An expected token, status, or JSON field was missing from a response.
    #[error("{step} response could not be parsed: {source}")]
    Parse {
        /// Failing step.
        step: Step,
        /// What was missing.
        #[source]
        source: ExtractError,
    },

    /// The operation's deadline passed before the step completed.
    #[error("{step} timed out: deadline exceeded")]
    Timeout {
        /// Step in flight when the deadline passed.
        step: Step,
    },

    /// The session file could not be read or written.
    #[error(transparent)]
    Persistence(#[from] SessionError),

    /// The client configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),
}

impl PortalError {
    /// Creates a transport error.
    pub fn transport(step: Step, url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            step,
            url: url.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(step: Step, url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            step,
            url: url.into(),
            status,
        }
    }

    /// Creates a parse error.
    pub fn parse(step: Step, source: ExtractError) -> Self {
        Self::Parse { step, source }
    }

    /// Returns the step that failed, for errors tied to a request.
    #[must_use]
    pub fn step(&self) -> Option<Step> {
        match self {
            Self::Transport { step, .. }
            | Self::HttpStatus { step, .. }
            | Self::Parse { step, .. }
            | Self::Timeout { step } => Some(*step),
            Self::Persistence(_) | Self::Config(_) | Self::ClientBuild(_) => None,
        }
    }
}
