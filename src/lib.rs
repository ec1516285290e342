//! Jobcan Core Library
//!
//! Session-persistent client for the Jobcan attendance portal: logs in through
//! the portal's browser sign-in flow, keeps the resulting cookies on disk
//! between runs, reads the current work status, and toggles clock in/out.
//!
//! # Architecture
//!
//! - [`session`] - File-backed cookie store with expiry-aware validity
//! - [`extract`] - Token and status extraction from portal responses
//! - [`portal`] - Login, status and toggle operations
//! - [`config`] - Client configuration and portal endpoints
//! - [`user_agent`] - Browser identity headers

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod extract;
pub mod portal;
pub mod session;
pub mod user_agent;

// Re-export commonly used types
pub use config::{ClientConfig, ConfigError, Credentials, PortalEndpoints};
pub use extract::{ExtractError, FieldExtractor, ToggleResult};
pub use portal::{CallContext, LoginOutcome, PortalClient, PortalError, Step, ToggleOutcome};
pub use session::{SessionError, SessionStore, StoredCookie};
