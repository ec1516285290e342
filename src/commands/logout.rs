//! Logout command handler: discard the stored session.

use std::path::Path;

use anyhow::{Context, Result};
use jobcan_core::{SessionError, SessionStore};
use tracing::{info, warn};

/// Clears the session file without contacting the portal, so no credentials are needed.
///
/// A corrupt session file is overwritten rather than reported.
pub fn run_logout_command(session_file: &Path) -> Result<()> {
    let store = match SessionStore::load(session_file) {
        Ok(store) => store,
        Err(error @ SessionError::Corrupt { .. }) => {
            warn!(%error, "discarding unreadable session file");
            SessionStore::empty(session_file)
        }
        Err(error) => {
            return Err(error).with_context(|| {
                format!("Failed to load session from {}", session_file.display())
            });
        }
    };
    let discarded = store.len();
    store.clear();
    store
        .flush()
        .with_context(|| format!("Failed to write session to {}", session_file.display()))?;
    info!(discarded, path = %session_file.display(), "Logged out");
    println!("session cleared");
    Ok(())
}
