//! Localhost availability checks for tests that talk to a mock portal.
//!
//! Sandboxed runners sometimes forbid binding sockets. Those tests are skipped
//! with a note on stderr, unless `JOBCAN_REQUIRE_SOCKET_TESTS` is truthy, in
//! which case the missing socket is a hard failure.

use std::net::{SocketAddr, TcpListener};
use std::panic::Location;

use wiremock::MockServer;

const REQUIRE_SOCKETS_ENV: &str = "JOBCAN_REQUIRE_SOCKET_TESTS";

fn sockets_required() -> bool {
    std::env::var(REQUIRE_SOCKETS_ENV)
        .map(|value| ["1", "true", "yes"].contains(&value.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Returns true when the calling test has to be skipped for lack of a localhost socket.
#[track_caller]
#[must_use]
pub fn localhost_unavailable() -> bool {
    let Err(error) = TcpListener::bind("127.0.0.1:0") else {
        return false;
    };
    let caller = Location::caller();
    if sockets_required() {
        panic!("{caller}: cannot bind localhost ({error}) and {REQUIRE_SOCKETS_ENV} is set");
    }
    eprintln!("{caller}: cannot bind localhost ({error}); skipping mock portal test");
    true
}

/// Starts a mock portal, or returns `None` when the test should be skipped.
pub async fn start_portal_or_skip() -> Option<MockServer> {
    if localhost_unavailable() {
        return None;
    }
    Some(MockServer::start().await)
}

/// Address of a localhost port that nothing is listening on.
#[allow(dead_code)]
#[must_use]
pub fn closed_local_addr() -> Option<SocketAddr> {
    if localhost_unavailable() {
        return None;
    }
    let listener = TcpListener::bind("127.0.0.1:0").ok()?;
    listener.local_addr().ok()
}
