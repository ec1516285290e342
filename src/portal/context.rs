//! Per-operation deadline.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use super::error::{PortalError, Step};

/// Time bound for one logical portal operation.
///
/// Every request issued while serving the operation shares the same deadline,
/// so a multi-step login cannot exceed it in aggregate. Dropping the
/// operation's future cancels it; cookies recorded before that point stay.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
}

impl CallContext {
    /// A context with no deadline.
    #[must_use]
    pub fn background() -> Self {
        Self::default()
    }

    /// A context that expires `timeout` from now.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// A context that expires at `deadline`.
    #[must_use]
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
        }
    }

    /// The deadline, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline; `None` when unbounded.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Runs `step` to completion or fails with [`PortalError::Timeout`] at the deadline.
    pub(crate) async fn bound<T, F>(&self, step: Step, future: F) -> Result<T, PortalError>
    where
        F: Future<Output = Result<T, PortalError>>,
    {
        match self.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, future)
                .await
                .map_err(|_| PortalError::Timeout { step })?,
            None => future.await,
        }
    }
}
