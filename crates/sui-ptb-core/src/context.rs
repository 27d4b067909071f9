//! Per-call context carrying cancellation and an optional deadline.
//!
//! Every collaborator call made during a build goes through
//! [`CallContext::run`], so an aborted context stops the build at the next
//! suspension point and no transaction is returned.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{PtbError, PtbResult};

#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context driven by an existing cancellation token.
    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// A context that is cancelled with this one but can be cancelled on its own.
    pub fn child(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Fail with [`PtbError::Cancelled`] if the context is already done.
    pub fn check(&self, operation: &str) -> PtbResult<()> {
        if self.is_cancelled() {
            return Err(PtbError::Cancelled {
                operation: operation.to_string(),
            });
        }
        Ok(())
    }

    /// Run a collaborator call, racing it against cancellation and the deadline.
    ///
    /// Collaborator failures are wrapped as [`PtbError::ExternalLookupError`]
    /// tagged with `operation`.
    pub async fn run<T, F>(&self, operation: &str, call: F) -> PtbResult<T>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        self.check(operation)?;

        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!(operation = operation, "call cancelled");
                Err(PtbError::Cancelled { operation: operation.to_string() })
            }
            _ = deadline => {
                debug!(operation = operation, "call deadline elapsed");
                Err(PtbError::Cancelled { operation: operation.to_string() })
            }
            result = call => result.map_err(|e| PtbError::external(operation, e)),
        }
    }
}
