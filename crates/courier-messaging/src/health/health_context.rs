//! Caller-supplied cancellation and deadline for a health check.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::{Error, Result};

/// Cancellation and deadline applied to every wait in a health check.
#[derive(Debug, Clone, Default)]
pub struct HealthCheckContext {
    cancellation: CancellationToken,
    deadline: Option<Instant>,
}

impl HealthCheckContext {
    /// Creates a context that never cancels or times out.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the health check when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Times the health check out after `timeout` from now.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    /// Times the health check out at `deadline`.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Returns the cancellation token.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Returns the deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Runs `future` until it completes, the token is cancelled, or the
    /// deadline passes. `future` is dropped in the latter two cases.
    pub async fn run<F: Future>(&self, future: F) -> Result<F::Output> {
        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;

            () = self.cancellation.cancelled() => {
                Err(Error::cancelled().with_message("Health check was cancelled"))
            }
            () = deadline => {
                Err(Error::timeout().with_message("Health check deadline elapsed"))
            }
            output = future => Ok(output),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[tokio::test]
    async fn test_completes() {
        let context = HealthCheckContext::new();
        assert_eq!(context.run(async { 7 }).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        let context = HealthCheckContext::new().with_cancellation(token);

        let error = context.run(std::future::pending::<()>()).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Cancelled);
        assert!(error.is_cancellation());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline() {
        let context = HealthCheckContext::new().with_timeout(Duration::from_secs(5));

        let error = context
            .run(tokio::time::sleep(Duration::from_secs(60)))
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Timeout);
    }
}
