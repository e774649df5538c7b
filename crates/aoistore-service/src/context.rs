//! Request context carrying the acting user and the cancellation signal.

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use aoistore_core::error::AppError;
use aoistore_core::result::AppResult;

/// Context for a single store operation.
///
/// Passed into every service method so each record knows who created it,
/// and so long-running imports and exports can be aborted between steps.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Correlation id for log lines.
    pub request_id: Uuid,
    /// The acting user, recorded as `created_by`.
    pub username: String,
    /// Cooperative cancellation signal.
    cancel: CancellationToken,
    /// Creation instant shared by every record written under this context.
    instant: Option<DateTime<Utc>>,
}

impl RequestContext {
    /// Creates a context for the given user with a fresh cancellation token.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            username: username.into(),
            cancel: CancellationToken::new(),
            instant: None,
        }
    }

    /// Replaces the cancellation token, e.g. with one owned by a job runner.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Pins the creation instant of every node and version written under
    /// this context.
    pub fn at_instant(mut self, at: DateTime<Utc>) -> Self {
        self.instant = Some(at);
        self
    }

    pub fn instant(&self) -> Option<DateTime<Utc>> {
        self.instant
    }

    /// The token observed by [`checkpoint`](Self::checkpoint).
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Returns whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// A safe point between discrete content copies.
    pub fn checkpoint(&self) -> AppResult<()> {
        if self.cancel.is_cancelled() {
            return Err(AppError::cancelled(format!(
                "Request {} was cancelled",
                self.request_id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aoistore_core::error::ErrorKind;

    #[test]
    fn test_checkpoint_after_cancel() {
        let token = CancellationToken::new();
        let ctx = RequestContext::new("tester").with_cancellation(token.clone());
        assert!(ctx.checkpoint().is_ok());

        token.cancel();
        assert!(ctx.is_cancelled());
        assert_eq!(ctx.checkpoint().unwrap_err().kind, ErrorKind::Cancelled);
    }

    #[test]
    fn test_pinned_instant_survives_new_token() {
        let at = aoistore_core::traits::epoch_seconds(20);
        let ctx = RequestContext::new("tester")
            .at_instant(at)
            .with_cancellation(CancellationToken::new());
        assert_eq!(ctx.instant(), Some(at));
        assert_eq!(RequestContext::new("tester").instant(), None);
    }
}
