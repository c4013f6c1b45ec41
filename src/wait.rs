//! Waiting for a request to show up in the recorded history.

use crate::error::{Error, Result};
use crate::matchers::RequestMatcher;
use crate::recorder::RequestRecorder;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// How often the recorded history is checked while waiting.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Bounds a wait with an optional deadline and a cancellation token.
#[derive(Debug, Clone, Default)]
pub struct WaitContext {
    deadline: Option<Instant>,
    token: CancellationToken,
}

impl WaitContext {
    /// A context that never expires unless cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// A context that expires `timeout` from now. A timeout too large to
    /// represent as an `Instant` never expires.
    pub fn with_timeout(timeout: Duration) -> Self {
        WaitContext {
            deadline: Instant::now().checked_add(timeout),
            token: CancellationToken::new(),
        }
    }

    /// A context that expires at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        WaitContext {
            deadline: Some(deadline),
            token: CancellationToken::new(),
        }
    }

    /// Tie the context to an existing token; cancelling the token ends the wait.
    pub fn with_token(self, token: CancellationToken) -> Self {
        WaitContext { token, ..self }
    }

    /// A token that cancels this context.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// The reason the context is done, if it is.
    pub fn err(&self) -> Option<Error> {
        if self.token.is_cancelled() {
            return Some(Error::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(Error::DeadlineExceeded),
            _ => None,
        }
    }
}

/// Wait until a request matching `matcher` is recorded after this call.
///
/// Requests recorded before the call do not count: the current number of
/// matches is taken as a baseline and the wait ends once it grows. The
/// history is polled every [POLL_INTERVAL], and the context is checked
/// between polls.
pub async fn wait_for(
    recorder: &RequestRecorder,
    matcher: &RequestMatcher,
    ctx: &WaitContext,
) -> Result<()> {
    let count = || {
        let (accepted, unmatched) = recorder.count(|req| matcher.matches(req));
        accepted + unmatched
    };
    let baseline = count();
    log::debug!("waiting for '{}' (baseline {})", matcher, baseline);
    loop {
        if count() > baseline {
            return Ok(());
        }
        if let Some(err) = ctx.err() {
            log::debug!("gave up waiting for '{}': {}", matcher, err);
            return Err(err);
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matchers::request;
    use crate::recorder::RecordedRequest;
    use bytes::Bytes;
    use std::sync::Arc;

    fn recorded(path: &str) -> RecordedRequest {
        RecordedRequest::from_request(&http::Request::get(path).body(Bytes::new()).unwrap())
    }

    #[tokio::test]
    async fn test_returns_after_new_request() {
        let recorder = Arc::new(RequestRecorder::new());
        let background = recorder.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            background.record_unmatched(recorded("/foo"));
        });
        let start = Instant::now();
        let ctx = WaitContext::with_timeout(Duration::from_secs(2));
        wait_for(&recorder, &request().get("/foo"), &ctx).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(50));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_ignores_existing_requests() {
        let recorder = RequestRecorder::new();
        recorder.record_accepted(recorded("/foo"));
        recorder.record_accepted(recorded("/foo"));
        let ctx = WaitContext::with_timeout(Duration::from_millis(250));
        let err = wait_for(&recorder, &request().get("/foo"), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_ignores_other_requests() {
        let recorder = Arc::new(RequestRecorder::new());
        let background = recorder.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            background.record_accepted(recorded("/bar"));
        });
        let ctx = WaitContext::with_timeout(Duration::from_millis(300));
        let err = wait_for(&recorder, &request().get("/foo"), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_cancel() {
        let recorder = RequestRecorder::new();
        let ctx = WaitContext::new();
        let token = ctx.token();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            token.cancel();
        });
        let start = Instant::now();
        let err = wait_for(&recorder, &request(), &ctx).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert!(start.elapsed() < POLL_INTERVAL * 3);
    }

    #[test]
    fn test_context_err() {
        assert!(WaitContext::new().err().is_none());
        let expired = WaitContext::with_deadline(Instant::now());
        assert!(matches!(expired.err(), Some(Error::DeadlineExceeded)));
        let ctx = WaitContext::with_timeout(Duration::from_secs(60));
        ctx.cancel();
        assert!(matches!(ctx.err(), Some(Error::Cancelled)));
    }

    #[test]
    fn test_unbounded_timeout() {
        let ctx = WaitContext::with_timeout(Duration::MAX);
        assert!(ctx.err().is_none());
        ctx.cancel();
        assert!(matches!(ctx.err(), Some(Error::Cancelled)));
    }
}
