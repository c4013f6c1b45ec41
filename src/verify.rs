//! Verification of how many times a request was seen.

use crate::matchers::RequestMatcher;
use crate::recorder::RequestRecorder;
use std::fmt;

/// How many requests a verification expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Times {
    /// Require exactly this many requests.
    Exactly(usize),
    /// Require at least this many requests.
    AtLeast(usize),
    /// Require no more than this many requests.
    AtMost(usize),
}

impl Times {
    /// true if `count` satisfies the policy.
    pub fn is_satisfied_by(&self, count: usize) -> bool {
        match *self {
            Times::Exactly(n) => count == n,
            Times::AtLeast(n) => count >= n,
            Times::AtMost(n) => count <= n,
        }
    }
}

impl Default for Times {
    fn default() -> Self {
        once()
    }
}

impl fmt::Display for Times {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Times::Exactly(n) => write!(f, "expected: {}", n),
            Times::AtLeast(n) => write!(f, "expected at least: {}", n),
            Times::AtMost(n) => write!(f, "expected at most: {}", n),
        }
    }
}

/// Expect exactly `n` requests.
pub fn times(n: usize) -> Times {
    Times::Exactly(n)
}

/// Expect exactly one request.
pub fn once() -> Times {
    times(1)
}

/// Expect no request at all.
pub fn never() -> Times {
    times(0)
}

/// Expect `n` or more requests.
pub fn at_least(n: usize) -> Times {
    Times::AtLeast(n)
}

/// Expect `n` or fewer requests.
pub fn at_most(n: usize) -> Times {
    Times::AtMost(n)
}

/// The recorded history did not contain the expected number of requests.
#[derive(Debug, Clone, thiserror::Error)]
#[error(
    "request was called unexpected number of times. {expected}, actual: {actual}\n\
     expected: {matcher} \n\
     actual  : {history}"
)]
pub struct VerificationError {
    /// The policy that failed.
    pub expected: Times,
    /// Matching requests across both the accepted and the unmatched logs.
    pub actual: usize,
    /// Description of the matcher that was verified.
    pub matcher: String,
    /// Rendering of the full recorded history at verification time.
    pub history: String,
}

/// Checks a count policy against the requests matched in a recorder.
#[derive(Debug, Clone)]
pub struct Verifier {
    matcher: RequestMatcher,
    expected: Times,
}

impl Verifier {
    /// A verifier expecting exactly one matching request.
    pub fn new(matcher: RequestMatcher) -> Self {
        Verifier {
            matcher,
            expected: Times::default(),
        }
    }

    pub fn times(self, expected: Times) -> Self {
        Verifier { expected, ..self }
    }

    /// Number of matching requests in both logs of the recorder.
    pub fn count(&self, recorder: &RequestRecorder) -> usize {
        let (accepted, unmatched) = recorder.count(|req| self.matcher.matches(req));
        accepted + unmatched
    }

    /// Verify the recorder holds the expected number of matching requests.
    ///
    /// Unmatched requests count too: the question is whether a request
    /// happened, not whether an endpoint handled it.
    pub fn verify(&self, recorder: &RequestRecorder) -> Result<(), VerificationError> {
        let actual = self.count(recorder);
        if self.expected.is_satisfied_by(actual) {
            log::debug!(
                "verified '{}': {}, actual: {}",
                self.matcher,
                self.expected,
                actual
            );
            return Ok(());
        }
        Err(VerificationError {
            expected: self.expected,
            actual,
            matcher: self.matcher.to_string(),
            history: recorder.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matchers::request;
    use crate::recorder::RecordedRequest;
    use bytes::Bytes;

    fn recorded(method: &str, path: &str) -> RecordedRequest {
        let req = http::Request::builder()
            .method(method)
            .uri(path)
            .body(Bytes::new())
            .unwrap();
        RecordedRequest::from_request(&req)
    }

    #[test]
    fn test_policies() {
        assert!(times(2).is_satisfied_by(2));
        assert!(!times(2).is_satisfied_by(3));
        assert!(once().is_satisfied_by(1));
        assert!(never().is_satisfied_by(0));
        assert!(!never().is_satisfied_by(1));
        assert!(at_least(2).is_satisfied_by(5));
        assert!(!at_least(2).is_satisfied_by(1));
        assert!(at_most(2).is_satisfied_by(0));
        assert!(!at_most(2).is_satisfied_by(3));
        assert_eq!(Times::Exactly(1), Times::default());
    }

    #[test]
    fn test_counts_both_logs() {
        let recorder = RequestRecorder::new();
        recorder.record_accepted(recorded("GET", "/foo"));
        recorder.record_accepted(recorded("GET", "/foo"));
        recorder.record_unmatched(recorded("GET", "/foo"));
        recorder.record_unmatched(recorded("GET", "/bar"));

        let verifier = Verifier::new(request().get("/foo"));
        assert!(verifier.clone().times(times(3)).verify(&recorder).is_ok());

        let err = verifier.times(times(2)).verify(&recorder).unwrap_err();
        assert_eq!(3, err.actual);
        assert!(err
            .to_string()
            .starts_with("request was called unexpected number of times. expected: 2, actual: 3"));
    }

    #[test]
    fn test_error_details() {
        let recorder = RequestRecorder::new();
        recorder.record_accepted(recorded("GET", "/foo"));
        let err = Verifier::new(request().get("/foo"))
            .times(never())
            .verify(&recorder)
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("expected: 0, actual: 1"));
        assert!(msg.contains("expected: Method(GET),Path(/foo)"));
        assert!(msg.contains("Accepted:\n   1: GET /foo"));
        assert!(msg.contains("Unmatched:"));
    }

    #[test]
    fn test_at_least_and_at_most_messages() {
        let recorder = RequestRecorder::new();
        let err = Verifier::new(request().get("/bar"))
            .times(at_least(1))
            .verify(&recorder)
            .unwrap_err();
        assert!(err
            .to_string()
            .contains("expected at least: 1, actual: 0"));

        recorder.record_unmatched(recorded("GET", "/bar"));
        recorder.record_unmatched(recorded("GET", "/bar"));
        let err = Verifier::new(request().get("/bar"))
            .times(at_most(1))
            .verify(&recorder)
            .unwrap_err();
        assert!(err.to_string().contains("expected at most: 1, actual: 2"));
    }

    #[test]
    fn test_never_after_clear() {
        let recorder = RequestRecorder::new();
        recorder.record_accepted(recorded("GET", "/foo"));
        recorder.clear();
        assert!(Verifier::new(request()).times(never()).verify(&recorder).is_ok());
    }
}
