//! Recording of the requests seen by a mock client or server.
//!
//! Every dispatched request is captured as a [RecordedRequest] and appended to
//! one of two logs: accepted (an endpoint handled it) or unmatched (no endpoint
//! did). Readers always get copies, so a returned history never changes under
//! the caller.

use bytes::Bytes;
use parking_lot::RwLock;
use std::fmt;

/// An immutable snapshot of a request taken when it was dispatched.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    /// The request method.
    pub method: http::Method,
    /// The percent decoded path component of the request uri.
    pub path: String,
    /// The url decoded query parameters, in the order they appeared.
    pub query: Vec<(String, String)>,
    /// The request headers.
    pub headers: http::HeaderMap,
    /// The full request body.
    pub body: Bytes,
}

impl RecordedRequest {
    /// Snapshot a request whose body has already been read into memory.
    ///
    /// The body is shared with the request rather than consumed, so the
    /// request can still be handed to an endpoint afterwards.
    pub fn from_request(req: &http::Request<Bytes>) -> Self {
        let query = req
            .uri()
            .query()
            .map(|q| {
                form_urlencoded::parse(q.as_bytes())
                    .into_owned()
                    .collect()
            })
            .unwrap_or_default();
        RecordedRequest {
            method: req.method().clone(),
            path: percent_encoding::percent_decode_str(req.uri().path())
                .decode_utf8_lossy()
                .into_owned(),
            query,
            headers: req.headers().clone(),
            body: req.body().clone(),
        }
    }

    /// The first value of the named header, if present and valid utf-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The first value of the named query parameter.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The body decoded as utf-8, replacing invalid sequences.
    pub fn body_as_string(&self) -> String {
        use bstr::ByteSlice;
        self.body.to_str_lossy().into_owned()
    }
}

impl fmt::Display for RecordedRequest {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)?;
        if !self.query.is_empty() {
            let encoded = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(self.query.iter())
                .finish();
            write!(f, "?{}", encoded)?;
        }
        writeln!(f)?;
        for (name, value) in self.headers.iter() {
            writeln!(f, "{}: {}", name, bstr::BStr::new(value.as_bytes()))?;
        }
        writeln!(f, "{}", bstr::BStr::new(&self.body))
    }
}

#[derive(Debug, Default)]
struct RequestLog {
    accepted: Vec<RecordedRequest>,
    unmatched: Vec<RecordedRequest>,
}

/// Thread safe, append only history of accepted and unmatched requests.
#[derive(Debug, Default)]
pub struct RequestRecorder {
    log: RwLock<RequestLog>,
}

impl RequestRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a request that was handled by an endpoint.
    pub fn record_accepted(&self, req: RecordedRequest) {
        log::debug!("recording accepted request: {} {}", req.method, req.path);
        self.log.write().accepted.push(req);
    }

    /// Append a request that no endpoint matched.
    pub fn record_unmatched(&self, req: RecordedRequest) {
        log::debug!("recording unmatched request: {} {}", req.method, req.path);
        self.log.write().unmatched.push(req);
    }

    /// A copy of the accepted requests, in arrival order.
    pub fn accepted_requests(&self) -> Vec<RecordedRequest> {
        self.log.read().accepted.clone()
    }

    /// A copy of the unmatched requests, in arrival order.
    pub fn unmatched_requests(&self) -> Vec<RecordedRequest> {
        self.log.read().unmatched.clone()
    }

    /// Count the accepted and unmatched requests satisfying `pred`, both
    /// read under the same lock.
    pub fn count<F>(&self, mut pred: F) -> (usize, usize)
    where
        F: FnMut(&RecordedRequest) -> bool,
    {
        let log = self.log.read();
        let accepted = log.accepted.iter().filter(|r| pred(r)).count();
        let unmatched = log.unmatched.iter().filter(|r| pred(r)).count();
        (accepted, unmatched)
    }

    /// Forget every recorded request.
    pub fn clear(&self) {
        let mut log = self.log.write();
        log.accepted.clear();
        log.unmatched.clear();
    }
}

impl fmt::Display for RequestRecorder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fn list(f: &mut fmt::Formatter, requests: &[RecordedRequest]) -> fmt::Result {
            for (i, req) in requests.iter().enumerate() {
                writeln!(f, "  {:2}: {} {}", i + 1, req.method, req.path)?;
                for (name, value) in req.headers.iter() {
                    writeln!(f, "      {}: {}", name, bstr::BStr::new(value.as_bytes()))?;
                }
                if !req.body.is_empty() {
                    writeln!(f, "      {}", bstr::BStr::new(&req.body))?;
                }
            }
            Ok(())
        }

        let log = self.log.read();
        writeln!(f, "Accepted:")?;
        list(f, &log.accepted)?;
        writeln!(f, "Unmatched:")?;
        list(f, &log.unmatched)
    }
}
