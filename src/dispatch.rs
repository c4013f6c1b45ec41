//! First-match-wins routing shared by mock clients and servers.

use crate::endpoint::Endpoint;
use crate::recorder::{RecordedRequest, RequestRecorder};
use bytes::Bytes;
use std::sync::Arc;

/// Find the endpoint that handles `req` and record the outcome.
///
/// Endpoints are tried in order and the first match wins; later endpoints are
/// not evaluated. The request is recorded as accepted when an endpoint
/// matched and as unmatched otherwise, before any endpoint runs, so the
/// history is complete even if handling fails.
pub(crate) fn route<E>(
    endpoints: &[Arc<E>],
    recorder: &RequestRecorder,
    req: &http::Request<Bytes>,
) -> Option<Arc<E>>
where
    E: Endpoint + ?Sized,
{
    let recorded = RecordedRequest::from_request(req);
    match endpoints.iter().position(|e| e.matches(&recorded)) {
        Some(idx) => {
            log::debug!("endpoint #{} accepted {} {}", idx, req.method(), req.uri());
            recorder.record_accepted(recorded);
            Some(endpoints[idx].clone())
        }
        None => {
            log::debug!("no endpoint matched {} {}", req.method(), req.uri());
            recorder.record_unmatched(recorded);
            None
        }
    }
}
