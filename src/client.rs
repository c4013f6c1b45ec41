//! A mock HTTP client.
//!
//! Requests issued through the [HttpClient] handle never touch the network;
//! they are matched against the client's endpoints and answered (or failed)
//! in process.

use crate::dispatch;
use crate::endpoint::ClientEndpoint;
use crate::error::{BoxError, Error, Result};
use crate::matchers::RequestMatcher;
use crate::recorder::{RecordedRequest, RequestRecorder};
use crate::verify::{Times, VerificationError, Verifier};
use crate::wait::{self, WaitContext};
use bytes::Bytes;
use futures::future::{BoxFuture, FutureExt};
use http_body_util::{BodyExt, Empty, Full};
use std::convert::TryFrom;
use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};

/// A mock client configured with an ordered list of endpoints.
///
/// ```
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// use mockhttp::{matchers::request, responders::status_code, Client, ClientStub};
///
/// let client = Client::new(vec![ClientStub::new()
///     .when(request().get("/foo"))
///     .respond(status_code(202))]);
/// let resp = client.http_client().get("http://myhost/foo").await.unwrap();
/// assert_eq!(202, resp.status().as_u16());
/// assert_eq!(1, client.accepted_requests().len());
/// # }
/// ```
pub struct Client {
    state: Arc<ClientState>,
}

struct ClientState {
    endpoints: Vec<Arc<dyn ClientEndpoint>>,
    recorder: RequestRecorder,
}

impl Client {
    /// Create a client whose endpoints are tried in the given order.
    pub fn new<I, E>(endpoints: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: ClientEndpoint + 'static,
    {
        let endpoints = endpoints
            .into_iter()
            .map(|e| Arc::new(e) as Arc<dyn ClientEndpoint>)
            .collect();
        Client {
            state: Arc::new(ClientState {
                endpoints,
                recorder: RequestRecorder::new(),
            }),
        }
    }

    /// The handle to issue requests with. Every handle shares this client's
    /// endpoints and history.
    pub fn http_client(&self) -> HttpClient {
        HttpClient {
            state: self.state.clone(),
        }
    }

    pub fn accepted_requests(&self) -> Vec<RecordedRequest> {
        self.state.recorder.accepted_requests()
    }

    pub fn unmatched_requests(&self) -> Vec<RecordedRequest> {
        self.state.recorder.unmatched_requests()
    }

    pub fn clear_history(&self) {
        self.state.recorder.clear();
    }

    pub fn recorder(&self) -> &RequestRecorder {
        &self.state.recorder
    }

    /// Verify how many issued requests match `matcher`.
    pub fn verify(
        &self,
        matcher: &RequestMatcher,
        times: Times,
    ) -> std::result::Result<(), VerificationError> {
        Verifier::new(matcher.clone())
            .times(times)
            .verify(&self.state.recorder)
    }

    /// Wait for a request matching `matcher` to be issued after this call.
    pub async fn wait_for(&self, matcher: &RequestMatcher, ctx: &WaitContext) -> Result<()> {
        wait::wait_for(&self.state.recorder, matcher, ctx).await
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Client")
            .field("endpoints", &self.state.endpoints.len())
            .finish()
    }
}

/// The transport handle of a mock [Client].
///
/// Cheap to clone. Besides the inherent methods it implements
/// [tower::Service] so it can stand in wherever a tower HTTP service is
/// expected.
#[derive(Clone)]
pub struct HttpClient {
    state: Arc<ClientState>,
}

impl HttpClient {
    /// Send a request.
    ///
    /// The response comes from the first endpoint that matches. A request no
    /// endpoint matches gets a `501` naming the method and uri. An endpoint
    /// simulating a transport failure yields [Error::Transport] and no
    /// response.
    pub async fn request<B>(&self, req: http::Request<B>) -> Result<http::Response<Bytes>>
    where
        B: hyper::body::Body,
        B::Error: Into<BoxError>,
    {
        let (head, body) = req.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|err| Error::Body(err.into()))?
            .to_bytes();
        let req = http::Request::from_parts(head, body);
        log::debug!("Client request: {:?}", req);

        let endpoint = dispatch::route(&self.state.endpoints, &self.state.recorder, &req);
        let resp = match endpoint {
            Some(endpoint) => endpoint
                .round_trip(&req)
                .await
                .map_err(|source| Error::Transport {
                    method: req.method().clone(),
                    uri: req.uri().clone(),
                    source,
                })?,
            None => unmatched(&req),
        };
        log::debug!("Client response: {:?}", resp);
        Ok(resp)
    }

    pub async fn get<U>(&self, uri: U) -> Result<http::Response<Bytes>>
    where
        http::Uri: TryFrom<U>,
        <http::Uri as TryFrom<U>>::Error: Into<http::Error>,
    {
        let req = http::Request::get(uri).body(Empty::<Bytes>::new())?;
        self.request(req).await
    }

    pub async fn head<U>(&self, uri: U) -> Result<http::Response<Bytes>>
    where
        http::Uri: TryFrom<U>,
        <http::Uri as TryFrom<U>>::Error: Into<http::Error>,
    {
        let req = http::Request::head(uri).body(Empty::<Bytes>::new())?;
        self.request(req).await
    }

    /// Send a `POST` with the given content type and body.
    pub async fn post<U>(
        &self,
        uri: U,
        content_type: &str,
        body: impl Into<Bytes>,
    ) -> Result<http::Response<Bytes>>
    where
        http::Uri: TryFrom<U>,
        <http::Uri as TryFrom<U>>::Error: Into<http::Error>,
    {
        let req = http::Request::post(uri)
            .header(http::header::CONTENT_TYPE, content_type)
            .body(Full::new(body.into()))?;
        self.request(req).await
    }
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("endpoints", &self.state.endpoints.len())
            .finish()
    }
}

impl<B> tower::Service<http::Request<B>> for HttpClient
where
    B: hyper::body::Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    type Response = http::Response<Bytes>;
    type Error = Error;
    type Future = BoxFuture<'static, Result<http::Response<Bytes>>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        let client = self.clone();
        async move { client.request(req).await }.boxed()
    }
}

fn unmatched(req: &http::Request<Bytes>) -> http::Response<Bytes> {
    let mut resp = http::Response::new(Bytes::from(format!(
        "Unmatched request: {} {}",
        req.method(),
        req.uri()
    )));
    *resp.status_mut() = http::StatusCode::NOT_IMPLEMENTED;
    resp.headers_mut().insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("text/plain"),
    );
    resp
}
