use super::{ClientEndpoint, Endpoint};
use crate::error::TransportError;
use crate::matchers::RequestMatcher;
use crate::recorder::RecordedRequest;
use crate::responders::Response;
use bytes::Bytes;
use futures::future::{self, BoxFuture, FutureExt};
use std::fmt;
use std::sync::Arc;

/// A custom client handler: turn a request into a response or a transport failure.
pub type RoundTripFn =
    Arc<dyn Fn(&http::Request<Bytes>) -> Result<http::Response<Bytes>, TransportError> + Send + Sync>;

#[derive(Clone)]
enum Action {
    Respond(Response),
    Fail(TransportError),
    Handle(RoundTripFn),
}

/// The standard client endpoint.
///
/// A new stub matches every request and responds with `200` and an empty body.
/// Mocking a transport failure is the typical use:
///
/// ```
/// use mockhttp::{Client, ClientStub};
///
/// let client = Client::new(vec![ClientStub::new().fail("dummy error")]);
/// ```
#[derive(Clone)]
pub struct ClientStub {
    matcher: RequestMatcher,
    action: Action,
}

impl Default for ClientStub {
    fn default() -> Self {
        ClientStub {
            matcher: RequestMatcher::default(),
            action: Action::Respond(Response::default()),
        }
    }
}

impl ClientStub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Which requests this endpoint handles.
    pub fn when(self, matcher: RequestMatcher) -> Self {
        ClientStub { matcher, ..self }
    }

    /// Respond with a canned response.
    pub fn respond(self, response: Response) -> Self {
        ClientStub {
            action: Action::Respond(response),
            ..self
        }
    }

    /// Fail every matching request with a transport error, e.g. a refused
    /// connection. No response is produced.
    pub fn fail(self, err: impl Into<TransportError>) -> Self {
        ClientStub {
            action: Action::Fail(err.into()),
            ..self
        }
    }

    /// Handle matching requests with custom logic.
    pub fn handle_with<F>(self, handler: F) -> Self
    where
        F: Fn(&http::Request<Bytes>) -> Result<http::Response<Bytes>, TransportError>
            + Send
            + Sync
            + 'static,
    {
        ClientStub {
            action: Action::Handle(Arc::new(handler)),
            ..self
        }
    }

    pub fn matcher(&self) -> &RequestMatcher {
        &self.matcher
    }
}

impl Endpoint for ClientStub {
    fn matches(&self, req: &RecordedRequest) -> bool {
        self.matcher.matches(req)
    }
}

impl ClientEndpoint for ClientStub {
    fn round_trip<'a>(
        &'a self,
        req: &'a http::Request<Bytes>,
    ) -> BoxFuture<'a, Result<http::Response<Bytes>, TransportError>> {
        match &self.action {
            Action::Respond(response) => response.respond().map(Ok).boxed(),
            Action::Fail(err) => future::ready(Err(err.clone())).boxed(),
            Action::Handle(handler) => future::ready(handler(req)).boxed(),
        }
    }
}

impl fmt::Debug for ClientStub {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let action = match &self.action {
            Action::Respond(response) => format!("{:?}", response),
            Action::Fail(err) => format!("Fail({})", err),
            Action::Handle(_) => "HandleWith(fn)".to_owned(),
        };
        f.debug_struct("ClientStub")
            .field("when", &self.matcher)
            .field("action", &action)
            .finish()
    }
}
