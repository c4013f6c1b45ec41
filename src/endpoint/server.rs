use super::{Endpoint, ServerEndpoint};
use crate::matchers::RequestMatcher;
use crate::recorder::RecordedRequest;
use crate::responders::{Response, ResponseWriter};
use bytes::Bytes;
use futures::future::{BoxFuture, FutureExt};
use std::fmt;
use std::sync::Arc;

/// A custom server handler: inspect the request, write the response.
pub type HandlerFn = Arc<dyn Fn(&http::Request<Bytes>, &mut ResponseWriter) + Send + Sync>;

#[derive(Clone)]
enum Action {
    Respond(Response),
    Handle(HandlerFn),
}

/// The standard server endpoint.
///
/// A new stub matches every request and responds with `200` and an empty body.
///
/// ```
/// use mockhttp::{matchers::request, responders::response, ServerStub};
///
/// let endpoint = ServerStub::new()
///     .when(request().get("/foo"))
///     .respond(response().body_string("hello"));
/// ```
#[derive(Clone)]
pub struct ServerStub {
    matcher: RequestMatcher,
    action: Action,
}

impl Default for ServerStub {
    fn default() -> Self {
        ServerStub {
            matcher: RequestMatcher::default(),
            action: Action::Respond(Response::default()),
        }
    }
}

impl ServerStub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Which requests this endpoint handles.
    pub fn when(self, matcher: RequestMatcher) -> Self {
        ServerStub { matcher, ..self }
    }

    /// Respond with a canned response.
    pub fn respond(self, response: Response) -> Self {
        ServerStub {
            action: Action::Respond(response),
            ..self
        }
    }

    /// Handle matching requests with custom logic.
    ///
    /// The handler may block (sleep, read files, ...) without holding up
    /// other connections to the server.
    pub fn handle_with<F>(self, handler: F) -> Self
    where
        F: Fn(&http::Request<Bytes>, &mut ResponseWriter) + Send + Sync + 'static,
    {
        ServerStub {
            action: Action::Handle(Arc::new(handler)),
            ..self
        }
    }

    pub fn matcher(&self) -> &RequestMatcher {
        &self.matcher
    }
}

impl Endpoint for ServerStub {
    fn matches(&self, req: &RecordedRequest) -> bool {
        self.matcher.matches(req)
    }
}

impl ServerEndpoint for ServerStub {
    fn serve<'a>(&'a self, req: &'a http::Request<Bytes>) -> BoxFuture<'a, http::Response<Bytes>> {
        match &self.action {
            Action::Respond(response) => response.respond().boxed(),
            Action::Handle(handler) => {
                let handler = handler.clone();
                async move {
                    tokio::task::block_in_place(|| {
                        let mut writer = ResponseWriter::new();
                        handler(req, &mut writer);
                        writer.into_response()
                    })
                }
                .boxed()
            }
        }
    }
}

impl fmt::Debug for ServerStub {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let action = match &self.action {
            Action::Respond(response) => format!("{:?}", response),
            Action::Handle(_) => "HandleWith(fn)".to_owned(),
        };
        f.debug_struct("ServerStub")
            .field("when", &self.matcher)
            .field("action", &action)
            .finish()
    }
}
