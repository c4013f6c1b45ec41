//! Endpoints: what a mock client or server does with a request.
//!
//! An endpoint decides whether it [matches](Endpoint::matches) a request and,
//! if it is the first one that does, handles it. [ServerStub] and
//! [ClientStub] cover the usual cases (canned response, transport failure,
//! custom handler); implement [ServerEndpoint] or [ClientEndpoint] directly
//! for anything else.

use crate::error::TransportError;
use crate::recorder::RecordedRequest;
use bytes::Bytes;
use futures::future::BoxFuture;
use std::sync::Arc;

mod client;
mod server;

pub use client::{ClientStub, RoundTripFn};
pub use server::{HandlerFn, ServerStub};

/// Decides which requests an endpoint handles.
pub trait Endpoint: Send + Sync {
    /// true if this endpoint should handle the request.
    fn matches(&self, req: &RecordedRequest) -> bool;
}

/// An endpoint of a mock server.
pub trait ServerEndpoint: Endpoint {
    /// Produce the response for a request this endpoint matched.
    fn serve<'a>(&'a self, req: &'a http::Request<Bytes>) -> BoxFuture<'a, http::Response<Bytes>>;
}

/// An endpoint of a mock client.
pub trait ClientEndpoint: Endpoint {
    /// Produce the response, or a transport failure, for a request this
    /// endpoint matched.
    fn round_trip<'a>(
        &'a self,
        req: &'a http::Request<Bytes>,
    ) -> BoxFuture<'a, Result<http::Response<Bytes>, TransportError>>;
}

// Shared and boxed endpoints behave like the endpoint they point to, so
// heterogeneous lists can be built from `Box<dyn ..>` or `Arc<dyn ..>`.
macro_rules! impl_endpoint_for_pointer {
    ($ptr:ident) => {
        impl<T> Endpoint for $ptr<T>
        where
            T: Endpoint + ?Sized,
        {
            fn matches(&self, req: &RecordedRequest) -> bool {
                (**self).matches(req)
            }
        }

        impl<T> ServerEndpoint for $ptr<T>
        where
            T: ServerEndpoint + ?Sized,
        {
            fn serve<'a>(
                &'a self,
                req: &'a http::Request<Bytes>,
            ) -> BoxFuture<'a, http::Response<Bytes>> {
                (**self).serve(req)
            }
        }

        impl<T> ClientEndpoint for $ptr<T>
        where
            T: ClientEndpoint + ?Sized,
        {
            fn round_trip<'a>(
                &'a self,
                req: &'a http::Request<Bytes>,
            ) -> BoxFuture<'a, Result<http::Response<Bytes>, TransportError>> {
                (**self).round_trip(req)
            }
        }
    };
}

impl_endpoint_for_pointer!(Box);
impl_endpoint_for_pointer!(Arc);
