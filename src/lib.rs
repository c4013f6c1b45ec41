//! Test doubles for HTTP: a mock client and a mock server.
//!
//! Both are configured with an ordered list of endpoints. Each incoming
//! request is recorded and handed to the first endpoint whose
//! [RequestMatcher] accepts it; requests no endpoint accepts are recorded as
//! unmatched. Tests then [verify](Server::verify) how often a request was
//! seen, or [wait](Server::wait_for) for one to arrive.

pub mod client;
mod dispatch;
pub mod endpoint;
pub mod error;
pub mod matchers;
pub mod recorder;
pub mod responders;
pub mod server;
pub mod servers;
pub mod tls;
pub mod verify;
pub mod wait;

pub use client::{Client, HttpClient};
pub use endpoint::{ClientEndpoint, ClientStub, Endpoint, ServerEndpoint, ServerStub};
pub use error::{Error, Result, TransportError};
pub use matchers::RequestMatcher;
pub use recorder::{RecordedRequest, RequestRecorder};
pub use responders::{Response, ResponseWriter};
pub use server::{Server, ServerConfig};
pub use servers::{with_servers, Servers};
pub use tls::TlsConfig;
pub use verify::Times;
pub use wait::WaitContext;
