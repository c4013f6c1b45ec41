use crate::dispatch;
use crate::endpoint::ServerEndpoint;
use crate::error::{Error, Result};
use crate::matchers::RequestMatcher;
use crate::recorder::{RecordedRequest, RequestRecorder};
use crate::tls::TlsConfig;
use crate::verify::{Times, VerificationError, Verifier};
use crate::wait::{self, WaitContext};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper_util::rt::{TokioExecutor, TokioIo};
use parking_lot::{Mutex, RwLock};
use std::convert::TryFrom;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// How to start a [Server].
///
/// Every field has a default: the name is `"anonymous"`, TLS is off and there
/// are no endpoints (so every request gets a `404`).
pub struct ServerConfig {
    name: String,
    tls: Option<TlsConfig>,
    endpoints: Vec<Arc<dyn ServerEndpoint>>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            name: "anonymous".to_owned(),
            tls: None,
            endpoints: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Set the name of the server. Only used in logs and diagnostics.
    pub fn with_name(self, name: impl Into<String>) -> Self {
        ServerConfig {
            name: name.into(),
            ..self
        }
    }

    /// Serve https using the given TLS configuration.
    pub fn with_tls(self, tls: TlsConfig) -> Self {
        ServerConfig {
            tls: Some(tls),
            ..self
        }
    }

    /// Set the endpoints the server starts with, in matching order.
    pub fn with_endpoints<I, E>(self, endpoints: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: ServerEndpoint + 'static,
    {
        ServerConfig {
            endpoints: endpoints
                .into_iter()
                .map(|e| Arc::new(e) as Arc<dyn ServerEndpoint>)
                .collect(),
            ..self
        }
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("name", &self.name)
            .field("tls", &self.tls)
            .field("endpoints", &self.endpoints.len())
            .finish()
    }
}

/// The Server
pub struct Server {
    name: String,
    addr: SocketAddr,
    tls: bool,
    state: Arc<ServerState>,
    shutdown: Mutex<Option<Shutdown>>,
}

struct Shutdown {
    trigger: futures::channel::oneshot::Sender<()>,
    join_handle: std::thread::JoinHandle<()>,
}

impl Server {
    /// Start a server with the default configuration.
    ///
    /// The server will run in the background until it is closed or dropped.
    ///
    /// # Panics
    ///
    /// If the server cannot be started; use [Server::start] to handle that.
    pub fn run() -> Self {
        Self::start(ServerConfig::default()).expect("failed to start mock server")
    }

    /// Start a server on a local ephemeral port.
    ///
    /// The server runs on its own thread and runtime, so it can be started
    /// from synchronous tests as well as from within a tokio runtime.
    pub fn start(config: ServerConfig) -> Result<Self> {
        let ServerConfig {
            name,
            tls,
            endpoints,
        } = config;

        let std_listener =
            std::net::TcpListener::bind(("127.0.0.1", 0)).map_err(Error::Bind)?;
        std_listener.set_nonblocking(true).map_err(Error::Bind)?;
        let addr = std_listener.local_addr().map_err(Error::Bind)?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("mockhttp-worker")
            .enable_all()
            .build()
            .map_err(Error::Runtime)?;
        let state = Arc::new(ServerState {
            endpoints: RwLock::new(endpoints),
            recorder: RequestRecorder::new(),
        });
        let acceptor = tls.as_ref().map(TlsConfig::acceptor);
        let (trigger, shutdown_received) = futures::channel::oneshot::channel();
        let join_handle = std::thread::Builder::new()
            .name(format!("mockhttp-{}", name))
            .spawn({
                let state = state.clone();
                move || {
                    runtime.block_on(serve(std_listener, acceptor, state, shutdown_received));
                    runtime.shutdown_timeout(SHUTDOWN_TIMEOUT);
                }
            })
            .map_err(Error::Runtime)?;

        let server = Server {
            name,
            addr,
            tls: tls.is_some(),
            state,
            shutdown: Mutex::new(Some(Shutdown {
                trigger,
                join_handle,
            })),
        };
        log::info!("Mock server started: {}", server);
        Ok(server)
    }

    /// Get the address the server is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The base url of the server, e.g. `http://localhost:54756`.
    ///
    /// The scheme is `https` when the server was started with TLS.
    pub fn base_url(&self) -> String {
        let scheme = if self.tls { "https" } else { "http" };
        format!("{}://localhost:{}", scheme, self.port())
    }

    /// The base url followed by `path`.
    ///
    /// `server.build_url("/foo?q=1") == "http://localhost:1234/foo?q=1"`
    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    /// Get a fully formed url to the servers address.
    ///
    /// If the server is listening on port 1234.
    ///
    /// `server.url("/foo?q=1") == "http://127.0.0.1:1234/foo?q=1"`
    pub fn url<T>(&self, path_and_query: T) -> http::Uri
    where
        http::uri::PathAndQuery: TryFrom<T>,
        <http::uri::PathAndQuery as TryFrom<T>>::Error: Into<http::Error>,
    {
        http::Uri::builder()
            .scheme(if self.tls { "https" } else { "http" })
            .authority(self.addr.to_string().as_str())
            .path_and_query(path_and_query)
            .build()
            .expect("invalid path and query")
    }

    /// Add an endpoint after the existing ones.
    pub fn add_endpoint(&self, endpoint: impl ServerEndpoint + 'static) {
        self.state.endpoints.write().push(Arc::new(endpoint));
    }

    /// Remove every endpoint; all further requests get a `404`.
    pub fn clear_endpoints(&self) {
        self.state.endpoints.write().clear();
    }

    /// Forget every recorded request.
    pub fn clear_history(&self) {
        self.state.recorder.clear();
    }

    /// Remove every endpoint and forget every recorded request, leaving the
    /// server running in a clean state.
    pub fn clear(&self) {
        self.clear_endpoints();
        self.clear_history();
    }

    /// Requests that were handled by one of the endpoints.
    pub fn accepted_requests(&self) -> Vec<RecordedRequest> {
        self.state.recorder.accepted_requests()
    }

    /// Requests that matched no endpoint.
    pub fn unmatched_requests(&self) -> Vec<RecordedRequest> {
        self.state.recorder.unmatched_requests()
    }

    pub fn recorder(&self) -> &RequestRecorder {
        &self.state.recorder
    }

    /// Verify how many received requests match `matcher`, whether or not an
    /// endpoint handled them.
    ///
    /// ```no_run
    /// use mockhttp::{matchers::request, verify::times, Server};
    ///
    /// let server = Server::run();
    /// // ... exercise the code under test ...
    /// server.verify(&request().get("/foo"), times(2)).unwrap();
    /// ```
    pub fn verify(
        &self,
        matcher: &RequestMatcher,
        times: Times,
    ) -> std::result::Result<(), VerificationError> {
        Verifier::new(matcher.clone())
            .times(times)
            .verify(&self.state.recorder)
    }

    /// Wait for a request matching `matcher` to arrive after this call.
    pub async fn wait_for(&self, matcher: &RequestMatcher, ctx: &WaitContext) -> Result<()> {
        wait::wait_for(&self.state.recorder, matcher, ctx).await
    }

    /// Shut the server down. Further calls do nothing.
    pub fn close(&self) {
        let shutdown = self.shutdown.lock().take();
        if let Some(Shutdown {
            trigger,
            join_handle,
        }) = shutdown
        {
            log::info!("Closing mock server '{}'.", self.name);
            let _ = trigger.send(());
            if join_handle.join().is_err() {
                log::warn!("mock server '{}' thread panicked", self.name);
            }
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Display for Server {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "'{}' - base URL: {}", self.name, self.base_url())
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Server")
            .field("name", &self.name)
            .field("addr", &self.addr)
            .field("tls", &self.tls)
            .finish()
    }
}

struct ServerState {
    endpoints: RwLock<Vec<Arc<dyn ServerEndpoint>>>,
    recorder: RequestRecorder,
}

async fn serve(
    std_listener: std::net::TcpListener,
    acceptor: Option<tokio_rustls::TlsAcceptor>,
    state: Arc<ServerState>,
    mut shutdown_received: futures::channel::oneshot::Receiver<()>,
) {
    let listener = match tokio::net::TcpListener::from_std(std_listener) {
        Ok(listener) => listener,
        Err(err) => {
            log::error!("failed to register listener: {}", err);
            return;
        }
    };
    loop {
        tokio::select! {
            _ = &mut shutdown_received => break,
            accepted = listener.accept() => {
                let stream = match accepted {
                    Ok((stream, _)) => stream,
                    Err(err) => {
                        log::warn!("failed to accept connection: {}", err);
                        continue;
                    }
                };
                tokio::spawn(serve_connection(stream, acceptor.clone(), state.clone()));
            }
        }
    }
}

async fn serve_connection(
    stream: tokio::net::TcpStream,
    acceptor: Option<tokio_rustls::TlsAcceptor>,
    state: Arc<ServerState>,
) {
    let service = hyper::service::service_fn(move |req| on_req(state.clone(), req));
    let builder = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new());
    let served = match acceptor {
        Some(acceptor) => match acceptor.accept(stream).await {
            Ok(stream) => builder.serve_connection(TokioIo::new(stream), service).await,
            Err(err) => {
                log::warn!("TLS handshake failed: {}", err);
                return;
            }
        },
        None => builder.serve_connection(TokioIo::new(stream), service).await,
    };
    if let Err(err) = served {
        log::debug!("error serving connection: {}", err);
    }
}

async fn on_req(
    state: Arc<ServerState>,
    req: hyper::Request<hyper::body::Incoming>,
) -> std::result::Result<hyper::Response<Full<Bytes>>, hyper::Error> {
    // read the full body into memory prior to handing it to endpoints.
    let (head, body) = req.into_parts();
    let full_body = body.collect().await?.to_bytes();
    let req = hyper::Request::from_parts(head, full_body);
    log::debug!("Received Request: {:?}", req);

    let endpoint = {
        let endpoints = state.endpoints.read();
        dispatch::route(&endpoints, &state.recorder, &req)
    };
    let resp = match endpoint {
        Some(endpoint) => endpoint.serve(&req).await,
        None => not_found(&req),
    };
    log::debug!("Sending Response: {:?}", resp);
    Ok(resp.map(Full::new))
}

fn not_found(req: &http::Request<Bytes>) -> http::Response<Bytes> {
    let mut resp = http::Response::new(Bytes::from(format!(
        "404 page not found: {}",
        req.uri().path()
    )));
    *resp.status_mut() = http::StatusCode::NOT_FOUND;
    resp.headers_mut().insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("text/plain"),
    );
    resp
}
