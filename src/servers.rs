//! Running a test against several named servers at once.

use crate::endpoint::ServerEndpoint;
use crate::error::Result;
use crate::server::{Server, ServerConfig};
use std::collections::BTreeMap;
use std::future::Future;
use std::ops::Index;
use std::sync::Arc;

/// A set of running servers, keyed by name.
///
/// Cheap to clone; every clone refers to the same servers.
#[derive(Clone, Debug)]
pub struct Servers(Arc<BTreeMap<String, Server>>);

impl Servers {
    pub fn get(&self, name: &str) -> Option<&Server> {
        self.0.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Server)> {
        self.0.iter().map(|(name, server)| (name.as_str(), server))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn close(&self) {
        for server in self.0.values() {
            server.close();
        }
    }
}

impl Index<&str> for Servers {
    type Output = Server;

    fn index(&self, name: &str) -> &Server {
        match self.get(name) {
            Some(server) => server,
            None => panic!("no server named '{}'", name),
        }
    }
}

struct CloseOnDrop(Servers);

impl Drop for CloseOnDrop {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Start one server per entry of `specs`, run `test` against them and close
/// them all afterwards.
///
/// Each server is named after its key and serves the given endpoints. The
/// servers are closed when `test` completes, and also when it panics. If a
/// server fails to start, the ones already started are closed and the error
/// is returned without running `test`.
///
/// ```
/// # #[tokio::main(flavor = "multi_thread")]
/// # async fn main() {
/// use mockhttp::{matchers::request, responders::status_code, with_servers, ServerStub};
///
/// let specs = vec![
///     ("users", vec![ServerStub::new().when(request().get("/users")).respond(status_code(200))]),
///     ("orders", vec![ServerStub::new()]),
/// ];
/// with_servers(specs, |servers| async move {
///     assert!(servers["users"].base_url().starts_with("http://localhost:"));
///     assert_eq!("orders", servers["orders"].name());
/// })
/// .await
/// .unwrap();
/// # }
/// ```
pub async fn with_servers<I, K, V, E, F, Fut, R>(specs: I, test: F) -> Result<R>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: IntoIterator<Item = E>,
    E: ServerEndpoint + 'static,
    F: FnOnce(Servers) -> Fut,
    Fut: Future<Output = R>,
{
    let mut started = BTreeMap::new();
    for (name, endpoints) in specs {
        let name = name.into();
        // on error the servers started so far are dropped, which closes them.
        let server = Server::start(
            ServerConfig::default()
                .with_name(name.clone())
                .with_endpoints(endpoints),
        )?;
        started.insert(name, server);
    }

    let servers = Servers(Arc::new(started));
    let _guard = CloseOnDrop(servers.clone());
    Ok(test(servers).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::ServerStub;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_servers_are_closed_afterwards() {
        let specs = vec![("a", vec![ServerStub::new()]), ("b", vec![ServerStub::new()])];
        let addrs = with_servers(specs, |servers| async move {
            assert_eq!(2, servers.len());
            assert_eq!(vec!["a", "b"], servers.names().collect::<Vec<_>>());
            assert_eq!("a", servers["a"].name());
            assert!(servers.get("c").is_none());
            servers.iter().map(|(_, s)| s.addr()).collect::<Vec<_>>()
        })
        .await
        .unwrap();
        for addr in addrs {
            assert!(std::net::TcpStream::connect(addr).is_err());
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_servers_outliving_the_test_are_closed() {
        let specs = vec![("only", vec![ServerStub::new()])];
        let kept = with_servers(specs, |servers| async move { servers })
            .await
            .unwrap();
        assert!(std::net::TcpStream::connect(kept["only"].addr()).is_err());
    }

    #[test]
    #[should_panic(expected = "no server named 'missing'")]
    fn test_index_unknown_name() {
        let servers = Servers(Arc::new(BTreeMap::new()));
        let _ = &servers["missing"];
    }
}
