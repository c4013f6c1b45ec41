#[tokio::test(flavor = "multi_thread")]
async fn test_readme() {
    use bytes::Bytes;
    use http_body_util::{BodyExt, Full};
    use hyper_util::client::legacy::Client;
    use mockhttp::{
        matchers::request,
        responders::{json_encoded, status_code},
        verify::{at_least, once},
        Server, ServerConfig, ServerStub,
    };
    use serde_json::json;
    // Starting a logger within the test can make debugging a failed test
    // easier. The mock http server will log::debug every request and response
    // received along with which endpoint, if any, matched the request. When
    // env_logger is initialized running the test with `RUST_LOG=mockhttp=debug
    // cargo test` can provide that information on stderr.
    let _ = pretty_env_logger::try_init();
    // Start a server running on a local ephemeral port. The first endpoint
    // matching a request handles it.
    let server = Server::start(ServerConfig::default().with_endpoints(vec![
        // Respond to GET /foo with a 200 status code.
        ServerStub::new()
            .when(request().get("/foo"))
            .respond(status_code(200)),
        // Respond to POST /bar with a json body matching {'foo': 'bar'} with
        // a json body {'result': 'success'}.
        ServerStub::new()
            .when(request().post("/bar").json_body(json!({"foo": "bar"})))
            .respond(json_encoded(json!({"result": "success"}))),
    ]))
    .unwrap();

    // The server provides server.addr() that returns the address of the
    // locally running server, or more conveniently provides a server.url()
    // method that gives a fully formed http url to the provided path.
    let url = server.url("/foo");

    // Now test your http client against the server.
    let client = Client::builder(hyper_util::rt::TokioExecutor::new()).build_http::<Full<Bytes>>();
    // Issue the GET /foo to the server.
    let resp = client.get(url).await.unwrap();
    // Assert the response was a 200.
    assert_eq!(200, resp.status().as_u16());

    // Issue a POST /bar with {'foo': 'bar'} json body.
    let post_req = http::Request::post(server.url("/bar"))
        .body(json!({"foo": "bar"}).to_string().into())
        .unwrap();
    let resp = client.request(post_req).await.unwrap();
    // Assert the response was a 200 with a json body of {'result': 'success'}
    assert_eq!(200, resp.status().as_u16());
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(
        json!({"result": "success"}),
        serde_json::from_slice::<serde_json::Value>(&body).unwrap()
    );

    // Finally verify the requests the server received.
    server.verify(&request().get("/foo"), once()).unwrap();
    server.verify(&request().path("/bar"), at_least(1)).unwrap();
}
