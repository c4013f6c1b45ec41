//! Response definitions.
//!
//! A [Response] is the canned answer an endpoint gives: a status code, headers,
//! a body and an optional delay. A [ResponseWriter] is the sink handed to
//! custom server handlers that want to build the answer themselves.

use bytes::{Bytes, BytesMut};
use std::convert::TryInto;
use std::fmt;
use std::io;
use std::time::Duration;

/// A canned response.
///
/// Defaults to status `200`, an empty body, no headers and no delay.
#[derive(Debug, Clone)]
pub struct Response {
    status: http::StatusCode,
    headers: http::HeaderMap,
    body: Bytes,
    delay: Duration,
}

impl Default for Response {
    fn default() -> Self {
        Response {
            status: http::StatusCode::OK,
            headers: http::HeaderMap::new(),
            body: Bytes::new(),
            delay: Duration::from_secs(0),
        }
    }
}

/// A response with the default settings.
pub fn response() -> Response {
    Response::default()
}

/// respond with the provided status code and an empty body.
pub fn status_code(code: u16) -> Response {
    response().status_code(code)
}

/// respond with a body that is the json encoding of data.
///
/// The status code will be `200` and the content-type will be
/// `application/json`.
pub fn json_encoded<T>(data: T) -> Response
where
    T: serde::Serialize,
{
    response()
        .append_header("Content-Type", "application/json")
        .body(serde_json::to_vec(&data).expect("failed to serialize body"))
}

/// respond with a body that is the url encoding of data.
///
/// The status code will be `200` and the content-type will be
/// `application/x-www-form-urlencoded`.
pub fn url_encoded<T>(data: T) -> Response
where
    T: serde::Serialize,
{
    response()
        .append_header("Content-Type", "application/x-www-form-urlencoded")
        .body(serde_urlencoded::to_string(&data).expect("failed to serialize body"))
}

impl Response {
    /// Set the status code.
    pub fn status_code(mut self, code: u16) -> Self {
        self.status = http::StatusCode::from_u16(code).expect("invalid status code");
        self
    }

    /// Set the body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Set the body from a string.
    pub fn body_string(self, body: &str) -> Self {
        self.body(body.to_owned())
    }

    /// Insert the provided header. Replacing any header that already exists with the same name.
    pub fn insert_header<K, V>(mut self, name: K, value: V) -> Self
    where
        K: TryInto<http::header::HeaderName>,
        K::Error: fmt::Debug,
        V: TryInto<http::header::HeaderValue>,
        V::Error: fmt::Debug,
    {
        let name: http::header::HeaderName = name.try_into().expect("invalid header name");
        let value: http::header::HeaderValue = value.try_into().expect("invalid header value");
        self.headers.insert(name, value);
        self
    }

    /// Insert the provided header. Appending the value to any header that already exists with the same name.
    pub fn append_header<K, V>(mut self, name: K, value: V) -> Self
    where
        K: TryInto<http::header::HeaderName>,
        K::Error: fmt::Debug,
        V: TryInto<http::header::HeaderValue>,
        V::Error: fmt::Debug,
    {
        let name: http::header::HeaderName = name.try_into().expect("invalid header name");
        let value: http::header::HeaderValue = value.try_into().expect("invalid header value");
        self.headers.append(name, value);
        self
    }

    /// Wait this long after receiving the request before answering.
    ///
    /// This is useful for testing request timeouts.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn get_status(&self) -> http::StatusCode {
        self.status
    }

    pub fn get_delay(&self) -> Duration {
        self.delay
    }

    /// Build the http response, without applying the delay.
    pub fn to_http(&self) -> http::Response<Bytes> {
        let mut resp = http::Response::new(self.body.clone());
        *resp.status_mut() = self.status;
        *resp.headers_mut() = self.headers.clone();
        resp
    }

    /// Sleep for the configured delay, then build the http response.
    pub async fn respond(&self) -> http::Response<Bytes> {
        if self.delay > Duration::from_secs(0) {
            tokio::time::sleep(self.delay).await;
        }
        self.to_http()
    }
}

/// The response sink handed to custom server handlers.
///
/// Mirrors the usual writer discipline: headers are set first, then the status
/// is written once, then the body. Header changes after the status was written
/// and second status writes are ignored. Writing body bytes before any status
/// implies `200`.
#[derive(Debug, Default)]
pub struct ResponseWriter {
    status: Option<http::StatusCode>,
    headers: http::HeaderMap,
    body: BytesMut,
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The headers that will be sent.
    pub fn headers(&self) -> &http::HeaderMap {
        &self.headers
    }

    /// Set a header, replacing earlier values.
    pub fn set_header<K, V>(&mut self, name: K, value: V)
    where
        K: TryInto<http::header::HeaderName>,
        K::Error: fmt::Debug,
        V: TryInto<http::header::HeaderValue>,
        V::Error: fmt::Debug,
    {
        if self.header_written() {
            return;
        }
        let name: http::header::HeaderName = name.try_into().expect("invalid header name");
        let value: http::header::HeaderValue = value.try_into().expect("invalid header value");
        self.headers.insert(name, value);
    }

    /// Add a header value, keeping earlier values.
    pub fn add_header<K, V>(&mut self, name: K, value: V)
    where
        K: TryInto<http::header::HeaderName>,
        K::Error: fmt::Debug,
        V: TryInto<http::header::HeaderValue>,
        V::Error: fmt::Debug,
    {
        if self.header_written() {
            return;
        }
        let name: http::header::HeaderName = name.try_into().expect("invalid header name");
        let value: http::header::HeaderValue = value.try_into().expect("invalid header value");
        self.headers.append(name, value);
    }

    /// Write the status line.
    pub fn write_header(&mut self, code: u16) {
        if let Some(status) = self.status {
            log::warn!(
                "superfluous write_header({}); status {} already written",
                code,
                status
            );
            return;
        }
        self.status = Some(http::StatusCode::from_u16(code).expect("invalid status code"));
    }

    /// Append to the body.
    pub fn write_body(&mut self, data: impl AsRef<[u8]>) {
        if self.status.is_none() {
            self.status = Some(http::StatusCode::OK);
        }
        self.body.extend_from_slice(data.as_ref());
    }

    fn header_written(&self) -> bool {
        if let Some(status) = self.status {
            log::warn!("headers changed after status {} was written; ignored", status);
            return true;
        }
        false
    }

    /// Turn what was written into an http response.
    pub fn into_response(self) -> http::Response<Bytes> {
        let mut resp = http::Response::new(self.body.freeze());
        *resp.status_mut() = self.status.unwrap_or(http::StatusCode::OK);
        *resp.headers_mut() = self.headers;
        resp
    }
}

impl io::Write for ResponseWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_body(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let resp = response().to_http();
        assert_eq!(200, resp.status().as_u16());
        assert!(resp.headers().is_empty());
        assert!(resp.body().is_empty());
        assert_eq!(Duration::from_secs(0), response().get_delay());
    }

    #[test]
    fn test_builder() {
        let resp = status_code(202)
            .body_string("hello")
            .append_header("x-multi", "a")
            .append_header("x-multi", "b")
            .insert_header("x-single", "a")
            .insert_header("x-single", "b")
            .to_http();
        assert_eq!(202, resp.status().as_u16());
        assert_eq!("hello", resp.body());
        let multi: Vec<_> = resp.headers().get_all("x-multi").iter().collect();
        assert_eq!(2, multi.len());
        assert_eq!("b", resp.headers()["x-single"]);
    }

    #[test]
    fn test_json_encoded() {
        let resp = json_encoded(serde_json::json!({"foo": "bar"})).to_http();
        assert_eq!("application/json", resp.headers()["content-type"]);
        assert_eq!(
            serde_json::json!({"foo": "bar"}),
            serde_json::from_slice::<serde_json::Value>(resp.body()).unwrap()
        );
    }

    #[test]
    fn test_url_encoded() {
        let resp = url_encoded(&[("key", "value"), ("k", "v")]).to_http();
        assert_eq!(
            "application/x-www-form-urlencoded",
            resp.headers()["content-type"]
        );
        assert_eq!("key=value&k=v", resp.body());
    }

    #[test]
    fn test_derived_bodies() {
        #[derive(serde::Serialize)]
        struct Order {
            name: &'static str,
            count: u32,
        }

        let order = Order {
            name: "green tea",
            count: 2,
        };
        let resp = json_encoded(&order).to_http();
        assert_eq!("application/json", resp.headers()["content-type"]);
        assert_eq!(r#"{"name":"green tea","count":2}"#, resp.body());

        let resp = url_encoded(&order).to_http();
        assert_eq!(
            "application/x-www-form-urlencoded",
            resp.headers()["content-type"]
        );
        assert_eq!("name=green+tea&count=2", resp.body());
    }

    #[tokio::test]
    async fn test_delay() {
        let delay = Duration::from_millis(100);
        let now = std::time::Instant::now();
        let resp = status_code(204).delay(delay).respond().await;
        assert!(now.elapsed() >= delay);
        assert_eq!(204, resp.status().as_u16());
    }

    #[test]
    #[should_panic(expected = "invalid status code")]
    fn test_invalid_status_code() {
        let _ = status_code(1000);
    }

    #[test]
    fn test_writer() {
        let mut w = ResponseWriter::new();
        w.set_header("X-My-Custom-Header", "the-value");
        w.write_header(418);
        w.write_header(500);
        w.set_header("X-Too-Late", "ignored");
        w.write_body("I'm a ");
        write!(w, "teapot!").unwrap();
        let resp = w.into_response();
        assert_eq!(418, resp.status().as_u16());
        assert_eq!("the-value", resp.headers()["x-my-custom-header"]);
        assert!(resp.headers().get("x-too-late").is_none());
        assert_eq!("I'm a teapot!", resp.body());
    }

    #[test]
    fn test_writer_implicit_ok() {
        let mut w = ResponseWriter::new();
        w.write_body("body");
        w.write_header(404);
        let resp = w.into_response();
        assert_eq!(200, resp.status().as_u16());

        let resp = ResponseWriter::new().into_response();
        assert_eq!(200, resp.status().as_u16());
        assert!(resp.body().is_empty());
    }
}
