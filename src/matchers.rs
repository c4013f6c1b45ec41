//! Request matchers.
//!
//! A [RequestMatcher] is an ordered list of predicates that must all hold for
//! a request to match. Start with [request()] (which matches everything) and
//! narrow it down with the builder methods:
//!
//! ```
//! use mockhttp::matchers::request;
//!
//! let m = request()
//!     .method("DELETE")
//!     .path("/foo")
//!     .header("Content-Type", "application/json");
//! assert_eq!("Method(DELETE),Path(/foo),Header(Content-Type: application/json)", m.to_string());
//! ```

use crate::recorder::RecordedRequest;
use std::fmt;
use std::sync::Arc;

pub mod request;

type PredicateFn = dyn Fn(&RecordedRequest) -> bool + Send + Sync;

/// A single check on a request along with a human readable description.
#[derive(Clone)]
pub struct Predicate {
    description: String,
    test: Arc<PredicateFn>,
}

impl Predicate {
    /// Create a predicate from a description and a pure function.
    pub fn new<F>(description: impl Into<String>, test: F) -> Self
    where
        F: Fn(&RecordedRequest) -> bool + Send + Sync + 'static,
    {
        Predicate {
            description: description.into(),
            test: Arc::new(test),
        }
    }

    /// Evaluate the predicate.
    pub fn matches(&self, req: &RecordedRequest) -> bool {
        (self.test)(req)
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.description)
    }
}

/// Create a regex.
///
/// This trait may panic if the regex failed to build.
pub trait IntoRegex {
    /// turn self into a regex.
    fn into_regex(self) -> regex::Regex;
}
impl IntoRegex for &str {
    fn into_regex(self) -> regex::Regex {
        regex::Regex::new(self).expect("failed to create regex")
    }
}
impl IntoRegex for String {
    fn into_regex(self) -> regex::Regex {
        regex::Regex::new(&self).expect("failed to create regex")
    }
}
impl IntoRegex for &mut regex::RegexBuilder {
    fn into_regex(self) -> regex::Regex {
        self.build().expect("failed to create regex")
    }
}
impl IntoRegex for regex::Regex {
    fn into_regex(self) -> regex::Regex {
        self
    }
}

/// Create a matcher that matches every request.
pub fn request() -> RequestMatcher {
    RequestMatcher::default()
}

/// An AND-combination of request predicates, evaluated in declaration order.
#[derive(Clone, Default)]
pub struct RequestMatcher {
    predicates: Vec<Predicate>,
}

impl RequestMatcher {
    /// Match the given http method (exact, case sensitive).
    pub fn method(self, method: &str) -> Self {
        self.and(request::method(method))
    }

    /// Match the given path exactly.
    pub fn path(self, path: &str) -> Self {
        self.and(request::path(path))
    }

    /// Match the path against a regular expression.
    ///
    /// The pattern is not anchored; use `^` and `$` to match the whole path.
    pub fn path_matches(self, regex: impl IntoRegex) -> Self {
        self.and(request::path_matches(regex.into_regex()))
    }

    /// `get(p)` is shorthand for `method("GET").path(p)`.
    pub fn get(self, path: &str) -> Self {
        self.method("GET").path(path)
    }

    /// `post(p)` is shorthand for `method("POST").path(p)`.
    pub fn post(self, path: &str) -> Self {
        self.method("POST").path(path)
    }

    /// `put(p)` is shorthand for `method("PUT").path(p)`.
    pub fn put(self, path: &str) -> Self {
        self.method("PUT").path(path)
    }

    /// `delete(p)` is shorthand for `method("DELETE").path(p)`.
    pub fn delete(self, path: &str) -> Self {
        self.method("DELETE").path(path)
    }

    /// `patch(p)` is shorthand for `method("PATCH").path(p)`.
    pub fn patch(self, path: &str) -> Self {
        self.method("PATCH").path(path)
    }

    /// `head(p)` is shorthand for `method("HEAD").path(p)`.
    pub fn head(self, path: &str) -> Self {
        self.method("HEAD").path(path)
    }

    /// Match a header value exactly. Header names are case insensitive.
    pub fn header(self, key: &str, value: &str) -> Self {
        self.and(request::header(key, value))
    }

    /// Match a header value against a regular expression.
    pub fn header_matches(self, key: &str, regex: impl IntoRegex) -> Self {
        self.and(request::header_matches(key, regex.into_regex()))
    }

    /// Match only if the header is missing or empty.
    pub fn no_header(self, key: &str) -> Self {
        self.and(request::no_header(key))
    }

    /// Match a query parameter exactly.
    pub fn query(self, key: &str, value: &str) -> Self {
        self.and(request::query(key, value))
    }

    /// Match a query parameter against a regular expression.
    pub fn query_matches(self, key: &str, regex: impl IntoRegex) -> Self {
        self.and(request::query_matches(key, regex.into_regex()))
    }

    /// Match only if the query parameter is missing or empty.
    pub fn no_query(self, key: &str) -> Self {
        self.and(request::no_query(key))
    }

    /// Match the body exactly.
    pub fn body(self, body: impl AsRef<[u8]>) -> Self {
        self.and(request::body(body.as_ref()))
    }

    /// Match a json body equal to `value`, ignoring formatting and key order.
    pub fn json_body(self, value: serde_json::Value) -> Self {
        self.and(request::json_body(value))
    }

    /// Add a custom predicate.
    ///
    /// ```
    /// use mockhttp::matchers::request;
    ///
    /// let m = request().predicate("ShortBody", |req| req.body.len() < 16);
    /// assert_eq!("ShortBody", m.to_string());
    /// ```
    pub fn predicate<F>(self, description: &str, test: F) -> Self
    where
        F: Fn(&RecordedRequest) -> bool + Send + Sync + 'static,
    {
        self.and(Predicate::new(description, test))
    }

    /// Append an already built predicate.
    pub fn and(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// true if every predicate holds. Stops at the first one that does not.
    pub fn matches(&self, req: &RecordedRequest) -> bool {
        log::debug!("Matching {} {} with {:?}", req.method, req.path, self);
        for predicate in &self.predicates {
            if !predicate.matches(req) {
                log::debug!("┗━ ❌ does not match {}", predicate.description());
                return false;
            }
            log::trace!("┃ {} ✅", predicate.description());
        }
        log::debug!("┗━ ✅ matches");
        true
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

impl fmt::Display for RequestMatcher {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, predicate) in self.predicates.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str(predicate.description())?;
        }
        Ok(())
    }
}

impl fmt::Debug for RequestMatcher {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "RequestMatcher[{}]", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn get(uri: &str) -> RecordedRequest {
        RecordedRequest::from_request(&http::Request::get(uri).body(Bytes::new()).unwrap())
    }

    #[test]
    fn test_empty_matches_everything() {
        let m = request();
        assert!(m.is_empty());
        assert_eq!("", m.to_string());
        assert!(m.matches(&get("/")));
        assert!(m.matches(&get("http://example.com/foo/bar?x=1")));
    }

    #[test]
    fn test_all_predicates_must_hold() {
        let m = request().get("/foo").query("q", "1");
        assert!(m.matches(&get("/foo?q=1")));
        assert!(!m.matches(&get("/foo?q=2")));
        assert!(!m.matches(&get("/bar?q=1")));
        let post = RecordedRequest::from_request(
            &http::Request::post("/foo?q=1").body(Bytes::new()).unwrap(),
        );
        assert!(!m.matches(&post));
    }

    #[test]
    fn test_shorthands() {
        for (m, method) in vec![
            (request().get("/x"), "GET"),
            (request().post("/x"), "POST"),
            (request().put("/x"), "PUT"),
            (request().delete("/x"), "DELETE"),
            (request().patch("/x"), "PATCH"),
            (request().head("/x"), "HEAD"),
        ] {
            assert_eq!(format!("Method({}),Path(/x)", method), m.to_string());
            assert_eq!(2, m.predicates().len());
        }
    }

    #[test]
    fn test_description_order() {
        let m = request()
            .path_matches("^/api/")
            .no_header("Authorization")
            .query_matches("page", r"^\d+$")
            .method("PUT");
        assert_eq!(
            r"PathMatches(^/api/),NoHeader(Authorization),QueryMatches(page: ^\d+$),Method(PUT)",
            m.to_string()
        );
    }

    #[test]
    fn test_short_circuit() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();
        let m = request().path("/never").predicate("Counted", move |_| {
            counted.fetch_add(1, Ordering::SeqCst);
            true
        });
        assert!(!m.matches(&get("/foo")));
        assert_eq!(0, calls.load(Ordering::SeqCst));
        assert!(m.matches(&get("/never")));
        assert_eq!(1, calls.load(Ordering::SeqCst));
    }

    #[test]
    fn test_into_regex() {
        let r = get("/FOOBAR");
        assert!(request().path_matches("(?i)foobar").matches(&r));
        assert!(request().path_matches("/FOO".to_owned()).matches(&r));
        assert!(request()
            .path_matches(regex::RegexBuilder::new("foobar").case_insensitive(true))
            .matches(&r));
        assert!(!request()
            .path_matches(regex::Regex::new("foobar").unwrap())
            .matches(&r));
    }

    #[test]
    #[should_panic(expected = "failed to create regex")]
    fn test_invalid_regex() {
        let _ = request().path_matches("(unclosed");
    }
}
