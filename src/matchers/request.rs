//! Predicates that extract information from a recorded request.
//!
//! Each constructor pairs the check with the fragment used to describe it, for
//! example `Method(GET)` or `HeaderMatches(x-id: ^\d+$)`.

use super::Predicate;
use crate::recorder::RecordedRequest;
use bstr::ByteSlice;
use regex::Regex;

/// The method equals `method`.
pub fn method(method: &str) -> Predicate {
    let expected = method.to_owned();
    Predicate::new(format!("Method({})", method), move |req| {
        req.method.as_str() == expected
    })
}

/// The path equals `path`.
pub fn path(path: &str) -> Predicate {
    let expected = path.to_owned();
    Predicate::new(format!("Path({})", path), move |req| req.path == expected)
}

/// The path is matched by `regex`.
pub fn path_matches(regex: Regex) -> Predicate {
    Predicate::new(format!("PathMatches({})", regex), move |req| {
        regex.is_match(&req.path)
    })
}

/// The first value of header `key` equals `value`.
pub fn header(key: &str, value: &str) -> Predicate {
    let (k, v) = (key.to_owned(), value.to_owned());
    Predicate::new(format!("Header({}: {})", key, value), move |req| {
        header_value(req, &k) == v.as_bytes()
    })
}

/// The first value of header `key` is matched by `regex`.
pub fn header_matches(key: &str, regex: Regex) -> Predicate {
    let k = key.to_owned();
    Predicate::new(format!("HeaderMatches({}: {})", key, regex), move |req| {
        regex.is_match(&header_value(req, &k).to_str_lossy())
    })
}

/// Header `key` is missing or empty.
pub fn no_header(key: &str) -> Predicate {
    let k = key.to_owned();
    Predicate::new(format!("NoHeader({})", key), move |req| {
        header_value(req, &k).is_empty()
    })
}

/// The first value of query parameter `key` equals `value`.
pub fn query(key: &str, value: &str) -> Predicate {
    let (k, v) = (key.to_owned(), value.to_owned());
    Predicate::new(format!("Query({}: {})", key, value), move |req| {
        req.query_value(&k).unwrap_or("") == v
    })
}

/// The first value of query parameter `key` is matched by `regex`.
pub fn query_matches(key: &str, regex: Regex) -> Predicate {
    let k = key.to_owned();
    Predicate::new(format!("QueryMatches({}: {})", key, regex), move |req| {
        regex.is_match(req.query_value(&k).unwrap_or(""))
    })
}

/// Query parameter `key` is missing or empty.
pub fn no_query(key: &str) -> Predicate {
    let k = key.to_owned();
    Predicate::new(format!("NoQuery({})", key), move |req| {
        req.query_value(&k).unwrap_or("").is_empty()
    })
}

/// The body equals `body` byte for byte.
pub fn body(body: &[u8]) -> Predicate {
    let expected = body.to_owned();
    Predicate::new(
        format!("Body({:?})", bstr::BStr::new(body)),
        move |req| req.body.as_ref() == expected.as_slice(),
    )
}

/// The body is json equal to `value`. Bodies that fail to decode never match.
pub fn json_body(value: serde_json::Value) -> Predicate {
    Predicate::new(format!("JsonBody({})", value), move |req| {
        match serde_json::from_slice::<serde_json::Value>(&req.body) {
            Ok(decoded) => decoded == value,
            Err(_) => false,
        }
    })
}

// Raw bytes of the first value; a missing header is empty.
fn header_value<'a>(req: &'a RecordedRequest, key: &str) -> &'a [u8] {
    req.headers.get(key).map(|v| v.as_bytes()).unwrap_or(b"")
}
