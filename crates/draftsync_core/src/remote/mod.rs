//! Conditional HTTP access to the remote copy.
//!
//! Two layers:
//!
//! - [`RemoteTransport`]: the raw seam that performs one GET or PUT and hands
//!   back the status, validators and body. A reqwest implementation lives in
//!   [`HttpTransport`] behind the `native-http` feature; tests script their own.
//! - [`ConditionalClient`]: classifies raw responses into typed outcomes and
//!   [`SyncError`](crate::error::SyncError)s. It never retries and never
//!   decides what to do with a result.

mod client;
#[cfg(feature = "native-http")]
mod http;

pub use client::{ConditionalClient, FetchResponse, FetchStatus, PutResponse, parse_http_date};
#[cfg(feature = "native-http")]
pub use http::HttpTransport;

use crate::future::BoxFuture;

/// Precondition attached to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
    /// Unconditional
    None,
    /// `If-None-Match: <etag>` (conditional GET)
    IfNoneMatch(String),
    /// `If-Match: <etag>` (update only if unchanged)
    IfMatch(String),
    /// `If-None-Match: *` (create only if missing)
    IfNoneMatchAny,
}

impl Precondition {
    /// Header name and value, if any.
    pub fn header(&self) -> Option<(&'static str, String)> {
        match self {
            Precondition::None => None,
            Precondition::IfNoneMatch(etag) => Some(("If-None-Match", quote_etag(etag))),
            Precondition::IfMatch(etag) => Some(("If-Match", quote_etag(etag))),
            Precondition::IfNoneMatchAny => Some(("If-None-Match", "*".to_string())),
        }
    }
}

/// Quote an entity tag for the wire if the server handed it back bare.
///
/// Already-quoted and weak (`W/"..."`) validators are passed through.
pub fn quote_etag(etag: &str) -> String {
    let etag = etag.trim();
    if etag.starts_with('"') || etag.starts_with("W/") {
        etag.to_string()
    } else {
        format!("\"{}\"", etag)
    }
}

/// Whether `etag` is a weak validator (`W/"..."`).
pub fn is_weak_etag(etag: &str) -> bool {
    etag.trim_start().starts_with("W/")
}

/// An outgoing request as seen by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRequest {
    /// Target URL
    pub url: String,
    /// Conditional header
    pub precondition: Precondition,
    /// `Authorization` header value
    pub authorization: Option<String>,
}

/// A response as seen by a transport, before classification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code
    pub status: u16,
    /// `ETag` header
    pub etag: Option<String>,
    /// `Last-Modified` header
    pub last_modified: Option<String>,
    /// `Date` header
    pub date: Option<String>,
    /// Response body, if any
    pub body: Option<String>,
}

impl RawResponse {
    /// A response with just a status.
    pub fn status(status: u16) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    /// Set the `ETag` header.
    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set the `Last-Modified` header.
    pub fn with_last_modified(mut self, value: impl Into<String>) -> Self {
        self.last_modified = Some(value.into());
        self
    }

    /// Set the `Date` header.
    pub fn with_date(mut self, value: impl Into<String>) -> Self {
        self.date = Some(value.into());
        self
    }
}

/// Performs raw HTTP exchanges with the remote.
///
/// Errors are network-level failures (no response at all) described as text;
/// any HTTP status, including 5xx, is a successful exchange.
pub trait RemoteTransport: Send + Sync {
    /// Issue a GET.
    fn get<'a>(&'a self, request: &'a RemoteRequest) -> BoxFuture<'a, Result<RawResponse, String>>;

    /// Issue a PUT with `body` of `media_type`.
    fn put<'a>(
        &'a self,
        request: &'a RemoteRequest,
        body: &'a str,
        media_type: &'a str,
    ) -> BoxFuture<'a, Result<RawResponse, String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_etag() {
        assert_eq!(quote_etag("r1"), "\"r1\"");
        assert_eq!(quote_etag("\"r1\""), "\"r1\"");
        assert_eq!(quote_etag("W/\"r1\""), "W/\"r1\"");
    }

    #[test]
    fn test_is_weak_etag() {
        assert!(is_weak_etag("W/\"r1\""));
        assert!(!is_weak_etag("\"r1\""));
        assert!(!is_weak_etag("r1"));
    }

    #[test]
    fn test_precondition_headers() {
        assert_eq!(Precondition::None.header(), None);
        assert_eq!(
            Precondition::IfMatch("r1".into()).header(),
            Some(("If-Match", "\"r1\"".to_string()))
        );
        assert_eq!(
            Precondition::IfNoneMatch("\"r1\"".into()).header(),
            Some(("If-None-Match", "\"r1\"".to_string()))
        );
        assert_eq!(
            Precondition::IfNoneMatchAny.header(),
            Some(("If-None-Match", "*".to_string()))
        );
    }
}
