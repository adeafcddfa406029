use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::{Precondition, RawResponse, RemoteRequest, RemoteTransport};
use crate::credentials::CredentialProvider;
use crate::error::{Result, SyncError};

/// Outcome class of a conditional GET.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    /// 2xx with a representation
    Modified,
    /// 304, the known validator is still current
    NotModified,
    /// 404 / 410
    NotFound,
}

/// Classified result of a conditional GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    /// Outcome class
    pub status: FetchStatus,
    /// `ETag` of the representation (verbatim)
    pub etag: Option<String>,
    /// Parsed `Last-Modified`
    pub last_modified: Option<DateTime<Utc>>,
    /// Parsed `Date`
    pub date: Option<DateTime<Utc>>,
    /// Body, present for [`FetchStatus::Modified`]
    pub body: Option<String>,
}

/// Classified result of a successful PUT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutResponse {
    /// HTTP status (2xx)
    pub status: u16,
    /// New `ETag`, if the server returned one
    pub etag: Option<String>,
    /// Parsed `Last-Modified`
    pub last_modified: Option<DateTime<Utc>>,
    /// Parsed `Date`
    pub date: Option<DateTime<Utc>>,
}

/// Parse an HTTP date (`Wed, 21 Oct 2015 07:28:00 GMT`).
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Issues conditional requests and classifies their responses.
///
/// Performs exactly one exchange per call. Retries (after a credential
/// refresh, or a fresh reconcile after 412) are the orchestrator's business.
#[derive(Clone)]
pub struct ConditionalClient {
    transport: Arc<dyn RemoteTransport>,
    credentials: Arc<dyn CredentialProvider>,
}

impl ConditionalClient {
    /// Create a client over `transport`, authenticating with `credentials`.
    pub fn new(
        transport: Arc<dyn RemoteTransport>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        Self {
            transport,
            credentials,
        }
    }

    /// The credential provider requests are signed with.
    pub fn credentials(&self) -> &Arc<dyn CredentialProvider> {
        &self.credentials
    }

    fn request(&self, url: &str, precondition: Precondition) -> RemoteRequest {
        RemoteRequest {
            url: url.to_string(),
            precondition,
            authorization: self.credentials.authorization(),
        }
    }

    /// GET `url`, sending `If-None-Match` when a validator is known.
    pub async fn fetch_with_validator(
        &self,
        url: &str,
        known_etag: Option<&str>,
    ) -> Result<FetchResponse> {
        let precondition = match known_etag {
            Some(etag) => Precondition::IfNoneMatch(etag.to_string()),
            None => Precondition::None,
        };
        let request = self.request(url, precondition);

        log::debug!(
            "[ConditionalClient] GET {} (validator: {:?})",
            url,
            known_etag
        );

        let raw = self
            .transport
            .get(&request)
            .await
            .map_err(|reason| SyncError::TransientNetworkFailure {
                url: url.to_string(),
                reason,
            })?;

        log::debug!("[ConditionalClient] GET {} -> {}", url, raw.status);

        let status = match raw.status {
            200..=299 => FetchStatus::Modified,
            304 => FetchStatus::NotModified,
            404 | 410 => FetchStatus::NotFound,
            other => return Err(self.classify_failure(url, other, false)),
        };

        let body = match status {
            FetchStatus::Modified => Some(raw.body.clone().unwrap_or_default()),
            _ => None,
        };

        Ok(FetchResponse {
            status,
            etag: raw.etag.clone(),
            last_modified: raw.last_modified.as_deref().and_then(parse_http_date),
            date: raw.date.as_deref().and_then(parse_http_date),
            body,
        })
    }

    /// PUT `content` to `url` under `precondition`.
    pub async fn put_with_precondition(
        &self,
        url: &str,
        content: &str,
        media_type: &str,
        precondition: Precondition,
    ) -> Result<PutResponse> {
        let request = self.request(url, precondition);

        log::debug!(
            "[ConditionalClient] PUT {} ({:?})",
            url,
            request.precondition
        );

        let raw: RawResponse = self
            .transport
            .put(&request, content, media_type)
            .await
            .map_err(|reason| SyncError::TransientNetworkFailure {
                url: url.to_string(),
                reason,
            })?;

        log::debug!("[ConditionalClient] PUT {} -> {}", url, raw.status);

        match raw.status {
            200..=299 => Ok(PutResponse {
                status: raw.status,
                etag: raw.etag,
                last_modified: raw.last_modified.as_deref().and_then(parse_http_date),
                date: raw.date.as_deref().and_then(parse_http_date),
            }),
            412 => Err(SyncError::PreconditionFailed {
                url: url.to_string(),
            }),
            other => Err(self.classify_failure(url, other, true)),
        }
    }

    fn classify_failure(&self, url: &str, status: u16, is_write: bool) -> SyncError {
        let url = url.to_string();
        match status {
            401 if !self.credentials.has_identity() => SyncError::Unauthenticated { url },
            401 | 403 => SyncError::Unauthorized { url, status },
            405 if is_write => SyncError::Unauthorized { url, status },
            500..=599 => SyncError::TransientNetworkFailure {
                url,
                reason: format!("HTTP {}", status),
            },
            _ => SyncError::UnhandledStatus { url, status },
        }
    }
}

impl std::fmt::Debug for ConditionalClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConditionalClient").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::credentials::StaticCredentials;
    use crate::future::{BoxFuture, block_on_test};

    /// Replies with one fixed response and records requests.
    struct FixedTransport {
        response: std::result::Result<RawResponse, String>,
        seen: Mutex<Vec<RemoteRequest>>,
    }

    impl FixedTransport {
        fn new(response: std::result::Result<RawResponse, String>) -> Arc<Self> {
            Arc::new(Self {
                response,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    impl RemoteTransport for FixedTransport {
        fn get<'a>(
            &'a self,
            request: &'a RemoteRequest,
        ) -> BoxFuture<'a, std::result::Result<RawResponse, String>> {
            self.seen.lock().unwrap().push(request.clone());
            let response = self.response.clone();
            Box::pin(async move { response })
        }

        fn put<'a>(
            &'a self,
            request: &'a RemoteRequest,
            _body: &'a str,
            _media_type: &'a str,
        ) -> BoxFuture<'a, std::result::Result<RawResponse, String>> {
            self.get(request)
        }
    }

    const URL: &str = "https://pod.example/notes/a";

    fn client(
        response: std::result::Result<RawResponse, String>,
        creds: StaticCredentials,
    ) -> (ConditionalClient, Arc<FixedTransport>) {
        let transport = FixedTransport::new(response);
        (
            ConditionalClient::new(transport.clone(), Arc::new(creds)),
            transport,
        )
    }

    #[test]
    fn test_fetch_modified() {
        let (client, transport) = client(
            Ok(RawResponse::status(200)
                .with_etag("\"r2\"")
                .with_body("<p>x</p>")
                .with_last_modified("Wed, 21 Oct 2015 07:28:00 GMT")),
            StaticCredentials::bearer("t"),
        );
        let response = block_on_test(client.fetch_with_validator(URL, Some("\"r1\""))).unwrap();

        assert_eq!(response.status, FetchStatus::Modified);
        assert_eq!(response.etag.as_deref(), Some("\"r2\""));
        assert_eq!(response.body.as_deref(), Some("<p>x</p>"));
        assert_eq!(
            response.last_modified.unwrap().to_rfc3339(),
            "2015-10-21T07:28:00+00:00"
        );

        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen[0].precondition, Precondition::IfNoneMatch("\"r1\"".into()));
        assert_eq!(seen[0].authorization.as_deref(), Some("Bearer t"));
    }

    #[test]
    fn test_fetch_without_validator_is_unconditional() {
        let (client, transport) = client(
            Ok(RawResponse::status(404)),
            StaticCredentials::anonymous(),
        );
        let response = block_on_test(client.fetch_with_validator(URL, None)).unwrap();
        assert_eq!(response.status, FetchStatus::NotFound);
        assert!(response.body.is_none());
        assert_eq!(transport.seen.lock().unwrap()[0].precondition, Precondition::None);
    }

    #[test]
    fn test_fetch_not_modified() {
        let (client, _) = client(Ok(RawResponse::status(304)), StaticCredentials::anonymous());
        let response = block_on_test(client.fetch_with_validator(URL, Some("r1"))).unwrap();
        assert_eq!(response.status, FetchStatus::NotModified);
    }

    #[test]
    fn test_fetch_failures() {
        let cases: Vec<(u16, StaticCredentials, &str)> = vec![
            (401, StaticCredentials::anonymous(), "Unauthenticated"),
            (401, StaticCredentials::bearer("t"), "Unauthorized"),
            (403, StaticCredentials::bearer("t"), "Unauthorized"),
            (503, StaticCredentials::anonymous(), "TransientNetworkFailure"),
            (405, StaticCredentials::anonymous(), "UnhandledStatus"),
            (418, StaticCredentials::anonymous(), "UnhandledStatus"),
        ];
        for (status, creds, kind) in cases {
            let (client, _) = client(Ok(RawResponse::status(status)), creds);
            let err = block_on_test(client.fetch_with_validator(URL, None)).unwrap_err();
            assert_eq!(err.to_serializable().kind, kind, "status {}", status);
        }
    }

    #[test]
    fn test_transport_error_is_transient() {
        let (client, _) = client(
            Err("connection refused".to_string()),
            StaticCredentials::anonymous(),
        );
        let err = block_on_test(client.fetch_with_validator(URL, None)).unwrap_err();
        assert!(err.is_transient());
    }

    #[test]
    fn test_put_classification() {
        let (ok, _) = client(
            Ok(RawResponse::status(204).with_etag("\"r2\"")),
            StaticCredentials::bearer("t"),
        );
        let response = block_on_test(ok.put_with_precondition(
            URL,
            "<p>x</p>",
            "text/html",
            Precondition::IfMatch("\"r1\"".into()),
        ))
        .unwrap();
        assert_eq!(response.status, 204);
        assert_eq!(response.etag.as_deref(), Some("\"r2\""));

        let cases = [
            (412, "PreconditionFailed"),
            (405, "Unauthorized"),
            (403, "Unauthorized"),
            (502, "TransientNetworkFailure"),
            (409, "UnhandledStatus"),
        ];
        for (status, kind) in cases {
            let (client, _) = client(
                Ok(RawResponse::status(status)),
                StaticCredentials::bearer("t"),
            );
            let err = block_on_test(client.put_with_precondition(
                URL,
                "",
                "text/html",
                Precondition::IfNoneMatchAny,
            ))
            .unwrap_err();
            assert_eq!(err.to_serializable().kind, kind, "status {}", status);
        }
    }

    #[test]
    fn test_parse_http_date() {
        assert!(parse_http_date("Wed, 21 Oct 2015 07:28:00 GMT").is_some());
        assert!(parse_http_date("yesterday").is_none());
    }
}
