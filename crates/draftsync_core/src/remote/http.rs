//! reqwest-backed transport.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, DATE, ETAG, HeaderMap, LAST_MODIFIED};

use super::{RawResponse, RemoteRequest, RemoteTransport};
use crate::future::BoxFuture;

/// [`RemoteTransport`] over a shared [`reqwest::Client`].
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with a default client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an existing client (proxies, timeouts, ...).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn prepare(
        &self,
        mut builder: reqwest::RequestBuilder,
        request: &RemoteRequest,
    ) -> reqwest::RequestBuilder {
        if let Some((name, value)) = request.precondition.header() {
            builder = builder.header(name, value);
        }
        if let Some(auth) = &request.authorization {
            builder = builder.header(AUTHORIZATION, auth.as_str());
        }
        builder
    }

    async fn send(builder: reqwest::RequestBuilder) -> Result<RawResponse, String> {
        let response = builder
            .send()
            .await
            .map_err(|e| format!("Request failed: {}", e))?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(|e| format!("Failed to read response body: {}", e))?;

        Ok(RawResponse {
            status,
            etag: header_string(&headers, ETAG),
            last_modified: header_string(&headers, LAST_MODIFIED),
            date: header_string(&headers, DATE),
            body: (!body.is_empty() || status == 200).then_some(body),
        })
    }
}

fn header_string(headers: &HeaderMap, name: reqwest::header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

impl RemoteTransport for HttpTransport {
    fn get<'a>(&'a self, request: &'a RemoteRequest) -> BoxFuture<'a, Result<RawResponse, String>> {
        Box::pin(async move {
            let builder = self.prepare(self.client.get(&request.url), request);
            Self::send(builder).await
        })
    }

    fn put<'a>(
        &'a self,
        request: &'a RemoteRequest,
        body: &'a str,
        media_type: &'a str,
    ) -> BoxFuture<'a, Result<RawResponse, String>> {
        Box::pin(async move {
            let builder = self
                .prepare(self.client.put(&request.url), request)
                .header(CONTENT_TYPE, media_type)
                .body(body.to_string());
            Self::send(builder).await
        })
    }
}
