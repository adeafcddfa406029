//! Credentials for the remote resource.
//!
//! Authentication itself (WebID, OIDC, magic links, ...) happens outside the
//! engine. The engine only needs an `Authorization` header value and a way to
//! ask for fresh credentials once after a 401.

use std::sync::RwLock;

use crate::error::Result;
use crate::future::BoxFuture;

/// Source of the `Authorization` header for remote requests.
pub trait CredentialProvider: Send + Sync {
    /// Header value to send, if signed in.
    fn authorization(&self) -> Option<String>;

    /// Whether an identity is present at all.
    ///
    /// Decides between `Unauthenticated` and `Unauthorized` on a 401.
    fn has_identity(&self) -> bool {
        self.authorization().is_some()
    }

    /// Try to obtain fresh credentials. Returns `true` if they changed.
    fn refresh(&self) -> BoxFuture<'_, Result<bool>>;
}

/// A fixed bearer token (or none).
#[derive(Debug, Default)]
pub struct StaticCredentials {
    token: RwLock<Option<String>>,
}

impl StaticCredentials {
    /// No identity; requests go out unauthenticated.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Authenticate with a bearer token.
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }

    /// Replace the token (e.g. after the user signed in again).
    pub fn set_token(&self, token: Option<String>) {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = token;
    }
}

impl CredentialProvider for StaticCredentials {
    fn authorization(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|t| format!("Bearer {}", t))
    }

    fn refresh(&self) -> BoxFuture<'_, Result<bool>> {
        Box::pin(async move { Ok(false) })
    }
}
