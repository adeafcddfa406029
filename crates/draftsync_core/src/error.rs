use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

/// Unified error type for draftsync operations
#[derive(Debug, Error)]
pub enum SyncError {
    // Remote errors
    #[error("Sign in required to access '{url}'")]
    Unauthenticated { url: String },

    #[error("Not allowed to access '{url}' (HTTP {status})")]
    Unauthorized { url: String, status: u16 },

    #[error("Remote resource '{url}' no longer exists")]
    RemoteDeleted { url: String },

    #[error("Remote resource '{url}' changed while saving")]
    PreconditionFailed { url: String },

    #[error("Could not reach '{url}': {reason}")]
    TransientNetworkFailure { url: String, reason: String },

    #[error("Unexpected HTTP {status} from '{url}'")]
    UnhandledStatus { url: String, status: u16 },

    // Review errors
    #[error("No conflict review is pending for '{0}'")]
    NoPendingReview(String),

    #[error("Invalid resolution '{0}'. Use 'local' or 'remote'; merged content is passed separately")]
    InvalidResolution(String),

    // Storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    // Config errors
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("No remote URL configured. Run 'draftsync init --remote <url>' first.")]
    RemoteNotConfigured,
}

/// Result type alias for draftsync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// What the user can do about a surfaced error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum UserAction {
    /// Try again later (or wait for connectivity to return)
    Retry,
    /// Sign in (or refresh credentials) and try again
    SignIn,
    /// Pick one of the conflict resolutions
    ResolveConflict,
    /// Nothing actionable
    None,
}

impl SyncError {
    /// Whether the error is expected to clear up on its own (e.g. on reconnect).
    pub fn is_transient(&self) -> bool {
        matches!(self, SyncError::TransientNetworkFailure { .. })
    }

    /// The affordance offered alongside the message.
    pub fn user_action(&self) -> UserAction {
        match self {
            SyncError::Unauthenticated { .. } | SyncError::Unauthorized { .. } => {
                UserAction::SignIn
            }
            SyncError::TransientNetworkFailure { .. } | SyncError::PreconditionFailed { .. } => {
                UserAction::Retry
            }
            SyncError::InvalidResolution(_) => UserAction::ResolveConflict,
            _ => UserAction::None,
        }
    }

    /// Human-readable message for notifications.
    pub fn user_message(&self) -> String {
        match self {
            SyncError::Unauthenticated { .. } => {
                "You need to sign in before changes can be saved remotely.".to_string()
            }
            SyncError::Unauthorized { .. } => {
                "You do not have write access to the remote copy. Changes are kept locally."
                    .to_string()
            }
            SyncError::RemoteDeleted { url } => {
                format!("The remote copy at {} was deleted.", url)
            }
            SyncError::PreconditionFailed { .. } => {
                "The remote copy changed while saving. Your changes are kept locally.".to_string()
            }
            SyncError::TransientNetworkFailure { .. } => {
                "The remote copy is unreachable. Changes are kept locally and will sync when the connection returns."
                    .to_string()
            }
            other => other.to_string(),
        }
    }

    /// Convert to a serializable representation for IPC
    pub fn to_serializable(&self) -> SerializableError {
        SerializableError::from(self)
    }
}

/// A serializable representation of SyncError for IPC (e.g., a web UI)
#[derive(Debug, Clone, Serialize)]
pub struct SerializableError {
    /// Error kind/variant name
    pub kind: String,
    /// Human-readable error message
    pub message: String,
    /// Suggested user action
    pub action: UserAction,
    /// HTTP status (if applicable)
    pub status: Option<u16>,
}

impl From<&SyncError> for SerializableError {
    fn from(err: &SyncError) -> Self {
        let kind = match err {
            SyncError::Unauthenticated { .. } => "Unauthenticated",
            SyncError::Unauthorized { .. } => "Unauthorized",
            SyncError::RemoteDeleted { .. } => "RemoteDeleted",
            SyncError::PreconditionFailed { .. } => "PreconditionFailed",
            SyncError::TransientNetworkFailure { .. } => "TransientNetworkFailure",
            SyncError::UnhandledStatus { .. } => "UnhandledStatus",
            SyncError::NoPendingReview(_) => "NoPendingReview",
            SyncError::InvalidResolution(_) => "InvalidResolution",
            SyncError::Storage(_) => "Storage",
            SyncError::Json(_) => "Json",
            SyncError::Io(_) => "Io",
            SyncError::FileRead { .. } => "FileRead",
            SyncError::ConfigParse(_) => "ConfigParse",
            SyncError::ConfigSerialize(_) => "ConfigSerialize",
            SyncError::NoConfigDir => "NoConfigDir",
            SyncError::RemoteNotConfigured => "RemoteNotConfigured",
        }
        .to_string();

        let status = match err {
            SyncError::Unauthenticated { .. } => Some(401),
            SyncError::Unauthorized { status, .. } => Some(*status),
            SyncError::RemoteDeleted { .. } => Some(404),
            SyncError::PreconditionFailed { .. } => Some(412),
            SyncError::UnhandledStatus { status, .. } => Some(*status),
            _ => None,
        };

        Self {
            kind,
            message: err.user_message(),
            action: err.user_action(),
            status,
        }
    }
}

impl From<SyncError> for SerializableError {
    fn from(err: SyncError) -> Self {
        SerializableError::from(&err)
    }
}
