//! Error types for the Prisma Cloud provider.

use thiserror::Error;

use crate::client::ClientError;
use crate::schema::Diagnostic;

/// Errors that abort a lifecycle operation.
///
/// Every variant is fatal for the operation that produced it. The
/// non-fatal outcomes (drift on read, not-found on delete) never surface as a
/// `ProviderError`; the reconciler handles them before they get here.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested resource was not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A validation error occurred.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A configuration error occurred.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource or data source type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The state handed to the translator does not match the schema it was
    /// declared with.
    #[error("Programming error: {0}")]
    Programming(String),

    /// The remote API rejected or failed a request.
    #[error("Remote API error: {0}")]
    Remote(#[from] ClientError),

    /// Polling gave up before the remote side reflected a change.
    #[error("Deadline exceeded after {attempts} attempt(s) waiting for {what}: {source}")]
    DeadlineExceeded {
        /// What was being waited for.
        what: String,
        /// How many times the probe ran.
        attempts: u32,
        /// The error returned by the last probe.
        #[source]
        source: ClientError,
    },

    /// The operation was cancelled while waiting.
    #[error("Cancelled: {0}")]
    Cancelled(String),
}

impl ProviderError {
    /// Build a [`ProviderError::Programming`] error.
    pub fn programming(msg: impl Into<String>) -> Self {
        Self::Programming(msg.into())
    }

    /// Whether this error came from a remote "does not exist" answer.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Remote(err) => err.is_not_found(),
            _ => false,
        }
    }
}

impl From<ProviderError> for Diagnostic {
    fn from(err: ProviderError) -> Self {
        let diagnostic = Diagnostic::error(err.to_string());
        match err {
            ProviderError::Programming(_) => diagnostic
                .with_detail("The configuration does not match the resource schema; please report this"),
            ProviderError::DeadlineExceeded { attempts, .. } => diagnostic.with_detail(format!(
                "The remote API accepted the request but did not reflect it after {} probe(s)",
                attempts
            )),
            _ => diagnostic,
        }
    }
}
