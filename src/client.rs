//! The remote Prisma Cloud client contract.
//!
//! The provider never talks HTTP itself. Whatever owns the session (login,
//! token refresh, transport retries) implements [`Client`] and hands it to
//! [`PrismaCloudProvider::new`](crate::provider::PrismaCloudProvider::new).
//! The handle is shared between every resource kind, so implementations must
//! be safe to use concurrently.

use async_trait::async_trait;
use thiserror::Error;

use crate::data_sources::cloud_accounts::CloudAccountSummary;
use crate::resources::account_group::AccountGroup;
use crate::resources::permission_group::PermissionGroup;

/// Errors returned by the remote API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The identifier does not name an existing object.
    #[error("Invalid id: {0}")]
    InvalidId(String),

    /// The object (looked up by id or name) does not exist.
    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    /// The API answered with a non-success status.
    #[error("Request rejected ({status}): {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Message returned by the API.
        message: String,
    },

    /// The request never got an answer.
    #[error("Transport error: {0}")]
    Transport(String),
}

impl ClientError {
    /// Whether the API reported the object as absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::InvalidId(_) | Self::ObjectNotFound(_))
    }
}

/// CRUD operations for one entity kind.
#[async_trait]
pub trait EntityApi<E>: Send + Sync {
    /// Create the entity. The remote side assigns the identifier.
    async fn create(&self, entity: &E) -> Result<(), ClientError>;

    /// Fetch an entity by identifier.
    async fn get(&self, id: &str) -> Result<E, ClientError>;

    /// Replace the entity named by its identifier.
    async fn update(&self, entity: &E) -> Result<(), ClientError>;

    /// Delete an entity by identifier.
    async fn delete(&self, id: &str) -> Result<(), ClientError>;

    /// Resolve a human name to the remote identifier.
    async fn identify(&self, name: &str) -> Result<String, ClientError>;
}

/// Read-only enumeration of onboarded cloud accounts.
#[async_trait]
pub trait CloudAccountApi: Send + Sync {
    /// List every account, in backend order.
    async fn names(&self) -> Result<Vec<CloudAccountSummary>, ClientError>;
}

/// An authenticated Prisma Cloud session.
pub trait Client: Send + Sync + 'static {
    /// Permission group endpoints.
    fn permission_groups(&self) -> &dyn EntityApi<PermissionGroup>;

    /// Account group endpoints.
    fn account_groups(&self) -> &dyn EntityApi<AccountGroup>;

    /// Cloud account endpoints.
    fn cloud_accounts(&self) -> &dyn CloudAccountApi;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        assert!(ClientError::InvalidId("abc".into()).is_not_found());
        assert!(ClientError::ObjectNotFound("abc".into()).is_not_found());
        assert!(!ClientError::Transport("reset".into()).is_not_found());
        assert!(!ClientError::Rejected {
            status: 400,
            message: "bad".into()
        }
        .is_not_found());
    }

    #[test]
    fn test_client_error_display() {
        let err = ClientError::Rejected {
            status: 409,
            message: "duplicate name".into(),
        };
        assert_eq!(err.to_string(), "Request rejected (409): duplicate name");
    }
}
