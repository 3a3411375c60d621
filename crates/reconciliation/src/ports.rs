//! Port traits implemented by infrastructure crates.
//!
//! The domain states *what* it needs from the outside world; the `accelbyte`
//! and `ssm` crates supply the *how*. Tests substitute in-memory fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{BackendConfig, DsStatusUpdate, Namespace, ParameterError, PlacementId, SessionError};

/// The fields of a backend game session that every update must echo back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Client build the session was matched for.
    pub client_version: Option<String>,
    /// Match pool the session was created from; reported as the game mode.
    pub game_mode: Option<String>,
}

/// Backend platform session operations used by the reconciler.
///
/// Implementations apply their own retry policy; a returned error is final
/// for the event in question.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetches the session whose id equals `placement_id`.
    async fn get_session(
        &self,
        namespace: &Namespace,
        placement_id: &PlacementId,
    ) -> Result<SessionRecord, SessionError>;

    /// Writes dedicated server information onto the session.
    async fn update_ds_information(
        &self,
        namespace: &Namespace,
        placement_id: &PlacementId,
        update: &DsStatusUpdate,
    ) -> Result<(), SessionError>;
}

/// Builds an authenticated [`SessionStore`] from resolved configuration.
///
/// Called once per batch invocation.
#[async_trait]
pub trait SessionConnector: Send + Sync {
    /// The store produced on successful authentication.
    type Store: SessionStore;

    /// Authenticates with the backend using the client credentials in `config`.
    async fn connect(&self, config: &BackendConfig) -> Result<Self::Store, SessionError>;
}

/// Read access to a secure parameter store.
#[async_trait]
pub trait ParameterStore: Send + Sync {
    /// Returns the decrypted value stored under `name`.
    async fn get(&self, name: &str) -> Result<String, ParameterError>;
}
