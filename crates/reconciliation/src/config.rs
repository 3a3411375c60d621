//! Backend platform configuration resolved from the parameter store.
//!
//! Configuration is fetched once per batch invocation and passed by value into
//! the session connector and the reconciler. There is no process-wide state.

use crate::{Namespace, ParameterError, ParameterStore, ReconcilerError};

/// Fixed parameter store names holding the backend configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterName {
    /// Backend platform base URL.
    BaseUrl,
    /// OAuth client id.
    ClientId,
    /// OAuth client secret.
    ClientSecret,
    /// Backend namespace owning the game sessions.
    Namespace,
}

impl ParameterName {
    /// All parameters required to start a batch, in fetch order.
    pub const ALL: [ParameterName; 4] = [
        Self::BaseUrl,
        Self::ClientId,
        Self::ClientSecret,
        Self::Namespace,
    ];

    /// Returns the parameter store key.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BaseUrl => "/lambda/ab_base_url",
            Self::ClientId => "/lambda/ab_client_id",
            Self::ClientSecret => "/lambda/ab_client_secret",
            Self::Namespace => "/lambda/ab_namespace_name",
        }
    }
}

impl std::fmt::Display for ParameterName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything needed to authenticate against and address the backend.
#[derive(Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// Base URL without a trailing slash.
    pub base_url: String,
    /// OAuth client id.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// Namespace owning the game sessions.
    pub namespace: Namespace,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("namespace", &self.namespace)
            .finish()
    }
}

impl BackendConfig {
    /// Resolves the four backend parameters from `store`.
    ///
    /// Any missing, undecryptable, or empty parameter is fatal for the
    /// invocation and reported as [`ReconcilerError::Configuration`].
    pub async fn load(store: &dyn ParameterStore) -> Result<Self, ReconcilerError> {
        let base_url = fetch(store, ParameterName::BaseUrl).await?;
        let client_id = fetch(store, ParameterName::ClientId).await?;
        let client_secret = fetch(store, ParameterName::ClientSecret).await?;
        let namespace = fetch(store, ParameterName::Namespace).await?;

        let namespace = Namespace::new(namespace).ok_or_else(|| ReconcilerError::Configuration {
            message: format!("{} is empty", ParameterName::Namespace),
            source: None,
        })?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            client_id,
            client_secret,
            namespace,
        })
    }
}

async fn fetch(store: &dyn ParameterStore, name: ParameterName) -> Result<String, ReconcilerError> {
    let value = store
        .get(name.as_str())
        .await
        .map_err(|err: ParameterError| ReconcilerError::Configuration {
            message: format!("cannot read {name}"),
            source: Some(err),
        })?;

    if value.trim().is_empty() {
        return Err(ReconcilerError::Configuration {
            message: format!("{name} is empty"),
            source: None,
        });
    }
    Ok(value)
}
