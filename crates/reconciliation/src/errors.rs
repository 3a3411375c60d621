//! Error and retry-policy types for the reconciliation domain.
//!
//! Errors fall into two tiers:
//!
//! - **Per-event** errors ([`EventError`]) are captured as values in the batch
//!   report. One bad message never aborts the rest of the batch.
//! - **Invocation-fatal** errors ([`ReconcilerError`]) stop the batch before any
//!   event is processed, because nothing can be reconciled without credentials
//!   or an authenticated backend client.
//!
//! [`RetryPolicy`] is a cross-cutting concern: adapter errors classify
//! themselves so retry loops can decide whether another attempt is allowed.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::PlacementId;

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry and, if so, after what delay.
///
/// - `Retryable` errors: transport failures, throttling, 5xx gateway responses.
/// - `NonRetryable` errors: missing sessions, rejected requests, bad credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried.
    Retryable {
        /// Minimum back-off before the next attempt. `None` means apply the
        /// caller's own back-off schedule.
        after: Option<Duration>,
    },
    /// The operation must not be retried.
    NonRetryable,
}

// ---------------------------------------------------------------------------
// Inbound message errors
// ---------------------------------------------------------------------------

/// Why an inbound message could not be turned into a placement event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedInput {
    /// The message body is not a JSON envelope.
    #[error("envelope is not valid JSON: {reason}")]
    InvalidEnvelope {
        /// Parser diagnostic.
        reason: String,
    },

    /// The envelope names no originating resource, so the event cannot be
    /// attributed to a placement queue.
    #[error("envelope has no resources")]
    MissingResources,

    /// The envelope's `detail` payload is not a placement lifecycle event.
    #[error("detail is not a placement event: {reason}")]
    InvalidDetail {
        /// Parser diagnostic.
        reason: String,
    },

    /// The placement event carries an empty `placementId`.
    #[error("placement event has an empty placementId")]
    MissingPlacementId,
}

// ---------------------------------------------------------------------------
// Port errors
// ---------------------------------------------------------------------------

/// Failure reported by a [`crate::SessionStore`] implementation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    /// The backend has no session with the requested id.
    #[error("session {session_id} not found")]
    NotFound {
        /// The session that was looked up.
        session_id: String,
    },

    /// Client credentials were rejected.
    #[error("authentication failed: {message}")]
    Authentication {
        /// Backend or transport diagnostic.
        message: String,
    },

    /// The backend answered with a non-success status.
    #[error("backend returned HTTP {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body or reason phrase.
        message: String,
        /// Delay requested by the backend via `Retry-After`, if any.
        retry_after: Option<Duration>,
    },

    /// The request never produced a response (connect error, timeout).
    #[error("transport error: {message}")]
    Transport {
        /// Underlying client diagnostic.
        message: String,
    },

    /// The response could not be decoded.
    #[error("unexpected response body: {message}")]
    Decode {
        /// Decoder diagnostic.
        message: String,
    },

    /// The configured base URL cannot address backend endpoints.
    #[error("invalid backend base URL {url}: {message}")]
    InvalidBaseUrl {
        /// The configured value.
        url: String,
        /// Parser diagnostic.
        message: String,
    },
}

impl SessionError {
    /// Classifies this error for retry decisions.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::Transport { .. } => RetryPolicy::Retryable { after: None },
            Self::Http {
                status,
                retry_after,
                ..
            } if matches!(status, 429 | 500 | 502 | 503 | 504) => RetryPolicy::Retryable {
                after: *retry_after,
            },
            Self::NotFound { .. }
            | Self::Authentication { .. }
            | Self::Http { .. }
            | Self::Decode { .. }
            | Self::InvalidBaseUrl { .. } => RetryPolicy::NonRetryable,
        }
    }
}

// ---------------------------------------------------------------------------

/// Failure reported by a [`crate::ParameterStore`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParameterError {
    /// No parameter exists under this name.
    #[error("parameter {name} not found")]
    NotFound {
        /// Parameter name that was requested.
        name: String,
    },

    /// The parameter exists but could not be decrypted.
    #[error("parameter {name} could not be decrypted: {message}")]
    Decrypt {
        /// Parameter name that was requested.
        name: String,
        /// Store diagnostic.
        message: String,
    },

    /// The store could not be reached or returned an unusable response.
    #[error("parameter {name} unavailable: {message}")]
    Unavailable {
        /// Parameter name that was requested.
        name: String,
        /// Store or transport diagnostic.
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Per-event outcome errors
// ---------------------------------------------------------------------------

/// Stage of the per-event reconciliation at which a backend call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpstreamStage {
    /// Fetching the prior session record.
    FetchSession,
    /// Committing the derived dedicated server update.
    CommitUpdate,
}

impl std::fmt::Display for UpstreamStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::FetchSession => "fetch_session",
            Self::CommitUpdate => "commit_update",
        })
    }
}

/// Why a single event was not reconciled.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EventError {
    /// The message was discarded before any backend call.
    #[error("malformed input: {0}")]
    MalformedInput(#[from] MalformedInput),

    /// A backend call failed; the event is dropped without batch-level retry.
    #[error("upstream unavailable during {stage} for placement {placement_id}: {source}")]
    UpstreamUnavailable {
        /// Placement whose reconciliation failed.
        placement_id: PlacementId,
        /// Backend call that failed.
        stage: UpstreamStage,
        /// Underlying session client failure.
        #[source]
        source: SessionError,
    },
}

// ---------------------------------------------------------------------------
// Invocation-fatal errors
// ---------------------------------------------------------------------------

/// Errors that abort a whole batch invocation before any event is processed.
#[derive(Debug, Error)]
pub enum ReconcilerError {
    /// A required configuration parameter is missing or unreadable.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
        /// Underlying parameter store failure, if any.
        #[source]
        source: Option<ParameterError>,
    },

    /// The backend session client could not be constructed or authenticated.
    #[error("backend authentication failed: {source}")]
    Authentication {
        /// Underlying session client failure.
        #[source]
        source: SessionError,
    },
}
