//! Status derivation: the pure mapping from a placement event to the
//! dedicated server update committed on the backend session.
//!
//! Two mutually exclusive paths exist:
//!
//! | Event type | Status | IP | Port | Deployment | Region |
//! |------------|--------|----|------|------------|--------|
//! | Cancelled, TimedOut, Failed | `FAILED_TO_REQUEST` | loopback | default | event type | envelope region |
//! | Fulfilled, anything else | `AVAILABLE` | event IP | parsed port | session ARN | session region |
//!
//! The backend rejects updates missing connection data, so the failure path
//! fills placeholders rather than leaving fields empty.

use serde::{Deserialize, Serialize};

use crate::{
    DsSource, DsStatus, EnvelopeContext, PlacementEvent, PlacementEventType, PlacementId,
    ServerPort, SessionRecord, DEFAULT_SERVER_PORT, LOOPBACK_IP,
};

/// The dedicated server information written onto a backend session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DsStatusUpdate {
    /// Whether clients can connect.
    pub status: DsStatus,
    /// Server IP address, or [`LOOPBACK_IP`] when none exists.
    pub ip: String,
    /// Server port, or [`DEFAULT_SERVER_PORT`] when none is usable.
    pub port: ServerPort,
    /// Game session ARN on success; event type on failure.
    pub deployment: String,
    /// Region hosting the server on success; originating region on failure.
    pub region: String,
    /// Region the lifecycle event originated from.
    pub request_region: String,
    /// Hosting provider.
    pub source: DsSource,
    /// Server identifier; always the placement id.
    pub server_id: PlacementId,
    /// Copied from the session record.
    pub client_version: Option<String>,
    /// Copied from the session record.
    pub game_mode: Option<String>,
}

/// A non-fatal problem encountered while deriving an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseDegradation {
    /// The event's port string could not be parsed; the default was used.
    InvalidPort {
        /// The raw value from the event.
        raw: String,
        /// Parser diagnostic.
        reason: String,
    },
}

impl std::fmt::Display for ParseDegradation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPort { raw, reason } => write!(
                f,
                "port {raw:?} is not usable ({reason}); defaulting to {DEFAULT_SERVER_PORT}"
            ),
        }
    }
}

/// The derived update together with any degradations applied on the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Derivation {
    /// Update to commit.
    pub update: DsStatusUpdate,
    /// Substitutions made because event fields were unusable.
    pub degradations: Vec<ParseDegradation>,
}

/// Connection data selected by the outcome of the placement.
struct Endpoint {
    status: DsStatus,
    ip: String,
    port: ServerPort,
    deployment: String,
    region: String,
}

/// Computes the dedicated server update for `event`.
///
/// Pure: the result depends only on the arguments, so re-deriving the same
/// event against the same session record yields the same update.
pub fn derive(
    event: &PlacementEvent,
    envelope: &EnvelopeContext,
    session: &SessionRecord,
) -> Derivation {
    let mut degradations = Vec::new();

    let endpoint = match &event.kind {
        PlacementEventType::Cancelled | PlacementEventType::TimedOut | PlacementEventType::Failed => {
            failed_endpoint(event, envelope)
        }
        PlacementEventType::Fulfilled => fulfilled_endpoint(event, &mut degradations),
        // Unrecognised types are treated as fulfilled.
        PlacementEventType::Other(_) => fulfilled_endpoint(event, &mut degradations),
    };

    Derivation {
        update: DsStatusUpdate {
            status: endpoint.status,
            ip: endpoint.ip,
            port: endpoint.port,
            deployment: endpoint.deployment,
            region: endpoint.region,
            request_region: envelope.region.clone(),
            source: DsSource::Aws,
            server_id: event.placement_id.clone(),
            client_version: session.client_version.clone(),
            game_mode: session.game_mode.clone(),
        },
        degradations,
    }
}

fn failed_endpoint(event: &PlacementEvent, envelope: &EnvelopeContext) -> Endpoint {
    Endpoint {
        status: DsStatus::FailedToRequest,
        ip: LOOPBACK_IP.to_owned(),
        port: DEFAULT_SERVER_PORT,
        deployment: event.kind.as_str().to_owned(),
        region: envelope.region.clone(),
    }
}

fn fulfilled_endpoint(event: &PlacementEvent, degradations: &mut Vec<ParseDegradation>) -> Endpoint {
    let port = match ServerPort::parse(&event.port) {
        Ok(port) => port,
        Err(err) => {
            degradations.push(ParseDegradation::InvalidPort {
                raw: event.port.clone(),
                reason: err.to_string(),
            });
            DEFAULT_SERVER_PORT
        }
    };

    Endpoint {
        status: DsStatus::Available,
        ip: event.ip_address.clone(),
        port,
        deployment: event.game_session_arn.clone(),
        region: event.game_session_region.clone(),
    }
}
