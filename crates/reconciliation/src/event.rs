//! Placement lifecycle events and the normalizer that extracts them from raw
//! transport messages.
//!
//! A transport message body is an EventBridge envelope whose `detail` is a
//! GameLift queue placement notification:
//!
//! ```json
//! {
//!   "id": "…",
//!   "time": "2024-03-08T18:17:56Z",
//!   "region": "us-west-2",
//!   "resources": ["arn:aws:gamelift:us-west-2:123456789012:gamesessionqueue/main"],
//!   "detail": {
//!     "type": "PlacementFulfilled",
//!     "placementId": "…",
//!     "port": "7777",
//!     …
//!   }
//! }
//! ```
//!
//! Normalization is purely structural. Optional detail fields that are absent
//! or `null` read as empty, and so does `type`. Unknown event types pass
//! through and are handled by [`crate::derivation`].

use serde::{Deserialize, Deserializer, Serialize};

use crate::{MalformedInput, PlacementId, Timestamp};

// ---------------------------------------------------------------------------
// Inbound message
// ---------------------------------------------------------------------------

/// One opaque message as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Transport-assigned identifier, used only for log correlation.
    pub message_id: Option<String>,
    /// Raw message body.
    pub body: Vec<u8>,
}

impl InboundMessage {
    /// Creates a message from a transport id and body.
    pub fn new(message_id: Option<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            message_id,
            body: body.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Event type
// ---------------------------------------------------------------------------

/// The placement lifecycle transition reported by the event.
///
/// Unrecognised values are preserved in [`PlacementEventType::Other`] rather
/// than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PlacementEventType {
    /// `PlacementFulfilled`: a game session was created.
    Fulfilled,
    /// `PlacementCancelled`: the request was cancelled before completion.
    Cancelled,
    /// `PlacementTimedOut`: the queue timeout elapsed without a placement.
    TimedOut,
    /// `PlacementFailed`: the placement service gave up.
    Failed,
    /// Any other type string, verbatim.
    Other(String),
}

impl PlacementEventType {
    /// Returns the wire string for this event type.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Fulfilled => "PlacementFulfilled",
            Self::Cancelled => "PlacementCancelled",
            Self::TimedOut => "PlacementTimedOut",
            Self::Failed => "PlacementFailed",
            Self::Other(raw) => raw,
        }
    }

    /// Returns `true` for the terminal failure transitions.
    pub fn is_terminal_failure(&self) -> bool {
        matches!(self, Self::Cancelled | Self::TimedOut | Self::Failed)
    }
}

impl Default for PlacementEventType {
    /// An absent type reads as the empty type string.
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl From<String> for PlacementEventType {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "PlacementFulfilled" => Self::Fulfilled,
            "PlacementCancelled" => Self::Cancelled,
            "PlacementTimedOut" => Self::TimedOut,
            "PlacementFailed" => Self::Failed,
            _ => Self::Other(raw),
        }
    }
}

impl From<PlacementEventType> for String {
    fn from(kind: PlacementEventType) -> Self {
        match kind {
            PlacementEventType::Other(raw) => raw,
            known => known.as_str().to_owned(),
        }
    }
}

impl std::fmt::Display for PlacementEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Placement event
// ---------------------------------------------------------------------------

/// A parsed placement lifecycle notification.
///
/// Fields after `end_time` are only populated for
/// [`PlacementEventType::Fulfilled`]; they default to empty otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementEvent {
    /// Lifecycle transition.
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub kind: PlacementEventType,
    /// Placement (and backend session) identifier.
    pub placement_id: PlacementId,
    /// When the placement request was queued.
    #[serde(default, deserialize_with = "null_as_default")]
    pub start_time: String,
    /// When the placement request reached this state.
    #[serde(default, deserialize_with = "null_as_default")]
    pub end_time: String,
    /// ARN of the created game session.
    #[serde(default, deserialize_with = "null_as_default")]
    pub game_session_arn: String,
    /// Region in which the game session was created.
    #[serde(default, deserialize_with = "null_as_default")]
    pub game_session_region: String,
    /// DNS name of the hosting instance.
    #[serde(default, deserialize_with = "null_as_default")]
    pub dns_name: String,
    /// IP address of the hosting instance.
    #[serde(default, deserialize_with = "null_as_default")]
    pub ip_address: String,
    /// Game port as a decimal string.
    #[serde(default, deserialize_with = "null_as_default")]
    pub port: String,
    /// Player sessions created with the placement, kept opaque.
    #[serde(default, deserialize_with = "null_as_default")]
    pub placed_player_sessions: Vec<serde_json::Value>,
}

impl PlacementEvent {
    /// How long the placement took, when both timestamps are present and valid.
    pub fn duration(&self) -> Option<chrono::Duration> {
        let start = Timestamp::parse_rfc3339(&self.start_time)?;
        let end = Timestamp::parse_rfc3339(&self.end_time)?;
        Some(end.as_datetime() - start.as_datetime())
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Routing metadata surrounding a placement event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeContext {
    /// Envelope identifier, if the transport supplied one.
    pub id: Option<String>,
    /// Envelope timestamp, if present and well-formed.
    pub time: Option<Timestamp>,
    /// Region in which the event originated. May be empty.
    pub region: String,
    /// Originating resource identifiers (the placement queue ARN). Never empty.
    pub resources: Vec<String>,
}

/// Raw envelope shape; every field is optional at this level so that missing
/// pieces produce precise discard reasons.
#[derive(Debug, Deserialize)]
struct RawEnvelope {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    time: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    region: String,
    #[serde(default, deserialize_with = "null_as_default")]
    resources: Vec<String>,
    #[serde(default)]
    detail: serde_json::Value,
}

/// Raw detail shape; `placementId` is validated after decoding.
///
/// A `null` reads the same as an absent key, so failure notifications that
/// spell out their unused endpoint fields still decode.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDetail {
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    kind: PlacementEventType,
    #[serde(default, deserialize_with = "null_as_default")]
    placement_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    start_time: String,
    #[serde(default, deserialize_with = "null_as_default")]
    end_time: String,
    #[serde(default, deserialize_with = "null_as_default")]
    game_session_arn: String,
    #[serde(default, deserialize_with = "null_as_default")]
    game_session_region: String,
    #[serde(default, deserialize_with = "null_as_default")]
    dns_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    ip_address: String,
    #[serde(default, deserialize_with = "null_as_default")]
    port: String,
    #[serde(default, deserialize_with = "null_as_default")]
    placed_player_sessions: Vec<serde_json::Value>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Normalizer
// ---------------------------------------------------------------------------

/// Parses a raw message body into its envelope context and placement event.
///
/// Returns [`MalformedInput`] for any structural problem; the caller discards
/// the message and moves on.
pub fn normalize(body: &[u8]) -> Result<(EnvelopeContext, PlacementEvent), MalformedInput> {
    let envelope: RawEnvelope =
        serde_json::from_slice(body).map_err(|err| MalformedInput::InvalidEnvelope {
            reason: err.to_string(),
        })?;

    if envelope.resources.is_empty() {
        return Err(MalformedInput::MissingResources);
    }

    let detail: RawDetail =
        serde_json::from_value(envelope.detail).map_err(|err| MalformedInput::InvalidDetail {
            reason: err.to_string(),
        })?;

    let placement_id =
        PlacementId::new(detail.placement_id).ok_or(MalformedInput::MissingPlacementId)?;

    let context = EnvelopeContext {
        id: envelope.id,
        time: envelope.time.as_deref().and_then(Timestamp::parse_rfc3339),
        region: envelope.region,
        resources: envelope.resources,
    };

    let event = PlacementEvent {
        kind: detail.kind,
        placement_id,
        start_time: detail.start_time,
        end_time: detail.end_time,
        game_session_arn: detail.game_session_arn,
        game_session_region: detail.game_session_region,
        dns_name: detail.dns_name,
        ip_address: detail.ip_address,
        port: detail.port,
        placed_player_sessions: detail.placed_player_sessions,
    };

    Ok((context, event))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn body(value: serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&value).expect("serialise test envelope")
    }

    fn fulfilled_envelope() -> serde_json::Value {
        json!({
            "version": "0",
            "id": "evt-1",
            "detail-type": "GameLift Queue Placement Event",
            "source": "aws.gamelift",
            "time": "2024-03-08T18:17:57Z",
            "region": "us-west-2",
            "resources": ["arn:aws:gamelift:us-west-2:123456789012:gamesessionqueue/main"],
            "detail": {
                "type": "PlacementFulfilled",
                "placementId": "placement-1",
                "startTime": "2024-03-08T18:17:56.145Z",
                "endTime": "2024-03-08T18:17:57.145Z",
                "gameSessionArn": "arn:aws:gamelift:eu-west-1::gamesession/fleet-1/gs-1",
                "gameSessionRegion": "eu-west-1",
                "dnsName": "ec2-1-2-3-4.compute.amazonaws.com",
                "ipAddress": "1.2.3.4",
                "port": "7778",
                "placedPlayerSessions": [{"playerId": "p1", "playerSessionId": "psess-1"}]
            }
        })
    }

    #[test]
    fn normalizes_a_fulfilled_envelope() {
        let (context, event) = normalize(&body(fulfilled_envelope())).expect("well-formed");

        assert_eq!(context.region, "us-west-2");
        assert_eq!(context.id.as_deref(), Some("evt-1"));
        assert!(context.time.is_some());
        assert_eq!(context.resources.len(), 1);

        assert_eq!(event.kind, PlacementEventType::Fulfilled);
        assert_eq!(event.placement_id.as_str(), "placement-1");
        assert_eq!(event.ip_address, "1.2.3.4");
        assert_eq!(event.port, "7778");
        assert_eq!(event.placed_player_sessions.len(), 1);
        assert_eq!(event.duration(), Some(chrono::Duration::seconds(1)));
    }

    #[test]
    fn failure_events_without_fulfilled_fields_are_accepted() {
        let envelope = json!({
            "region": "us-west-2",
            "resources": ["queue-arn"],
            "detail": {
                "type": "PlacementTimedOut",
                "placementId": "placement-2",
                "startTime": "2024-03-08T18:17:56Z",
                "endTime": "2024-03-08T18:27:56Z"
            }
        });
        let (_, event) = normalize(&body(envelope)).expect("well-formed");
        assert_eq!(event.kind, PlacementEventType::TimedOut);
        assert!(event.ip_address.is_empty());
        assert!(event.port.is_empty());
        assert!(event.game_session_arn.is_empty());
    }

    #[test]
    fn null_fulfilled_only_fields_read_as_empty() {
        let envelope = json!({
            "region": "us-west-2",
            "resources": ["queue-arn"],
            "detail": {
                "type": "PlacementCancelled",
                "placementId": "placement-3",
                "startTime": null,
                "endTime": null,
                "gameSessionArn": null,
                "gameSessionRegion": null,
                "dnsName": null,
                "ipAddress": null,
                "port": null,
                "placedPlayerSessions": null
            }
        });
        let (_, event) = normalize(&body(envelope)).expect("well-formed");
        assert_eq!(event.kind, PlacementEventType::Cancelled);
        assert_eq!(event.placement_id.as_str(), "placement-3");
        assert!(event.ip_address.is_empty());
        assert!(event.port.is_empty());
        assert!(event.game_session_arn.is_empty());
        assert!(event.placed_player_sessions.is_empty());
    }

    #[test]
    fn null_region_reads_as_empty() {
        let mut envelope = fulfilled_envelope();
        envelope["region"] = json!(null);
        let (context, _) = normalize(&body(envelope)).expect("well-formed");
        assert!(context.region.is_empty());
    }

    #[test]
    fn missing_event_type_reads_as_empty_type() {
        for detail in [
            json!({"placementId": "placement-4"}),
            json!({"type": null, "placementId": "placement-4"}),
        ] {
            let mut envelope = fulfilled_envelope();
            envelope["detail"] = detail;
            let (_, event) = normalize(&body(envelope)).expect("well-formed");
            assert_eq!(event.kind, PlacementEventType::Other(String::new()));
            assert!(!event.kind.is_terminal_failure());
        }
    }

    #[test]
    fn unknown_event_types_pass_through() {
        let mut envelope = fulfilled_envelope();
        envelope["detail"]["type"] = json!("PlacementSomethingNew");
        let (_, event) = normalize(&body(envelope)).expect("well-formed");
        assert_eq!(
            event.kind,
            PlacementEventType::Other("PlacementSomethingNew".into())
        );
        assert_eq!(event.kind.as_str(), "PlacementSomethingNew");
    }

    #[test]
    fn rejects_non_json_bodies() {
        let err = normalize(b"not json").expect_err("must be discarded");
        assert!(matches!(err, MalformedInput::InvalidEnvelope { .. }));
    }

    #[test]
    fn rejects_envelopes_without_resources() {
        let mut envelope = fulfilled_envelope();
        envelope["resources"] = json!([]);
        assert_eq!(
            normalize(&body(envelope)).expect_err("must be discarded"),
            MalformedInput::MissingResources
        );

        let mut envelope = fulfilled_envelope();
        envelope
            .as_object_mut()
            .expect("object")
            .remove("resources");
        assert_eq!(
            normalize(&body(envelope)).expect_err("must be discarded"),
            MalformedInput::MissingResources
        );
    }

    #[test]
    fn rejects_malformed_detail() {
        let details = [
            json!("a string"),
            json!(null),
            json!({"type": "PlacementFulfilled", "placementId": 7}),
            json!({"type": 3, "placementId": "x"}),
        ];
        for detail in details {
            let mut envelope = fulfilled_envelope();
            envelope["detail"] = detail.clone();
            let err = normalize(&body(envelope)).expect_err("must be discarded");
            assert!(
                matches!(err, MalformedInput::InvalidDetail { .. }),
                "detail {detail} gave {err:?}"
            );
        }
    }

    #[test]
    fn rejects_empty_placement_id() {
        for placement_id in [json!(""), json!(null)] {
            let mut envelope = fulfilled_envelope();
            envelope["detail"]["placementId"] = placement_id;
            assert_eq!(
                normalize(&body(envelope)).expect_err("must be discarded"),
                MalformedInput::MissingPlacementId
            );
        }

        let mut envelope = fulfilled_envelope();
        envelope["detail"]
            .as_object_mut()
            .expect("object")
            .remove("placementId");
        assert_eq!(
            normalize(&body(envelope)).expect_err("must be discarded"),
            MalformedInput::MissingPlacementId
        );
    }

    #[test]
    fn event_type_round_trips_through_its_wire_string() {
        let kind: PlacementEventType = "PlacementCancelled".to_owned().into();
        assert!(kind.is_terminal_failure());
        assert_eq!(String::from(kind), "PlacementCancelled");
        assert!(!PlacementEventType::Fulfilled.is_terminal_failure());
    }
}
