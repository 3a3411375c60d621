//! Shared value types for the reconciliation domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! values with invariants (ports are in the `u16` range, statuses come from a
//! closed set) and participate in the status derivation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Placeholders required by the backend on every update
// ---------------------------------------------------------------------------

/// IP address reported when no real endpoint exists (failed placements).
pub const LOOPBACK_IP: &str = "127.0.0.1";

/// Port reported when no real port exists or the reported one is unusable.
pub const DEFAULT_SERVER_PORT: ServerPort = ServerPort(7777);

// ---------------------------------------------------------------------------
// Dedicated server status
// ---------------------------------------------------------------------------

/// Status written into the backend session's dedicated server information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DsStatus {
    /// The placement was fulfilled; clients may connect to the endpoint.
    Available,
    /// The placement ended without a server; clients should stop waiting.
    FailedToRequest,
}

impl DsStatus {
    /// Returns the wire representation used by the backend platform.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Available => "AVAILABLE",
            Self::FailedToRequest => "FAILED_TO_REQUEST",
        }
    }
}

impl std::fmt::Display for DsStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------

/// Cloud provider that hosted (or failed to host) the dedicated server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DsSource {
    /// Amazon Web Services (GameLift).
    #[serde(rename = "AWS")]
    Aws,
}

impl DsSource {
    /// Returns the wire representation used by the backend platform.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Aws => "AWS",
        }
    }
}

impl std::fmt::Display for DsSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// A dedicated server port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerPort(u16);

impl ServerPort {
    /// Creates a [`ServerPort`] from a raw port number.
    pub fn new(port: u16) -> Self {
        Self(port)
    }

    /// Returns the underlying port number.
    pub fn as_u16(self) -> u16 {
        self.0
    }

    /// Parses a decimal port string as reported by the placement service.
    ///
    /// Only ASCII digits are accepted, so surrounding whitespace and signs
    /// (including the `+` that `u16::from_str` tolerates) are rejected, as are
    /// values outside `0..=65535`. Callers decide which default to substitute.
    pub fn parse(raw: &str) -> Result<Self, InvalidServerPort> {
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidServerPort::NotDecimal);
        }
        Ok(Self(raw.parse::<u16>()?))
    }
}

/// Why a raw port string could not be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidServerPort {
    /// Empty, or contains something other than ASCII digits.
    #[error("not a decimal number")]
    NotDecimal,

    /// Digits only, but outside the port range.
    #[error("out of range: {0}")]
    OutOfRange(#[from] std::num::ParseIntError),
}

impl std::fmt::Display for ServerPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Parses an RFC 3339 timestamp, returning `None` when it is malformed.
    pub fn parse_rfc3339(raw: &str) -> Option<Self> {
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| Self(dt.with_timezone(&Utc)))
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_parses_decimal_strings() {
        assert_eq!(ServerPort::parse("7777").map(ServerPort::as_u16), Ok(7777));
        assert_eq!(ServerPort::parse("0").map(ServerPort::as_u16), Ok(0));
    }

    #[test]
    fn port_rejects_junk_and_out_of_range_values() {
        for raw in ["", "abc", "-1", "+7777", "+", " 7777", "77.7"] {
            assert_eq!(
                ServerPort::parse(raw),
                Err(InvalidServerPort::NotDecimal),
                "{raw:?} should not parse"
            );
        }
        assert!(matches!(
            ServerPort::parse("70000"),
            Err(InvalidServerPort::OutOfRange(_))
        ));
    }

    #[test]
    fn statuses_use_backend_wire_strings() {
        assert_eq!(DsStatus::Available.to_string(), "AVAILABLE");
        assert_eq!(
            serde_json::to_string(&DsStatus::FailedToRequest).expect("serialise"),
            "\"FAILED_TO_REQUEST\""
        );
        assert_eq!(serde_json::to_string(&DsSource::Aws).expect("serialise"), "\"AWS\"");
    }

    #[test]
    fn timestamps_parse_placement_service_format() {
        let ts = Timestamp::parse_rfc3339("2024-03-08T18:17:56.145Z").expect("valid timestamp");
        assert_eq!(ts.as_datetime().timestamp(), 1_709_921_876);
        assert!(Timestamp::parse_rfc3339("yesterday").is_none());
    }
}
