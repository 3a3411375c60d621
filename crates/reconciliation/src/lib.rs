//! Placement reconciliation domain.
//!
//! Translates placement lifecycle notifications from the matchmaking service
//! into dedicated server updates on backend game sessions. Infrastructure
//! crates implement the port traits defined here; they never add domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; `accelbyte`, `ssm`, and `listener` define
//! *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`PlacementId`, `Namespace`, etc.) |
//! | [`types`] | Value types (`DsStatus`, `ServerPort`, `Timestamp`) and placeholders |
//! | [`errors`] | Per-event, port, and invocation-fatal errors; retry classification |
//! | [`event`] | Placement events, envelope context, and the normalizer |
//! | [`derivation`] | Pure dual-path status derivation |
//! | [`orchestrator`] | Per-event reconciliation, batch report, invocation flow |
//! | [`ports`] | `SessionStore`, `SessionConnector`, `ParameterStore` |
//! | [`config`] | Backend configuration and its parameter names |

pub mod config;
pub mod derivation;
pub mod errors;
pub mod event;
pub mod identifiers;
pub mod orchestrator;
pub mod ports;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use config::{BackendConfig, ParameterName};
pub use derivation::{derive, Derivation, DsStatusUpdate, ParseDegradation};
pub use errors::{
    EventError, MalformedInput, ParameterError, ReconcilerError, RetryPolicy, SessionError,
    UpstreamStage,
};
pub use event::{normalize, EnvelopeContext, InboundMessage, PlacementEvent, PlacementEventType};
pub use identifiers::{InvocationId, Namespace, PlacementId};
pub use orchestrator::{
    run_invocation, BatchReport, CommittedUpdate, EventOutcome, EventStage, Reconciler,
};
pub use ports::{ParameterStore, SessionConnector, SessionRecord, SessionStore};
pub use types::{
    DsSource, DsStatus, InvalidServerPort, ServerPort, Timestamp, DEFAULT_SERVER_PORT, LOOPBACK_IP,
};
