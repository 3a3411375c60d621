//! AccelByte session adapter.
//!
//! Implements [`reconciliation::SessionConnector`] and
//! [`reconciliation::SessionStore`] over the AccelByte REST API:
//!
//! | Operation | Endpoint |
//! |-----------|----------|
//! | Login (client credentials) | `POST /iam/v3/oauth/token` |
//! | Get game session | `GET /session/v1/public/namespaces/{ns}/gamesessions/{id}` |
//! | Update DS information | `PUT /session/v1/admin/namespaces/{ns}/gamesessions/{id}/dsinformation` |
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** HTTP transport, authentication, request formatting,
//! response parsing, and retry/back-off live here. The [`reconciliation`]
//! crate sees only its own port traits.
//!
//! ## Retries
//!
//! [`RetrySettings`] are injected through [`ClientOptions`]. The default is a
//! single attempt with zero back-off; failed calls surface immediately and
//! redelivery is left to the transport.

mod client;
mod retry;
mod wire;

pub use client::{AccelByteConnector, AccelByteSessionClient, ClientOptions, InvalidOptions};
pub use retry::{Backoff, RetrySettings};
