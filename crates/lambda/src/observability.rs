//! Logging setup for the Lambda binary.
//!
//! Every crate in the workspace emits `tracing` spans and events; this module
//! installs the single subscriber that writes them to stdout as JSON lines,
//! where the Lambda runtime forwards them to CloudWatch.

use std::sync::Once;

use reconciliation::InvocationId;
use tracing::Span;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Installs the JSON subscriber.
///
/// `RUST_LOG` controls the filter (e.g. `info`, `accelbyte=debug`); the
/// default level is `info`. Calls after the first are no-ops.
pub fn init_logging() {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .without_time(),
            )
            .init();
    });
}

/// Span covering one Lambda invocation.
#[must_use]
pub fn invocation_span(invocation_id: InvocationId, request_id: &str) -> Span {
    tracing::info_span!(
        "invocation",
        invocation_id = %invocation_id,
        request_id = request_id,
    )
}
