//! Batch reconciliation.
//!
//! Each message moves through `Parsed → SessionFetched → UpdateComputed →
//! Committed`, or stops early as skipped. Events are independent: a failure
//! is recorded in the [`BatchReport`] and the loop moves on. Only the
//! invocation-level steps in [`run_invocation`] can fail the whole batch.

use tracing::{debug, info, info_span, warn, Instrument};

use crate::derivation::{derive, Derivation};
use crate::event::normalize;
use crate::{
    BackendConfig, DsStatus, DsStatusUpdate, EventError, InboundMessage, Namespace,
    ParameterStore, PlacementId, ReconcilerError, SessionConnector, SessionStore, UpstreamStage,
};

/// Progress of a single event through reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventStage {
    /// The message was normalized into a placement event.
    Parsed,
    /// The prior session record was fetched.
    SessionFetched,
    /// The dedicated server update was derived.
    UpdateComputed,
    /// The update was accepted by the backend.
    Committed,
    /// Processing stopped early; see the accompanying error.
    Skipped,
}

impl std::fmt::Display for EventStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Parsed => "parsed",
            Self::SessionFetched => "session_fetched",
            Self::UpdateComputed => "update_computed",
            Self::Committed => "committed",
            Self::Skipped => "skipped",
        })
    }
}

/// An update that the backend accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedUpdate {
    /// Placement the update belongs to.
    pub placement_id: PlacementId,
    /// The update as sent.
    pub update: DsStatusUpdate,
}

/// Result of reconciling one message.
#[derive(Debug, Clone, PartialEq)]
pub struct EventOutcome {
    /// Transport id of the message, if any.
    pub message_id: Option<String>,
    /// Committed update, or why the event was dropped.
    pub result: Result<CommittedUpdate, EventError>,
}

impl EventOutcome {
    /// Final stage reached by the event.
    pub fn stage(&self) -> EventStage {
        match self.result {
            Ok(_) => EventStage::Committed,
            Err(_) => EventStage::Skipped,
        }
    }
}

/// Per-message outcomes of one batch, in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    /// One entry per inbound message.
    pub outcomes: Vec<EventOutcome>,
}

impl BatchReport {
    /// Number of events whose update was committed.
    pub fn committed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    /// Number of events discarded as malformed.
    pub fn malformed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.result, Err(EventError::MalformedInput(_))))
            .count()
    }

    /// Number of events dropped because a backend call failed.
    pub fn upstream_failures(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.result, Err(EventError::UpstreamUnavailable { .. })))
            .count()
    }

    /// Returns `true` when every event was committed.
    pub fn is_complete(&self) -> bool {
        self.committed() == self.outcomes.len()
    }

    /// Transport ids of messages that were not committed.
    pub fn failed_message_ids(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|o| o.result.is_err())
            .filter_map(|o| o.message_id.as_deref())
    }
}

/// Reconciles placement events against a backend session store.
pub struct Reconciler<S> {
    store: S,
    namespace: Namespace,
}

impl<S: SessionStore> Reconciler<S> {
    /// Creates a reconciler writing into `namespace` through `store`.
    pub fn new(store: S, namespace: Namespace) -> Self {
        Self { store, namespace }
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &S {
        &self.store
    }

    /// Reconciles every message in order. Never fails as a whole.
    pub async fn reconcile_batch<I>(&self, messages: I) -> BatchReport
    where
        I: IntoIterator<Item = InboundMessage>,
    {
        let mut report = BatchReport::default();
        for message in messages {
            let span = info_span!(
                "reconcile_event",
                message_id = message.message_id.as_deref().unwrap_or(""),
            );
            let result = self.reconcile_one(&message.body).instrument(span).await;
            report.outcomes.push(EventOutcome {
                message_id: message.message_id,
                result,
            });
        }

        info!(
            total = report.outcomes.len(),
            committed = report.committed(),
            malformed = report.malformed(),
            upstream_failures = report.upstream_failures(),
            "batch reconciled"
        );
        report
    }

    /// Reconciles a single message body.
    pub async fn reconcile_one(&self, body: &[u8]) -> Result<CommittedUpdate, EventError> {
        let (envelope, event) = normalize(body).map_err(|err| {
            warn!(error = %err, stage = %EventStage::Skipped, "discarding malformed message");
            EventError::from(err)
        })?;
        debug!(
            placement_id = %event.placement_id,
            event_type = %event.kind,
            placement_duration_ms = event.duration().map(|d| d.num_milliseconds()),
            stage = %EventStage::Parsed,
            "placement event parsed"
        );

        let session = self
            .store
            .get_session(&self.namespace, &event.placement_id)
            .await
            .map_err(|source| {
                warn!(
                    placement_id = %event.placement_id,
                    error = %source,
                    stage = %EventStage::Skipped,
                    "failed to fetch backend session"
                );
                EventError::UpstreamUnavailable {
                    placement_id: event.placement_id.clone(),
                    stage: UpstreamStage::FetchSession,
                    source,
                }
            })?;
        debug!(placement_id = %event.placement_id, stage = %EventStage::SessionFetched, "session fetched");

        let Derivation {
            update,
            degradations,
        } = derive(&event, &envelope, &session);
        for degradation in &degradations {
            warn!(placement_id = %event.placement_id, "{degradation}");
        }
        debug!(
            placement_id = %event.placement_id,
            status = %update.status,
            stage = %EventStage::UpdateComputed,
            "dedicated server update derived"
        );

        self.store
            .update_ds_information(&self.namespace, &event.placement_id, &update)
            .await
            .map_err(|source| {
                warn!(
                    placement_id = %event.placement_id,
                    error = %source,
                    "failed to update dedicated server information"
                );
                EventError::UpstreamUnavailable {
                    placement_id: event.placement_id.clone(),
                    stage: UpstreamStage::CommitUpdate,
                    source,
                }
            })?;

        match update.status {
            DsStatus::Available => info!(
                placement_id = %event.placement_id,
                status = %update.status,
                ip = %update.ip,
                port = %update.port,
                region = %update.region,
                "dedicated server information updated"
            ),
            DsStatus::FailedToRequest => info!(
                placement_id = %event.placement_id,
                status = %update.status,
                event_type = %event.kind,
                "dedicated server information updated"
            ),
        }

        Ok(CommittedUpdate {
            placement_id: event.placement_id,
            update,
        })
    }
}

/// Runs one batch invocation end to end.
///
/// Resolves configuration, authenticates once, and reconciles every message.
/// Configuration and authentication failures abort the invocation; per-event
/// failures are reported in the returned [`BatchReport`].
pub async fn run_invocation<C, I>(
    parameters: &dyn ParameterStore,
    connector: &C,
    messages: I,
) -> Result<BatchReport, ReconcilerError>
where
    C: SessionConnector,
    I: IntoIterator<Item = InboundMessage>,
{
    let config = BackendConfig::load(parameters).await?;
    debug!(?config, "backend configuration resolved");

    let store = connector
        .connect(&config)
        .await
        .map_err(|source| ReconcilerError::Authentication { source })?;

    let reconciler = Reconciler::new(store, config.namespace);
    Ok(reconciler.reconcile_batch(messages).await)
}
