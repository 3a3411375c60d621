//! SQS invocation handler.

use anyhow::Context as _;
use aws_lambda_events::sqs::{SqsBatchResponse, SqsEvent};
use listener::AckPolicy;
use reconciliation::{run_invocation, InvocationId, ParameterStore, SessionConnector};
use tracing::Instrument;

use crate::observability::invocation_span;

/// Long-lived state shared by every invocation of a warm container.
pub struct Handler<P, C> {
    parameters: P,
    connector: C,
    ack: AckPolicy,
}

impl<P, C> Handler<P, C>
where
    P: ParameterStore,
    C: SessionConnector,
{
    pub fn new(parameters: P, connector: C, ack: AckPolicy) -> Self {
        Self {
            parameters,
            connector,
            ack,
        }
    }

    /// Reconciles one SQS batch.
    ///
    /// Configuration and authentication failures fail the invocation so the
    /// batch is redelivered. Per-event failures are logged and acknowledged
    /// according to the [`AckPolicy`].
    pub async fn handle(&self, event: SqsEvent, request_id: &str) -> anyhow::Result<SqsBatchResponse> {
        let invocation_id = InvocationId::new_random();
        let span = invocation_span(invocation_id, request_id);

        async {
            let messages = listener::inbound_messages(event);
            let report = run_invocation(&self.parameters, &self.connector, messages)
                .await
                .with_context(|| format!("invocation {invocation_id} aborted"))?;
            Ok::<_, anyhow::Error>(listener::batch_response(&report, self.ack))
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use reconciliation::{
        BackendConfig, DsStatus, DsStatusUpdate, Namespace, ParameterError, ParameterName,
        PlacementId, ReconcilerError, SessionError, SessionRecord, SessionStore,
    };
    use serde_json::json;

    use super::*;

    struct StaticParameters(HashMap<&'static str, &'static str>);

    impl StaticParameters {
        fn complete() -> Self {
            Self(HashMap::from([
                (ParameterName::BaseUrl.as_str(), "https://demo.accelbyte.io"),
                (ParameterName::ClientId.as_str(), "reconciler"),
                (ParameterName::ClientSecret.as_str(), "s3cret"),
                (ParameterName::Namespace.as_str(), "demo-game"),
            ]))
        }
    }

    #[async_trait]
    impl ParameterStore for StaticParameters {
        async fn get(&self, name: &str) -> Result<String, ParameterError> {
            self.0
                .get(name)
                .map(|v| (*v).to_owned())
                .ok_or_else(|| ParameterError::NotFound { name: name.to_owned() })
        }
    }

    #[derive(Default)]
    struct RecordingStore {
        updates: Mutex<Vec<(String, DsStatus)>>,
    }

    #[async_trait]
    impl SessionStore for RecordingStore {
        async fn get_session(
            &self,
            _namespace: &Namespace,
            _placement_id: &PlacementId,
        ) -> Result<SessionRecord, SessionError> {
            Ok(SessionRecord::default())
        }

        async fn update_ds_information(
            &self,
            _namespace: &Namespace,
            placement_id: &PlacementId,
            update: &DsStatusUpdate,
        ) -> Result<(), SessionError> {
            self.updates
                .lock()
                .expect("update log")
                .push((placement_id.to_string(), update.status));
            Ok(())
        }
    }

    struct Connector {
        reject: bool,
    }

    #[async_trait]
    impl SessionConnector for Connector {
        type Store = RecordingStore;

        async fn connect(&self, _config: &BackendConfig) -> Result<RecordingStore, SessionError> {
            if self.reject {
                return Err(SessionError::Authentication {
                    message: "401 Unauthorized".into(),
                });
            }
            Ok(RecordingStore::default())
        }
    }

    fn sqs_event(bodies: &[serde_json::Value]) -> SqsEvent {
        let records: Vec<_> = bodies
            .iter()
            .enumerate()
            .map(|(i, body)| {
                json!({
                    "messageId": format!("m-{i}"),
                    "body": body.to_string(),
                    "eventSource": "aws:sqs",
                    "awsRegion": "us-east-1"
                })
            })
            .collect();
        serde_json::from_value(json!({ "Records": records })).expect("valid SQS event")
    }

    fn placement_failed(placement_id: &str) -> serde_json::Value {
        json!({
            "region": "us-east-1",
            "resources": ["arn:aws:gamelift:us-east-1:1:gamesessionqueue/q"],
            "detail": { "type": "PlacementTimedOut", "placementId": placement_id }
        })
    }

    #[tokio::test]
    async fn batch_with_a_malformed_message_is_still_acknowledged() {
        let handler = Handler::new(
            StaticParameters::complete(),
            Connector { reject: false },
            AckPolicy::default(),
        );
        let event = sqs_event(&[placement_failed("p-1"), json!({ "region": "us-east-1" })]);

        let response = handler.handle(event, "req-1").await.expect("invocation succeeds");

        assert!(response.batch_item_failures.is_empty());
    }

    #[tokio::test]
    async fn report_failures_policy_surfaces_skipped_messages() {
        let handler = Handler::new(
            StaticParameters::complete(),
            Connector { reject: false },
            AckPolicy::ReportFailures,
        );
        let event = sqs_event(&[placement_failed("p-1"), json!("garbage")]);

        let response = handler.handle(event, "req-2").await.expect("invocation succeeds");

        assert_eq!(response.batch_item_failures.len(), 1);
        assert_eq!(response.batch_item_failures[0].item_identifier, "m-1");
    }

    #[tokio::test]
    async fn missing_configuration_fails_the_invocation() {
        let handler = Handler::new(
            StaticParameters(HashMap::new()),
            Connector { reject: false },
            AckPolicy::default(),
        );

        let err = handler
            .handle(sqs_event(&[placement_failed("p-1")]), "req-3")
            .await
            .expect_err("configuration missing");

        assert!(matches!(
            err.downcast_ref::<ReconcilerError>(),
            Some(ReconcilerError::Configuration { .. })
        ));
    }

    #[tokio::test]
    async fn rejected_credentials_fail_the_invocation() {
        let handler = Handler::new(
            StaticParameters::complete(),
            Connector { reject: true },
            AckPolicy::default(),
        );

        let err = handler
            .handle(sqs_event(&[placement_failed("p-1")]), "req-4")
            .await
            .expect_err("login rejected");

        assert!(matches!(
            err.downcast_ref::<ReconcilerError>(),
            Some(ReconcilerError::Authentication { .. })
        ));
    }
}
