//! SQS transport adapter.
//!
//! Converts the `SqsEvent` handed to the Lambda function into the
//! [`reconciliation::InboundMessage`]s the orchestrator consumes, and turns the
//! resulting [`reconciliation::BatchReport`] back into the `SqsBatchResponse`
//! returned to the event source mapping.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Queue payload shapes live here. The [`reconciliation`]
//! crate sees raw message bodies and optional message ids only.
//!
//! ## Acknowledgment
//!
//! Under the default [`AckPolicy::AcknowledgeAll`] every message in the batch
//! is acknowledged, including the ones that were skipped. [`AckPolicy::ReportFailures`]
//! lists uncommitted messages as batch item failures so SQS redelivers them;
//! it only has an effect when the event source mapping enables
//! `ReportBatchItemFailures`.

use aws_lambda_events::sqs::{BatchItemFailure, SqsBatchResponse, SqsEvent, SqsMessage};
use reconciliation::{BatchReport, InboundMessage};

/// How a finished batch is acknowledged to SQS.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AckPolicy {
    /// Acknowledge every message regardless of outcome.
    #[default]
    AcknowledgeAll,
    /// Report uncommitted messages back as batch item failures.
    ReportFailures,
}

/// Converts an SQS batch into inbound messages, preserving order.
///
/// A record without a body becomes an empty message; the normalizer rejects
/// it as malformed.
pub fn inbound_messages(event: SqsEvent) -> Vec<InboundMessage> {
    tracing::debug!(records = event.records.len(), "received SQS batch");
    event.records.into_iter().map(inbound_message).collect()
}

fn inbound_message(record: SqsMessage) -> InboundMessage {
    if record.body.is_none() {
        tracing::warn!(message_id = ?record.message_id, "SQS record has no body");
    }
    InboundMessage::new(
        record.message_id,
        record.body.map(String::into_bytes).unwrap_or_default(),
    )
}

/// Builds the batch response for `report` under `policy`.
pub fn batch_response(report: &BatchReport, policy: AckPolicy) -> SqsBatchResponse {
    let batch_item_failures = match policy {
        AckPolicy::AcknowledgeAll => Vec::new(),
        AckPolicy::ReportFailures => report
            .failed_message_ids()
            .map(|id| BatchItemFailure {
                item_identifier: id.to_owned(),
            })
            .collect(),
    };

    if !report.is_complete() {
        tracing::info!(
            ?policy,
            uncommitted = report.outcomes.len() - report.committed(),
            reported = batch_item_failures.len(),
            "acknowledging incomplete batch"
        );
    }

    SqsBatchResponse {
        batch_item_failures,
    }
}

#[cfg(test)]
mod tests {
    use reconciliation::{
        CommittedUpdate, DsSource, DsStatus, DsStatusUpdate, EventError, EventOutcome,
        MalformedInput, PlacementId, SessionError, UpstreamStage, DEFAULT_SERVER_PORT,
    };
    use serde_json::json;

    use super::*;

    fn sqs_event() -> SqsEvent {
        serde_json::from_value(json!({
            "Records": [
                {
                    "messageId": "059f36b4-87a3-44ab-83d2-661975830a7d",
                    "receiptHandle": "AQEBwJnKyrHigUMZj6rYigCgxlaS3SLy0a",
                    "body": "{\"detail-type\":\"GameLift Queue Placement Event\"}",
                    "attributes": {
                        "ApproximateReceiveCount": "1",
                        "SentTimestamp": "1545082649183",
                        "SenderId": "AIDAIENQZJOLO23YVJ4VO",
                        "ApproximateFirstReceiveTimestamp": "1545082649185"
                    },
                    "messageAttributes": {},
                    "md5OfBody": "e4e68fb7bd0e697a0ae8f1bb342846b3",
                    "eventSource": "aws:sqs",
                    "eventSourceARN": "arn:aws:sqs:us-east-2:123456789012:placements",
                    "awsRegion": "us-east-2"
                },
                {
                    "messageId": "2e1424d4-f796-459a-8184-9c92662be6da",
                    "receiptHandle": "AQEBzWwaftRI0KuVm4tP+/7q1rGgNqicHq",
                    "attributes": {},
                    "messageAttributes": {},
                    "eventSource": "aws:sqs",
                    "eventSourceARN": "arn:aws:sqs:us-east-2:123456789012:placements",
                    "awsRegion": "us-east-2"
                }
            ]
        }))
        .expect("valid SQS event")
    }

    fn committed(message_id: &str) -> EventOutcome {
        let placement_id = PlacementId::new("p-1").expect("non-empty");
        EventOutcome {
            message_id: Some(message_id.into()),
            result: Ok(CommittedUpdate {
                placement_id: placement_id.clone(),
                update: DsStatusUpdate {
                    status: DsStatus::FailedToRequest,
                    ip: "127.0.0.1".into(),
                    port: DEFAULT_SERVER_PORT,
                    deployment: "PlacementFailed".into(),
                    region: "us-east-1".into(),
                    request_region: "us-east-1".into(),
                    source: DsSource::Aws,
                    server_id: placement_id,
                    client_version: None,
                    game_mode: None,
                },
            }),
        }
    }

    fn mixed_report() -> BatchReport {
        BatchReport {
            outcomes: vec![
                committed("m-1"),
                EventOutcome {
                    message_id: Some("m-2".into()),
                    result: Err(EventError::MalformedInput(MalformedInput::MissingResources)),
                },
                EventOutcome {
                    message_id: Some("m-3".into()),
                    result: Err(EventError::UpstreamUnavailable {
                        placement_id: PlacementId::new("p-3").expect("non-empty"),
                        stage: UpstreamStage::CommitUpdate,
                        source: SessionError::Transport {
                            message: "connection reset".into(),
                        },
                    }),
                },
            ],
        }
    }

    #[test]
    fn records_become_inbound_messages_in_order() {
        let messages = inbound_messages(sqs_event());

        assert_eq!(messages.len(), 2);
        assert_eq!(
            messages[0].message_id.as_deref(),
            Some("059f36b4-87a3-44ab-83d2-661975830a7d")
        );
        assert_eq!(
            messages[0].body,
            br#"{"detail-type":"GameLift Queue Placement Event"}"#.to_vec()
        );
        assert_eq!(
            messages[1].message_id.as_deref(),
            Some("2e1424d4-f796-459a-8184-9c92662be6da")
        );
        assert!(messages[1].body.is_empty());
    }

    #[test]
    fn empty_batch_yields_no_messages() {
        assert!(inbound_messages(SqsEvent::default()).is_empty());
    }

    #[test]
    fn default_policy_acknowledges_everything() {
        let response = batch_response(&mixed_report(), AckPolicy::default());
        assert!(response.batch_item_failures.is_empty());
    }

    #[test]
    fn report_failures_lists_uncommitted_messages() {
        let response = batch_response(&mixed_report(), AckPolicy::ReportFailures);
        let ids: Vec<_> = response
            .batch_item_failures
            .iter()
            .map(|f| f.item_identifier.as_str())
            .collect();
        assert_eq!(ids, ["m-2", "m-3"]);
    }

    #[test]
    fn complete_batches_report_nothing() {
        let report = BatchReport {
            outcomes: vec![committed("m-1")],
        };
        let response = batch_response(&report, AckPolicy::ReportFailures);
        assert!(response.batch_item_failures.is_empty());
    }
}
