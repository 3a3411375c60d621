//! Placement reconciler Lambda entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Wire logging**: install the JSON `tracing` subscriber. Spans and events
//!    from every crate in the workspace flow through it.
//! 2. **Construct infrastructure**: the SSM parameter store and the AccelByte
//!    connector are built once per container and reused by warm invocations.
//! 3. **Run the event loop**: hand each SQS batch to [`handler::Handler`].
//!
//! Backend configuration is not read here. It is resolved from the parameter
//! store at the start of every invocation.

mod handler;
mod observability;

use accelbyte::{AccelByteConnector, ClientOptions};
use anyhow::Context as _;
use aws_lambda_events::sqs::SqsEvent;
use lambda_runtime::{service_fn, LambdaEvent};
use listener::AckPolicy;
use ssm::SsmParameterStore;

use crate::handler::Handler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init_logging();

    let parameters = SsmParameterStore::from_env().await;
    let connector = AccelByteConnector::new(ClientOptions::default())
        .context("failed to build the backend HTTP client")?;
    let handler = Handler::new(parameters, connector, AckPolicy::default());

    tracing::info!("placement reconciler starting");

    let handler = &handler;
    lambda_runtime::run(service_fn(move |event: LambdaEvent<SqsEvent>| async move {
        handler
            .handle(event.payload, &event.context.request_id)
            .await
            .map_err(lambda_runtime::Error::from)
    }))
    .await
    .map_err(|err| anyhow::anyhow!(err))
}
