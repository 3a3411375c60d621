//! AWS Systems Manager Parameter Store adapter.
//!
//! Implements [`reconciliation::ParameterStore`] with `GetParameter` calls made
//! with decryption enabled, so `SecureString` parameters (the client secret)
//! come back in plain text.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** AWS credential resolution, region selection, and SDK
//! error mapping live here. The [`reconciliation`] crate sees only
//! [`reconciliation::ParameterStore`] and [`reconciliation::ParameterError`].

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_ssm::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_ssm::operation::get_parameter::GetParameterOutput;
use aws_sdk_ssm::Client;
use reconciliation::{ParameterError, ParameterStore};

/// Parameter store backed by AWS SSM.
#[derive(Debug, Clone)]
pub struct SsmParameterStore {
    client: Client,
}

impl SsmParameterStore {
    /// Builds a store using the default AWS configuration chain
    /// (environment, profile, container or instance role).
    pub async fn from_env() -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        Self::from_client(Client::new(&config))
    }

    /// Wraps an existing SSM client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ParameterStore for SsmParameterStore {
    async fn get(&self, name: &str) -> Result<String, ParameterError> {
        let result = self
            .client
            .get_parameter()
            .name(name)
            .with_decryption(true)
            .send()
            .await;

        match result {
            Ok(output) => {
                tracing::debug!(parameter = name, "parameter resolved");
                parameter_value(name, &output)
            }
            Err(err) => {
                let code = err.as_service_error().and_then(|e| e.code());
                let mapped = classify_error(name, code, DisplayErrorContext(&err).to_string());
                tracing::error!(parameter = name, error = %mapped, "parameter lookup failed");
                Err(mapped)
            }
        }
    }
}

/// Extracts the parameter value from a `GetParameter` response.
fn parameter_value(name: &str, output: &GetParameterOutput) -> Result<String, ParameterError> {
    let parameter = output.parameter().ok_or_else(|| ParameterError::Unavailable {
        name: name.to_owned(),
        message: "response contained no parameter".into(),
    })?;
    parameter
        .value()
        .map(str::to_owned)
        .ok_or_else(|| ParameterError::Unavailable {
            name: name.to_owned(),
            message: "parameter has no value".into(),
        })
}

/// Maps an SSM error code onto the parameter error taxonomy.
fn classify_error(name: &str, code: Option<&str>, message: String) -> ParameterError {
    let name = name.to_owned();
    match code {
        Some("ParameterNotFound") | Some("ParameterVersionNotFound") => {
            ParameterError::NotFound { name }
        }
        Some(code) if code == "InvalidKeyId" || code.contains("KMS") => {
            ParameterError::Decrypt { name, message }
        }
        _ => ParameterError::Unavailable { name, message },
    }
}
