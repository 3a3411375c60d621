//! HTTP implementation of the session ports.
//!
//! [`AccelByteConnector`] performs the OAuth client-credentials login once per
//! invocation and yields an [`AccelByteSessionClient`] holding the bearer
//! token. Every backend call goes through the configured [`RetrySettings`].

use std::time::Duration;

use async_trait::async_trait;
use reconciliation::{
    BackendConfig, DsStatusUpdate, Namespace, PlacementId, SessionConnector, SessionError,
    SessionRecord, SessionStore,
};
use reqwest::header::RETRY_AFTER;
use reqwest::{Response, StatusCode, Url};
use thiserror::Error;

use crate::retry::{with_retry, RetrySettings};
use crate::wire::{GameSessionResponse, TokenResponse, UpdateDsInformationRequest};

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Tunables for the HTTP client.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Per-request timeout, covering connect through body read.
    pub request_timeout: Duration,
    /// Retry settings applied to login, fetch, and update calls.
    pub retry: RetrySettings,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            retry: RetrySettings::default(),
        }
    }
}

/// Construction-time problems with [`ClientOptions`].
#[derive(Debug, Error)]
pub enum InvalidOptions {
    /// The request timeout is zero.
    #[error("request_timeout must be greater than 0")]
    ZeroTimeout,

    /// The retry budget is zero.
    #[error("retry.max_attempts must be greater than 0")]
    ZeroAttempts,

    /// The underlying HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl ClientOptions {
    fn validate(&self) -> Result<(), InvalidOptions> {
        if self.request_timeout.is_zero() {
            return Err(InvalidOptions::ZeroTimeout);
        }
        if self.retry.max_attempts == 0 {
            return Err(InvalidOptions::ZeroAttempts);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Connector
// ---------------------------------------------------------------------------

/// Authenticates against AccelByte IAM and hands out session clients.
#[derive(Debug, Clone)]
pub struct AccelByteConnector {
    http: reqwest::Client,
    options: ClientOptions,
}

impl AccelByteConnector {
    /// Builds a connector with validated options.
    pub fn new(options: ClientOptions) -> Result<Self, InvalidOptions> {
        options.validate()?;
        let http = reqwest::Client::builder()
            .timeout(options.request_timeout)
            .build()?;
        Ok(Self { http, options })
    }
}

#[async_trait]
impl SessionConnector for AccelByteConnector {
    type Store = AccelByteSessionClient;

    async fn connect(&self, config: &BackendConfig) -> Result<AccelByteSessionClient, SessionError> {
        let base_url = Url::parse(&config.base_url).map_err(|err| SessionError::InvalidBaseUrl {
            url: config.base_url.clone(),
            message: err.to_string(),
        })?;
        let token_url = endpoint(&base_url, &["iam", "v3", "oauth", "token"])?;

        let http = &self.http;
        let token_url = &token_url;
        let grant = with_retry(&self.options.retry, "login_client", move || async move {
            let response = http
                .post(token_url.clone())
                .basic_auth(&config.client_id, Some(&config.client_secret))
                .form(&[("grant_type", "client_credentials")])
                .send()
                .await
                .map_err(transport_error)?;

            match response.status() {
                StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    Err(SessionError::Authentication {
                        message: format!("{status}: {body}"),
                    })
                }
                _ => decode::<TokenResponse>(error_for_status(response).await?).await,
            }
        })
        .await?;

        tracing::info!(
            client_id = %config.client_id,
            expires_in_secs = grant.expires_in,
            "authenticated with backend"
        );

        Ok(AccelByteSessionClient {
            http: self.http.clone(),
            base_url,
            token: AccessToken(grant.access_token),
            retry: self.options.retry,
        })
    }
}

// ---------------------------------------------------------------------------
// Session client
// ---------------------------------------------------------------------------

/// Bearer token returned by the IAM login.
#[derive(Clone)]
struct AccessToken(String);

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

/// Authenticated AccelByte Session service client.
#[derive(Debug, Clone)]
pub struct AccelByteSessionClient {
    http: reqwest::Client,
    base_url: Url,
    token: AccessToken,
    retry: RetrySettings,
}

#[async_trait]
impl SessionStore for AccelByteSessionClient {
    async fn get_session(
        &self,
        namespace: &Namespace,
        placement_id: &PlacementId,
    ) -> Result<SessionRecord, SessionError> {
        let url = endpoint(
            &self.base_url,
            &[
                "session",
                "v1",
                "public",
                "namespaces",
                namespace.as_str(),
                "gamesessions",
                placement_id.as_str(),
            ],
        )?;

        let (http, token, url) = (&self.http, &self.token.0, &url);
        let session = with_retry(&self.retry, "get_game_session", move || async move {
            let response = http
                .get(url.clone())
                .bearer_auth(token)
                .send()
                .await
                .map_err(transport_error)?;

            if response.status() == StatusCode::NOT_FOUND {
                return Err(SessionError::NotFound {
                    session_id: placement_id.to_string(),
                });
            }
            decode::<GameSessionResponse>(error_for_status(response).await?).await
        })
        .await?;

        Ok(session.into())
    }

    async fn update_ds_information(
        &self,
        namespace: &Namespace,
        placement_id: &PlacementId,
        update: &DsStatusUpdate,
    ) -> Result<(), SessionError> {
        let url = endpoint(
            &self.base_url,
            &[
                "session",
                "v1",
                "admin",
                "namespaces",
                namespace.as_str(),
                "gamesessions",
                placement_id.as_str(),
                "dsinformation",
            ],
        )?;
        let body = UpdateDsInformationRequest::from(update);
        let (http, token, url, body) = (&self.http, &self.token.0, &url, &body);

        with_retry(&self.retry, "admin_update_ds_information", move || async move {
            let response = http
                .put(url.clone())
                .bearer_auth(token)
                .json(body)
                .send()
                .await
                .map_err(transport_error)?;

            if response.status() == StatusCode::NOT_FOUND {
                return Err(SessionError::NotFound {
                    session_id: placement_id.to_string(),
                });
            }
            error_for_status(response).await.map(|_| ())
        })
        .await
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Appends percent-encoded path segments to `base`, keeping any path prefix.
fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, SessionError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| SessionError::InvalidBaseUrl {
            url: base.to_string(),
            message: "URL cannot be a base".into(),
        })?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn transport_error(err: reqwest::Error) -> SessionError {
    SessionError::Transport {
        message: err.to_string(),
    }
}

async fn error_for_status(response: Response) -> Result<Response, SessionError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs);
    let message = response
        .text()
        .await
        .ok()
        .filter(|body| !body.is_empty())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("").to_owned());

    Err(SessionError::Http {
        status: status.as_u16(),
        message,
        retry_after,
    })
}

async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, SessionError> {
    response.json::<T>().await.map_err(|err| SessionError::Decode {
        message: err.to_string(),
    })
}
