//! Request and response bodies exchanged with the AccelByte REST API.
//!
//! Only the fields the reconciler reads or writes are modelled; everything
//! else in a response is ignored.

use reconciliation::{DsStatusUpdate, SessionRecord};
use serde::{Deserialize, Serialize};

/// `POST /iam/v3/oauth/token` response.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub(crate) access_token: String,
    #[serde(default)]
    pub(crate) expires_in: Option<u64>,
}

/// `GET /session/v1/public/namespaces/{ns}/gamesessions/{id}` response.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GameSessionResponse {
    #[serde(default)]
    configuration: Option<SessionConfiguration>,
    #[serde(default)]
    match_pool: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionConfiguration {
    #[serde(default)]
    client_version: Option<String>,
}

impl From<GameSessionResponse> for SessionRecord {
    fn from(response: GameSessionResponse) -> Self {
        Self {
            client_version: response.configuration.and_then(|c| c.client_version),
            game_mode: response.match_pool,
        }
    }
}

/// `PUT /session/v1/admin/namespaces/{ns}/gamesessions/{id}/dsinformation` body.
///
/// `region` is the region the event came from and `createdRegion` the region
/// hosting (or failing to host) the server.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateDsInformationRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    client_version: Option<&'a str>,
    created_region: &'a str,
    deployment: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    game_mode: Option<&'a str>,
    ip: &'a str,
    port: u16,
    region: &'a str,
    server_id: &'a str,
    source: &'static str,
    status: &'static str,
}

impl<'a> From<&'a DsStatusUpdate> for UpdateDsInformationRequest<'a> {
    fn from(update: &'a DsStatusUpdate) -> Self {
        Self {
            client_version: update.client_version.as_deref(),
            created_region: &update.region,
            deployment: &update.deployment,
            game_mode: update.game_mode.as_deref(),
            ip: &update.ip,
            port: update.port.as_u16(),
            region: &update.request_region,
            server_id: update.server_id.as_str(),
            source: update.source.as_str(),
            status: update.status.as_str(),
        }
    }
}
