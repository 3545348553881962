//! Slack `users.list` roster client.
//!
//! Pages are requested with a JSON body `{cursor, limit}` and a bot token.
//! Any non-2xx status, undecodable body or `ok: false` answer is an upstream
//! error for the whole run.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    config::ProviderConfig,
    error::{SyncError, SyncResult},
    provider::{DirectoryEntry, RosterPage, RosterProvider},
};

/// Slack's built-in assistant is reported with `is_bot: false`.
const SLACKBOT_ID: &str = "USLACKBOT";

#[derive(Debug, Serialize)]
struct UsersListRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    cursor: Option<&'a str>,
    limit: u32,
}

#[derive(Debug, Deserialize)]
struct UsersListResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    members: Vec<SlackMember>,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SlackMember {
    id: String,
    #[serde(default)]
    deleted: bool,
    #[serde(default)]
    is_bot: bool,
    #[serde(default)]
    profile: SlackProfile,
}

#[derive(Debug, Default, Deserialize)]
struct SlackProfile {
    #[serde(default)]
    real_name: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

impl From<SlackMember> for DirectoryEntry {
    fn from(member: SlackMember) -> Self {
        let bot = member.is_bot || member.id == SLACKBOT_ID;
        // Eligibility hinges on the profile name; member-level `real_name` is ignored.
        let display_name = member
            .profile
            .real_name
            .filter(|name| !name.trim().is_empty());
        DirectoryEntry {
            id: member.id,
            display_name,
            title: member.profile.title,
            deactivated: member.deleted,
            bot,
        }
    }
}

#[derive(Clone)]
pub struct SlackRosterClient {
    client: Client,
    config: ProviderConfig,
}

impl SlackRosterClient {
    pub fn new(config: ProviderConfig) -> SyncResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| SyncError::Configuration(format!("http client: {err}")))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

fn decode_page(body: UsersListResponse) -> SyncResult<RosterPage> {
    if !body.ok {
        return Err(SyncError::Upstream(format!(
            "slack users.list failed: {}",
            body.error.unwrap_or_else(|| "unknown".to_string())
        )));
    }
    Ok(RosterPage {
        entries: body.members.into_iter().map(DirectoryEntry::from).collect(),
        next_cursor: body.response_metadata.and_then(|meta| meta.next_cursor),
    })
}

#[async_trait]
impl RosterProvider for SlackRosterClient {
    fn name(&self) -> &'static str {
        "slack"
    }

    fn ensure_ready(&self) -> SyncResult<()> {
        if self.config.has_token() {
            Ok(())
        } else {
            Err(SyncError::Configuration(
                "roster provider access token is not set".to_string(),
            ))
        }
    }

    #[instrument(level = "debug", skip(self), fields(has_cursor = cursor.is_some()))]
    async fn fetch_page(&self, cursor: Option<&str>) -> SyncResult<RosterPage> {
        let request = UsersListRequest {
            cursor,
            limit: self.config.page_limit,
        };
        let resp = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.token)
            .json(&request)
            .send()
            .await
            .map_err(SyncError::upstream_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SyncError::Upstream(format!(
                "slack users.list returned HTTP {status}"
            )));
        }

        let body: UsersListResponse = resp.json().await.map_err(SyncError::upstream_reqwest)?;
        let page = decode_page(body)?;
        debug!(
            entries = page.entries.len(),
            more = page.continuation().is_some(),
            "fetched roster page"
        );
        Ok(page)
    }
}
