use std::time::Duration;

/// Default Slack Web API method for listing workspace members.
pub const DEFAULT_ROSTER_URL: &str = "https://slack.com/api/users.list";

/// Connection settings for the roster provider.
#[derive(Clone)]
pub struct ProviderConfig {
    pub endpoint: String,
    pub token: String,
    pub page_limit: u32,
    pub request_timeout: Duration,
}

impl ProviderConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ROSTER_URL.to_string(),
            token: token.into(),
            page_limit: 200,
            request_timeout: Duration::from_secs(20),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn has_token(&self) -> bool {
        !self.token.trim().is_empty()
    }
}

// Hand-written so the bearer token never reaches logs.
impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("endpoint", &self.endpoint)
            .field("token", &if self.has_token() { "<redacted>" } else { "<unset>" })
            .field("page_limit", &self.page_limit)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Bounds for a single sync run.
#[derive(Clone, Debug)]
pub struct SyncSettings {
    /// Pages fetched before the run is abandoned as a misbehaving provider.
    pub max_pages: usize,
    /// Budget for the whole pagination phase.
    pub run_timeout: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            max_pages: 500,
            run_timeout: Duration::from_secs(300),
        }
    }
}
