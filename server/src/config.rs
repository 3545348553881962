use std::time::Duration;

use anyhow::{Context, Result};
use directory::{DEFAULT_ROSTER_URL, ProviderConfig, SyncSettings};

#[derive(Clone)]
pub struct AppConfig {
    pub cors_allowed_origins: Vec<String>,
    /// Bearer token guarding `POST /sync/employees`. Unset disables the route.
    pub sync_api_token: Option<String>,
    pub sync_on_startup: bool,
    pub sync_interval: Option<Duration>,
    pub provider: ProviderConfig,
    pub sync: SyncSettings,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };

        let cors_allowed_origins = var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".into())
            .split(',')
            .filter_map(|s| {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            })
            .collect::<Vec<_>>();

        let sync_on_startup = var("SYNC_ON_STARTUP")
            .map(|val| matches!(val.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(true);

        let sync_interval = var("ROSTER_SYNC_INTERVAL_SECS")
            .map(|raw| parse_secs("ROSTER_SYNC_INTERVAL_SECS", &raw))
            .transpose()?
            .filter(|every| !every.is_zero());

        // A missing token is not fatal here: the kiosk must boot without it,
        // and each sync run reports the configuration error instead.
        let mut provider = ProviderConfig::new(var("SLACK_BOT_TOKEN").unwrap_or_default())
            .with_endpoint(var("ROSTER_API_URL").unwrap_or_else(|| DEFAULT_ROSTER_URL.into()));
        if let Some(raw) = var("ROSTER_PAGE_LIMIT") {
            provider.page_limit = parse_positive("ROSTER_PAGE_LIMIT", &raw)?;
        }
        if let Some(raw) = var("ROSTER_REQUEST_TIMEOUT_SECS") {
            provider.request_timeout = parse_positive_secs("ROSTER_REQUEST_TIMEOUT_SECS", &raw)?;
        }

        let mut sync = SyncSettings::default();
        if let Some(raw) = var("ROSTER_MAX_PAGES") {
            sync.max_pages = parse_positive("ROSTER_MAX_PAGES", &raw)?;
        }
        if let Some(raw) = var("ROSTER_RUN_TIMEOUT_SECS") {
            sync.run_timeout = parse_positive_secs("ROSTER_RUN_TIMEOUT_SECS", &raw)?;
        }

        Ok(Self {
            cors_allowed_origins,
            sync_api_token: var("SYNC_API_TOKEN"),
            sync_on_startup,
            sync_interval,
            provider,
            sync,
        })
    }
}

fn parse_secs(key: &str, raw: &str) -> Result<Duration> {
    raw.parse::<u64>()
        .map(Duration::from_secs)
        .with_context(|| format!("invalid {key} {raw:?}"))
}

/// A bound where zero would make every run fail.
fn parse_positive<T>(key: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr + PartialEq + Default,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = raw
        .parse::<T>()
        .with_context(|| format!("invalid {key} {raw:?}"))?;
    if value == T::default() {
        anyhow::bail!("{key} must be greater than zero");
    }
    Ok(value)
}

fn parse_positive_secs(key: &str, raw: &str) -> Result<Duration> {
    parse_positive::<u64>(key, raw).map(Duration::from_secs)
}
