use serde::Deserialize;
use std::{fmt, net::IpAddr, time::Duration};

use crate::Error;

pub const DEFAULT_UPSTREAM_URL: &str = "https://api.notion.com";
pub const DEFAULT_UPSTREAM_VERSION: &str = "2022-06-28";

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// IP address the relay binds to
    pub ip: IpAddr,

    /// Relay HTTP port
    pub port: u16,
}

#[derive(Clone, Deserialize)]
pub struct UpstreamSettings {
    /// Base URL of the document-database API
    pub base_url: String,

    /// Integration credential sent as a bearer token
    #[serde(default)]
    pub api_key: String,

    /// Collection new pages are created in and listed from
    #[serde(default)]
    pub database_id: Option<String>,

    /// Value of the `Notion-Version` header
    pub version: String,

    /// Per-request timeout; unset means wait indefinitely
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl UpstreamSettings {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Credential prefix safe to print in diagnostics.
    pub fn api_key_hint(&self) -> String {
        let prefix: String = self.api_key.chars().take(15).collect();
        format!("{prefix}...")
    }
}

impl fmt::Debug for UpstreamSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("database_id", &self.database_id)
            .field("version", &self.version)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub upstream: UpstreamSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<(), Error> {
        if self.upstream.api_key.trim().is_empty() {
            return Err(Error::Settings(
                "upstream.api_key is not set (use --api-key or NOTION_API_KEY)".to_owned(),
            ));
        }
        if self.upstream.base_url.trim().is_empty() {
            return Err(Error::Settings("upstream.base_url is empty".to_owned()));
        }
        Ok(())
    }
}
