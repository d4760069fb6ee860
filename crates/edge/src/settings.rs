// crates/edge/src/settings.rs

//! Layered settings: built-in defaults, then an optional TOML file, then
//! `RELAY__SECTION__KEY` environment variables, then command-line flags.

use config::{Config, Environment, File, FileFormat};
use domain::setting::{Settings, DEFAULT_UPSTREAM_URL, DEFAULT_UPSTREAM_VERSION};
use std::path::Path;
use tracing::debug;

use crate::Error;

const ENV_PREFIX: &str = "RELAY";

/// Values supplied on the command line (or their env fallbacks).
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub port: Option<u16>,
    pub api_key: Option<String>,
    pub database_id: Option<String>,
    pub base_url: Option<String>,
}

#[tracing::instrument(skip_all)]
pub fn load(path: &Path, overrides: Overrides) -> Result<Settings, Error> {
    debug!("loading settings from {}", path.display());

    let settings: Settings = Config::builder()
        .set_default("server.ip", "127.0.0.1")?
        .set_default("server.port", 3001)?
        .set_default("upstream.base_url", DEFAULT_UPSTREAM_URL)?
        .set_default("upstream.version", DEFAULT_UPSTREAM_VERSION)?
        .add_source(File::from(path).format(FileFormat::Toml).required(false))
        .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
        .set_override_option("server.port", overrides.port.map(i64::from))?
        .set_override_option("upstream.api_key", overrides.api_key)?
        .set_override_option("upstream.database_id", overrides.database_id)?
        .set_override_option("upstream.base_url", overrides.base_url)?
        .build()?
        .try_deserialize()?;

    Ok(settings)
}
