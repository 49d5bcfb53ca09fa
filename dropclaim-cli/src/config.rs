//! CLI configuration.
//!
//! Settings come from, lowest to highest precedence: built-in defaults, the
//! `DROPCLAIM_*` environment variables, the TOML config file, and flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use dropclaim_client::{AirdropClient, ClientConfig, SnapshotSource};

/// Snapshot path used when neither the config file nor `--snapshot` names one.
pub const DEFAULT_SNAPSHOT: &str = "snapshot.json";

/// Contents of `config.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub snapshot: Option<PathBuf>,
    pub cache_size: Option<usize>,
    pub max_retries: Option<u32>,
    pub base_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
}

/// `<config dir>/dropclaim/config.toml`, if the platform has a config dir.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("dropclaim").join("config.toml"))
}

impl FileConfig {
    /// Load `explicit`, or the default file if present.
    ///
    /// A missing default file is not an error; a missing explicit one is.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match default_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(Self::default()),
            },
        };
        Self::from_file(&path)
    }

    fn from_file(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading config file");
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }
}

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub snapshot: PathBuf,
    pub client: ClientConfig,
}

impl Settings {
    pub fn resolve(file: FileConfig, snapshot: Option<PathBuf>, max_retries: Option<u32>) -> Self {
        let mut client = ClientConfig::from_env();
        if let Some(size) = file.cache_size.filter(|s| *s > 0) {
            client.cache_capacity = size;
        }
        if let Some(retries) = max_retries.or(file.max_retries) {
            client.retry.max_retries = retries;
        }
        if let Some(ms) = file.base_delay_ms {
            client.retry.base_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = file.max_delay_ms {
            client.retry.max_delay = Duration::from_millis(ms);
        }
        client.retry = client.retry.validated();

        let snapshot = snapshot
            .or(file.snapshot)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SNAPSHOT));
        debug!(
            snapshot = %snapshot.display(),
            cache_capacity = client.cache_capacity,
            max_retries = client.retry.max_retries,
            "resolved settings"
        );
        Self { snapshot, client }
    }

    /// Open the snapshot and build a client over it.
    pub fn open_client(&self) -> dropclaim_core::Result<AirdropClient<SnapshotSource>> {
        debug!(snapshot = %self.snapshot.display(), "opening snapshot");
        let source = SnapshotSource::load(&self.snapshot)?;
        Ok(AirdropClient::new(source, self.client.clone()))
    }
}
