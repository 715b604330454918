use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use review_engine::{
    FetchSettings, HarvestSettings, DEFAULT_BASE_URL, DEFAULT_MIN_KEYWORD_LEN, DEFAULT_USER_AGENT,
};
use review_logging::review_info;
use serde::{Deserialize, Serialize};

/// Settings read from a RON file. Every field is optional in the file;
/// command-line flags override whatever is loaded here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub base_url: String,
    pub max_pages: u32,
    pub delay_ms: u64,
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub max_body_bytes: u64,
    pub max_runtime_secs: Option<u64>,
    pub respect_robots: bool,
    pub output_dir: PathBuf,
    /// `csv`, `json` or `both`.
    pub output: String,
    pub keyword_min_len: usize,
    pub user_agent: String,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        let fetch = FetchSettings::default();
        let harvest = HarvestSettings::default();
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            max_pages: harvest.max_pages,
            delay_ms: harvest.page_delay.as_millis() as u64,
            max_attempts: harvest.max_attempts,
            retry_backoff_ms: harvest.retry_backoff.as_millis() as u64,
            connect_timeout_secs: fetch.connect_timeout.as_secs(),
            request_timeout_secs: fetch.request_timeout.as_secs(),
            max_body_bytes: fetch.max_bytes,
            max_runtime_secs: None,
            respect_robots: true,
            output_dir: PathBuf::from("."),
            output: "csv".to_string(),
            keyword_min_len: DEFAULT_MIN_KEYWORD_LEN,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: ron::error::SpannedError,
    },
}

pub fn load(path: &Path) -> Result<HarvestConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config = ron::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    review_info!("Loaded settings from {:?}", path);
    Ok(config)
}

impl HarvestConfig {
    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            max_bytes: self.max_body_bytes,
            user_agent: self.user_agent.clone(),
            ..FetchSettings::default()
        }
    }

    pub fn harvest_settings(&self) -> HarvestSettings {
        HarvestSettings {
            base_url: self.base_url.clone(),
            max_pages: self.max_pages,
            page_delay: Duration::from_millis(self.delay_ms),
            max_attempts: self.max_attempts,
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
            max_runtime: self.max_runtime_secs.map(Duration::from_secs),
            respect_robots: self.respect_robots,
            user_agent: self.user_agent.clone(),
        }
    }
}
