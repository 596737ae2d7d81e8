//! Client configuration. The only environment-dependent setting is where the
//! archive API lives.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Port the archive backend listens on
pub const DEFAULT_API_PORT: u16 = 5000;
/// Server folder uploads are written into
pub const DEFAULT_UPLOAD_FOLDER: &str = "images";
/// How long the index button reads "Completed" before going back to idle
pub const DEFAULT_INDEX_DONE_LINGER_MS: u64 = 3000;

const ENV_API_BASE: &str = "ARCHIVE_API_BASE";
const ENV_API_HOST: &str = "ARCHIVE_API_HOST";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL every endpoint is resolved against, e.g. `http://localhost:5000/api`
    pub api_base: String,
    #[serde(default = "default_upload_folder")]
    pub upload_folder: String,
    #[serde(default = "default_index_done_linger_ms")]
    pub index_done_linger_ms: u64,
}

fn default_upload_folder() -> String {
    DEFAULT_UPLOAD_FOLDER.to_string()
}

fn default_index_done_linger_ms() -> u64 {
    DEFAULT_INDEX_DONE_LINGER_MS
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::for_host("localhost")
    }
}

impl ClientConfig {
    /// Config pointing at the archive running on `host`
    pub fn for_host(host: &str) -> Self {
        Self {
            api_base: format!("http://{}:{}/api", host, DEFAULT_API_PORT),
            upload_folder: default_upload_folder(),
            index_done_linger_ms: default_index_done_linger_ms(),
        }
    }

    pub fn index_done_linger(&self) -> Duration {
        Duration::from_millis(self.index_done_linger_ms)
    }

    /// `ARCHIVE_API_BASE` wins over `ARCHIVE_API_HOST`; neither set means localhost.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(base) = non_empty(ENV_API_BASE) {
            return Self {
                api_base: base.trim().trim_end_matches('/').to_string(),
                ..Self::default()
            };
        }
        match non_empty(ENV_API_HOST) {
            Some(host) => Self::for_host(host.trim()),
            None => Self::default(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut config: Self = serde_json::from_str(json)?;
        config.api_base = config.api_base.trim_end_matches('/').to_string();
        Ok(config)
    }
}
