use std::time::Duration;

use serde::Deserialize;

use crate::{MogileError, MogileResult};

/// Configuration for domain transfers
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Read size used when streaming a local file to a storage node
    pub chunk_size: usize,

    /// Buffered bytes at which a file sink reports itself saturated
    pub sink_high_water_mark: usize,

    /// Ask the tracker to confirm replicas before downloading.
    /// Off by default: the first known location is used as-is.
    pub verify_download_paths: bool,

    /// Storage-node HTTP settings
    pub http: HttpConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            chunk_size: 64 * 1024,
            sink_high_water_mark: 16 * 1024,
            verify_download_paths: false,
            http: HttpConfig::default(),
        }
    }
}

/// Settings for the storage-node HTTP transport
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Option<Duration>,

    /// Whole-request deadline; unset means transfers may run as long as they need
    #[serde(with = "humantime_serde")]
    pub request_timeout: Option<Duration>,

    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Some(Duration::from_secs(10)),
            request_timeout: None,
            user_agent: concat!("dog-mogile/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the source read size
    pub fn with_chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes.max(1);
        self
    }

    /// Set the file sink saturation threshold
    pub fn with_sink_high_water_mark(mut self, bytes: usize) -> Self {
        self.sink_high_water_mark = bytes.max(1);
        self
    }

    /// Verify replicas before downloading
    pub fn verify_download_paths(mut self) -> Self {
        self.verify_download_paths = true;
        self
    }

    /// Set HTTP settings
    pub fn with_http(mut self, http: HttpConfig) -> Self {
        self.http = http;
        self
    }

    /// Load defaults overridden by `PREFIX__KEY` environment variables.
    ///
    /// `DOG_MOGILE__HTTP__REQUEST_TIMEOUT=30s` sets `http.request_timeout`.
    pub fn from_env(prefix: &str) -> MogileResult<Self> {
        Self::from_vars(prefix, std::env::vars())
    }

    /// Same as [`ClientConfig::from_env`] over an explicit variable list
    pub fn from_vars<I, K, V>(prefix: &str, vars: I) -> MogileResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self::default();
        for (key, value) in vars {
            if let Some(stripped) = key.as_ref().strip_prefix(prefix) {
                let normalized = stripped
                    .trim_start_matches("__")
                    .to_lowercase()
                    .replace("__", ".");
                config.set(&normalized, value.as_ref())?;
            }
        }
        Ok(config)
    }

    fn set(&mut self, key: &str, value: &str) -> MogileResult<()> {
        match key {
            "chunk_size" => self.chunk_size = parse_size(key, value)?,
            "sink_high_water_mark" => self.sink_high_water_mark = parse_size(key, value)?,
            "verify_download_paths" => {
                self.verify_download_paths = value
                    .parse()
                    .map_err(|_| MogileError::config(key, format!("expected a boolean, got {value:?}")))?;
            }
            "http.connect_timeout" => self.http.connect_timeout = parse_timeout(key, value)?,
            "http.request_timeout" => self.http.request_timeout = parse_timeout(key, value)?,
            "http.user_agent" => self.http.user_agent = value.to_string(),
            _ => tracing::debug!("Ignoring unknown config key: {}", key),
        }
        Ok(())
    }
}

fn parse_size(key: &str, value: &str) -> MogileResult<usize> {
    match value.parse::<usize>() {
        Ok(0) | Err(_) => Err(MogileError::config(
            key,
            format!("expected a positive byte count, got {value:?}"),
        )),
        Ok(n) => Ok(n),
    }
}

fn parse_timeout(key: &str, value: &str) -> MogileResult<Option<Duration>> {
    if value.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    humantime_serde::re::humantime::parse_duration(value)
        .map(Some)
        .map_err(|e| MogileError::config(key, e.to_string()))
}
