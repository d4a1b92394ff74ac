//!
//! Configuration module
//!

use std::collections::HashMap;
use std::fs;
use std::num::NonZeroU64;
use std::path::PathBuf;
use std::time::Duration;
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use log::warn;
use serde::{Deserialize, Serialize};
use crate::download::chunk_client::{DEFAULT_CHUNK_SIZE, DEFAULT_VERIFY_ETAG};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36";

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Concurrent range requests, 0 selects the default
    pub worker_count: usize,
    /// Bytes per range request, 0 selects the default
    pub chunk_size: u64,
    pub verify_etag: bool,
    /// Trust any TLS certificate, for self-signed test servers
    pub accept_invalid_certs: bool,
    pub request_timeout_secs: Option<u64>,
    pub use_browser_user_agent: bool,
    /// Extra headers sent with every range request
    pub headers: HashMap<String, String>,
    pub download_dir: PathBuf,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl Config {
    pub fn load_from_file(file_path: &str) -> Result<Self> {
        let config_data = fs::read_to_string(file_path)
            .with_context(|| format!("Reading config failed: {}", file_path))?;
        let config: Config = serde_json::from_str(&config_data)
            .with_context(|| format!("Parsing config failed: {}", file_path))?;

        Ok(config)
    }

    pub fn resolved_chunk_size(&self) -> NonZeroU64 {
        NonZeroU64::new(self.chunk_size)
            .or(NonZeroU64::new(DEFAULT_CHUNK_SIZE))
            .unwrap_or(NonZeroU64::MIN)
    }

    pub fn log_level(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }

    /// Configured headers; entries that are not valid HTTP headers are skipped.
    pub fn header_map(&self) -> HeaderMap {
        let mut header_map = HeaderMap::new();
        for (name, value) in &self.headers {
            match (HeaderName::try_from(name.as_str()), HeaderValue::try_from(value.as_str())) {
                (Ok(name), Ok(value)) => {
                    header_map.insert(name, value);
                }
                _ => warn!("Ignoring invalid header {}: {}", name, value),
            }
        }

        header_map
    }

    pub fn build_client(&self) -> reqwest::Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder()
            .danger_accept_invalid_certs(self.accept_invalid_certs);

        if let Some(secs) = self.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if self.use_browser_user_agent {
            builder = builder.user_agent(BROWSER_USER_AGENT);
        } else {
            builder = builder.user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")));
        }

        builder.build()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            worker_count: 0,
            chunk_size: DEFAULT_CHUNK_SIZE,
            verify_etag: DEFAULT_VERIFY_ETAG,
            accept_invalid_certs: false,
            request_timeout_secs: None,
            use_browser_user_agent: false,
            headers: HashMap::new(),
            download_dir: dirs::download_dir().unwrap_or_else(|| PathBuf::from(".")),
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}
