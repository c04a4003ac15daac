//! Service configuration.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Configuration for the call tracking service.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The timeout for establishing a connection to a vendor endpoint.
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// The total timeout for a single vendor request, including the response body.
    ///
    /// The cache never times out a pending entry on its own; this is the only
    /// timeout policy applied to a fetch.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// The maximum accepted size of a vendor response body, in bytes.
    ///
    /// Vendor responses are tiny JSON documents; anything larger is rejected
    /// rather than buffered.
    pub max_response_size: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            connect_timeout: Duration::from_secs(1),
            request_timeout: Duration::from_secs(30),
            max_response_size: 64 * 1024,
        }
    }
}

impl Config {
    /// Loads the configuration from the given YAML file, or the defaults if
    /// no path is given.
    pub fn get(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_reader(
                fs::File::open(path).context("failed to open configuration file")?,
            ),
            None => Ok(Config::default()),
        }
    }

    fn from_reader(mut reader: impl std::io::Read) -> Result<Self> {
        let mut config = String::new();
        reader
            .read_to_string(&mut config)
            .context("failed reading config file")?;
        // check for empty files explicitly
        if config.trim().is_empty() {
            anyhow::bail!("config file empty");
        }
        serde_yaml::from_str(&config).context("failed to parse config YAML")
    }
}
