use crate::error::{Error, Result};
use serde::Deserialize;
use std::{path::PathBuf, time::Duration};

/// Name of the optional config file looked up in the working directory
/// (`startup-timing.toml`, `.yaml` or `.json`)
pub const CONFIG_FILE: &str = "startup-timing";

/// Highest endpoint port a generated container may use
const MAX_PORT: i64 = 65535;

/// Parameters of a benchmark run. Every field has a fixed default; a config file only
/// needs to name the values it overrides.
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct BenchmarkConfig {
    /// Name of the DevWorkspace created for every trial
    pub workspace_name: String,

    /// Namespace the DevWorkspace lives in
    pub workspace_namespace: String,

    /// Image used by every generated container component
    pub container_image: String,

    /// Memory limit of every generated container component
    pub container_memory_limit: String,

    /// Container counts run from 1 up to and including this value
    pub max_containers: usize,

    /// Trials per container count
    pub iterations: usize,

    /// File the timing records are appended to
    pub log_path: PathBuf,

    /// Delay between status polls while the workspace is starting
    pub poll_interval_ms: u64,

    /// Consecutive fetch errors tolerated while polling; 0 retries forever
    pub max_fetch_errors: u32,

    /// Polls that may still see a deleted workspace before giving up; 0 waits forever
    pub max_deletion_polls: u32,

    /// First endpoint port; container `i` listens on `base_port + i`
    pub base_port: i32,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            workspace_name: "timing-test".to_string(),
            workspace_namespace: "timing-test".to_string(),
            container_image: "quay.io/eclipse/che-nodejs10-ubi:nightly".to_string(),
            container_memory_limit: "32Mi".to_string(),
            max_containers: 10,
            iterations: 10,
            log_path: PathBuf::from("startup.log"),
            poll_interval_ms: 1000,
            max_fetch_errors: 100,
            max_deletion_polls: 300,
            base_port: 8080,
        }
    }
}

impl BenchmarkConfig {
    /// Load the defaults, overlaid with `startup-timing.*` if present
    pub fn load() -> Result<Self> {
        Self::load_from(CONFIG_FILE)
    }

    pub fn load_from(name: &str) -> Result<Self> {
        let config: Self = ::config::Config::builder()
            .add_source(::config::File::with_name(name).required(false))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn fetch_error_limit(&self) -> Option<u32> {
        (self.max_fetch_errors > 0).then_some(self.max_fetch_errors)
    }

    pub fn deletion_poll_limit(&self) -> Option<u32> {
        (self.max_deletion_polls > 0).then_some(self.max_deletion_polls)
    }

    /// Total number of trials a full run performs
    pub fn total_trials(&self) -> usize {
        self.max_containers * self.iterations
    }

    pub fn validate(&self) -> Result<()> {
        if self.workspace_name.is_empty() || self.workspace_namespace.is_empty() {
            return Err(Error::InvalidConfig(
                "workspace_name and workspace_namespace must not be empty".to_string(),
            ));
        }
        if self.container_image.is_empty() {
            return Err(Error::InvalidConfig(
                "container_image must not be empty".to_string(),
            ));
        }
        if self.max_containers == 0 {
            return Err(Error::InvalidConfig(
                "max_containers must be at least 1".to_string(),
            ));
        }
        if self.iterations == 0 {
            return Err(Error::InvalidConfig(
                "iterations must be at least 1".to_string(),
            ));
        }
        if self.base_port < 1 {
            return Err(Error::InvalidConfig(format!(
                "base_port {} is not a valid port",
                self.base_port
            )));
        }
        let highest_port = i64::from(self.base_port) + self.max_containers as i64 - 1;
        if highest_port > MAX_PORT {
            return Err(Error::InvalidConfig(format!(
                "base_port {} with {} containers exceeds port {}",
                self.base_port, self.max_containers, MAX_PORT
            )));
        }
        Ok(())
    }
}
