use crate::cli::commands::Cli;
use crate::network::{Client, ConnectTarget, SessionConfig, SessionOutcome};
use crate::protocol::WireConfig;
use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Client configuration, loadable from TOML and overridable from the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server hostname or IP address
    pub host: String,
    /// Server port (0 means not configured)
    pub port: u16,
    /// Wrap the connection in TLS
    pub tls: bool,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    pub write_timeout_secs: u64,
    /// Record sessions to `recording_dir`
    pub record: bool,
    pub recording_dir: PathBuf,
    /// Unbounded when absent
    pub max_dump_attempts: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 0,
            tls: false,
            connect_timeout_secs: 10,
            read_timeout_secs: 5,
            write_timeout_secs: 5,
            record: false,
            recording_dir: PathBuf::from("recordings"),
            max_dump_attempts: None,
        }
    }
}

impl Config {
    /// Get the default config directory
    pub fn default_config_dir() -> Result<PathBuf> {
        ProjectDirs::from("dev", "minitel", "minitel")
            .map(|proj_dirs| proj_dirs.config_dir().to_path_buf())
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
    }

    /// Get the default config file path
    pub fn default_config_file() -> Result<PathBuf> {
        Ok(Self::default_config_dir()?.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse configuration file {}", path.display()))
    }

    /// Load `explicit` if given, else the default config file if it exists,
    /// else built-in defaults.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        match Self::default_config_file() {
            Ok(path) if path.exists() => {
                debug!("Loading configuration from {}", path.display());
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;
        std::fs::write(path, content).context("Failed to write configuration file")?;
        Ok(())
    }

    /// Overlay command-line values on top of the loaded configuration.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(host) = &cli.host {
            self.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.port = port;
        }
        if cli.tls {
            self.tls = true;
        }
        if cli.record {
            self.record = true;
        }
        if let Some(dir) = &cli.recording_dir {
            self.recording_dir = dir.clone();
        }
        if let Some(timeout) = cli.timeout {
            self.read_timeout_secs = timeout;
            self.write_timeout_secs = timeout;
        }
        if cli.max_dump_attempts.is_some() {
            self.max_dump_attempts = cli.max_dump_attempts;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            bail!("No server host configured (use --host)");
        }
        if self.port == 0 {
            bail!("No server port configured (use --port)");
        }
        if self.connect_timeout_secs == 0 || self.read_timeout_secs == 0 || self.write_timeout_secs == 0 {
            bail!("Timeouts must be at least one second");
        }
        if self.max_dump_attempts == Some(0) {
            bail!("max_dump_attempts must be at least 1");
        }
        Ok(())
    }

    pub fn wire_config(&self) -> WireConfig {
        WireConfig::new(
            Duration::from_secs(self.read_timeout_secs),
            Duration::from_secs(self.write_timeout_secs),
        )
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            wire: self.wire_config(),
            max_dump_attempts: self.max_dump_attempts,
        }
    }

    pub fn connect_target(&self) -> ConnectTarget {
        ConnectTarget {
            host: self.host.clone(),
            port: self.port,
            tls: self.tls,
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
        }
    }
}

/// Resolve configuration from the CLI and run one full client session.
pub async fn run_client(cli: &Cli) -> Result<SessionOutcome> {
    let mut config =
        Config::load_or_default(cli.config.as_deref()).context("Failed to load configuration")?;
    config.apply_cli(cli);
    config.validate()?;

    info!(
        host = %config.host,
        port = config.port,
        tls = config.tls,
        record = config.record,
        "Starting MiniTel-Lite session"
    );

    let client = Client::new(config.connect_target(), config.session_config())
        .with_recording(config.record, config.recording_dir.clone());

    client
        .run()
        .await
        .with_context(|| format!("Session with {}:{} failed", config.host, config.port))
}
