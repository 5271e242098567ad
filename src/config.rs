use anyhow::{Context, Result};
use facecount_sensor::registers::{DEFAULT_ADDRESS, MAX_ADDRESS};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::boot::BootPolicy;

pub static CONFIG_PATH: Lazy<&'static Path> = Lazy::new(|| {
    Path::new(option_env!("FACECOUNT_CONFIG_PATH").unwrap_or("/usr/local/etc/facecount/config.toml"))
});

pub static STATE_PREFIX: Lazy<PathBuf> = Lazy::new(|| {
    match option_env!("FACECOUNT_STATE_PREFIX") {
        Some(prefix) => PathBuf::from(prefix),
        None => directories::ProjectDirs::from("", "", "facecount")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("/var/lib/facecount")),
    }
});

/// How the module is wired to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Transport {
    I2c { bus: String, address: u8 },
    Uart { port: String, baud: u32, address: u8 },
}

impl Transport {
    pub fn address(&self) -> u8 {
        match self {
            Transport::I2c { address, .. } | Transport::Uart { address, .. } => *address,
        }
    }
}

impl Default for Transport {
    fn default() -> Self {
        Transport::Uart {
            port: "/dev/ttyAMA0".to_string(),
            baud: 9600,
            address: DEFAULT_ADDRESS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub transport: Transport,
    pub response_timeout_ms: u64,
    pub warmup_secs: u64,
    pub begin_retry_ms: u64,
    pub begin_max_attempts: Option<u32>,
    pub poll_interval_ms: u64,
    pub face_threshold: u16,
    pub gesture_threshold: u16,
    pub detect_range: u16,
    pub report_interval_secs: u64,
    pub state_path: Option<PathBuf>,
    pub report_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transport: Transport::default(),
            response_timeout_ms: 100,
            warmup_secs: 5,
            begin_retry_ms: 1000,
            begin_max_attempts: None,
            poll_interval_ms: 500,
            face_threshold: 60,
            gesture_threshold: 60,
            detect_range: 100,
            report_interval_secs: 3600,
            state_path: None,
            report_path: None,
        }
    }
}

impl Config {
    pub fn boot_policy(&self) -> BootPolicy {
        BootPolicy {
            warmup: Duration::from_secs(self.warmup_secs),
            retry_interval: Duration::from_millis(self.begin_retry_ms),
            max_attempts: self.begin_max_attempts,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn state_path(&self) -> PathBuf {
        self.state_path
            .clone()
            .unwrap_or_else(|| STATE_PREFIX.join("state.bin"))
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("face_threshold", self.face_threshold),
            ("gesture_threshold", self.gesture_threshold),
            ("detect_range", self.detect_range),
        ] {
            if value > 100 {
                anyhow::bail!("{} must be within 0..=100, got {}", name, value);
            }
        }
        let address = self.transport.address();
        if address == 0 || address > MAX_ADDRESS {
            anyhow::bail!(
                "transport address must be within 0x01..={:#04x}, got {:#04x}",
                MAX_ADDRESS,
                address
            );
        }
        if self.report_interval_secs == 0 {
            anyhow::bail!("report_interval_secs must be positive");
        }
        Ok(())
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.unwrap_or(&CONFIG_PATH);
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config at {}", path.display()))?;
    let cfg: Config =
        toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

pub fn save_config(cfg: &Config, path: Option<&Path>) -> Result<()> {
    let path = path.unwrap_or(&CONFIG_PATH);
    let data = toml::to_string_pretty(cfg)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, data)?;
    Ok(())
}
