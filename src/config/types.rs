use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub upload: UploadConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub encoder: EncoderConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding `index.html` for `GET /`
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    5000
}
fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
        }
    }
}

/// Scratch directories. Everything inside them is transient.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Delete leftovers from a previous run at startup
    #[serde(default = "default_true")]
    pub purge_on_start: bool,
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("converted")
}
fn default_true() -> bool {
    true
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            output_dir: default_output_dir(),
            purge_on_start: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadConfig {
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,

    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: u64,
}

fn default_allowed_extensions() -> Vec<String> {
    vidforge_common::paths::video_extensions()
        .iter()
        .map(|ext| ext.to_string())
        .collect()
}
const BYTES_PER_MB: u64 = 1024 * 1024;

fn default_max_upload_mb() -> u64 {
    100
}

impl UploadConfig {
    /// Upload ceiling in bytes, or `None` if the configured value overflows.
    pub fn checked_max_upload_bytes(&self) -> Option<u64> {
        self.max_upload_mb.checked_mul(BYTES_PER_MB)
    }

    /// Upload ceiling in bytes. Saturates on overflow; validated configs
    /// never reach that.
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_mb.saturating_mul(BYTES_PER_MB)
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: default_allowed_extensions(),
            max_upload_mb: default_max_upload_mb(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Uploads allowed per client within one window
    #[serde(default = "default_requests")]
    pub requests: u32,

    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// How often idle clients are evicted from the limiter
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_requests() -> u32 {
    5
}
fn default_window_secs() -> u64 {
    60
}
fn default_sweep_interval() -> u64 {
    60
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests: default_requests(),
            window_secs: default_window_secs(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EncoderConfig {
    /// Explicit encoder binary; `ffmpeg` on PATH when unset
    #[serde(default)]
    pub program: Option<PathBuf>,

    /// Kill the encoder after this many seconds (disabled when unset)
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Conversions allowed to run at once
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

fn default_max_concurrent() -> usize {
    num_cpus::get().max(1)
}

impl EncoderConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            program: None,
            timeout_secs: None,
            max_concurrent: default_max_concurrent(),
        }
    }
}
