//! Config - watchdog の設定
//!
//! JSON のキーは既存の watchdog オプション名に合わせています
//! （`host`, `port`, `password`, `redisOptions`, `pollInterval`, `stalledTimeout`）。
//! ストア固有オプションは `storeOptions` でも受け付けます。
//! 未指定のキーはデフォルト値で埋めます。

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 6379;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;
pub const DEFAULT_STALLED_TIMEOUT_MS: u64 = 10_000;

/// ConfigError は設定の読み込み・検証エラー
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// StoreConfig はストア接続パラメータ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    /// ストア実装固有の接続オプション（そのまま connector に渡す）
    #[serde(alias = "redisOptions")]
    pub store_options: serde_json::Map<String, serde_json::Value>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            password: None,
            store_options: serde_json::Map::new(),
        }
    }
}

/// WatchdogConfig は watchdog 1 インスタンス分の設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    #[serde(flatten)]
    pub store: StoreConfig,

    /// poll サイクル間隔（ms）
    #[serde(rename = "pollInterval")]
    pub poll_interval_ms: u64,

    /// 検証までの猶予であり、atomic 操作が stalled と判定する閾値（ms）
    #[serde(rename = "stalledTimeout")]
    pub stalled_timeout_ms: u64,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            stalled_timeout_ms: DEFAULT_STALLED_TIMEOUT_MS,
        }
    }
}

impl WatchdogConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: WatchdogConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = duration_to_ms(interval);
        self
    }

    pub fn with_stalled_timeout(mut self, timeout: Duration) -> Self {
        self.stalled_timeout_ms = duration_to_ms(timeout);
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.store.password = Some(password.into());
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn stalled_timeout(&self) -> Duration {
        Duration::from_millis(self.stalled_timeout_ms)
    }

    /// 起動前の検証（Fail-fast）
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.host.trim().is_empty() {
            return Err(ConfigError::Invalid("host must not be empty".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("pollInterval must be greater than 0".into()));
        }
        if self.stalled_timeout_ms == 0 {
            return Err(ConfigError::Invalid("stalledTimeout must be greater than 0".into()));
        }
        Ok(())
    }
}

fn duration_to_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
