//! WatchdogBuilder - watchdog の構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - observer をすべて登録してから起動する（最初のイベントを取りこぼさない）

use std::sync::Arc;

use crate::app::watchdog::Watchdog;
use crate::config::{ConfigError, WatchdogConfig};
use crate::domain::QueueTriple;
use crate::ports::{Clock, EventSink, FanoutSink, StoreConnector, SystemClock};

/// WatchdogBuilder は watchdog を構築
///
/// # 使用例
/// ```ignore
/// let watchdog = WatchdogBuilder::new("jobs", Arc::new(store))
///     .config(WatchdogConfig::default())
///     .sink(|event: &WatchdogEvent| println!("{}", event.name()))
///     .spawn()?;
/// ```
///
/// # Fail-fast 設計
/// - spawn() 時に設定を検証し、不正なら BuildError を返す
/// - ストア I/O は spawn() 後の非同期初期化で行う（spawn 自体はブロックしない）
pub struct WatchdogBuilder {
    queue: String,
    connector: Arc<dyn StoreConnector>,
    config: WatchdogConfig,
    clock: Arc<dyn Clock>,
    sinks: FanoutSink,
}

/// BuildError は watchdog 構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("queue name must not be empty")]
    EmptyQueueName,

    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),
}

impl WatchdogBuilder {
    pub fn new(queue: impl Into<String>, connector: Arc<dyn StoreConnector>) -> Self {
        Self {
            queue: queue.into(),
            connector,
            config: WatchdogConfig::default(),
            clock: Arc::new(SystemClock),
            sinks: FanoutSink::new(),
        }
    }

    pub fn config(mut self, config: WatchdogConfig) -> Self {
        self.config = config;
        self
    }

    /// atomic 操作に渡す `now` の取得元（デフォルトは SystemClock）
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// observer を登録（登録順に通知される）
    pub fn sink(self, sink: impl EventSink + 'static) -> Self {
        self.shared_sink(Arc::new(sink))
    }

    pub fn shared_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// 設定を検証して controller タスクを起動する
    ///
    /// tokio ランタイム上で呼ぶ必要があります。
    pub fn spawn(self) -> Result<Watchdog, BuildError> {
        if self.queue.trim().is_empty() {
            return Err(BuildError::EmptyQueueName);
        }
        self.config.validate()?;

        Ok(Watchdog::launch(
            QueueTriple::new(self.queue),
            self.config,
            self.connector,
            self.clock,
            self.sinks,
        ))
    }
}
