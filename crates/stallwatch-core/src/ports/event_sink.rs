//! EventSink port - watchdog イベントの購読
//!
//! 動的なイベント名登録の代わりに、型付きの WatchdogEvent を受け取る
//! 明示的な observer インターフェースを提供します。
//!
//! # 実装
//! - クロージャ（`Fn(&WatchdogEvent)`）はそのまま EventSink になる
//! - **ChannelSink**: tokio mpsc へ転送（テスト・非同期な購読者向け）
//! - **FanoutSink**: 複数の sink へ配信

use std::sync::Arc;
use tokio::sync::mpsc;

use crate::domain::events::WatchdogEvent;

/// EventSink は watchdog から通知を受け取る
///
/// # 設計原則
/// - 同期・非ブロッキング（controller のループ上で呼ばれる）
/// - 失敗を返さない（購読者側の問題で watchdog を止めない）
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &WatchdogEvent);
}

impl<F> EventSink for F
where
    F: Fn(&WatchdogEvent) + Send + Sync,
{
    fn emit(&self, event: &WatchdogEvent) {
        self(event)
    }
}

/// ChannelSink はイベントを unbounded mpsc に流す
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<WatchdogEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<WatchdogEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: &WatchdogEvent) {
        // receiver が drop 済みなら購読をやめただけ
        let _ = self.tx.send(event.clone());
    }
}

/// FanoutSink は登録順にすべての sink へ配信
#[derive(Clone, Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn push(&mut self, sink: Arc<dyn EventSink>) {
        self.sinks.push(sink);
    }
}

impl EventSink for FanoutSink {
    fn emit(&self, event: &WatchdogEvent) {
        for sink in &self.sinks {
            sink.emit(event);
        }
    }
}
