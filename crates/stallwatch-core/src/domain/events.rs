//! Events - watchdog が発行するイベント
//!
//! このイベント集合が watchdog の観測可能な出力のすべてです。
//! 任意のイベント名は持たず、固定された型付き通知のみを扱います。

use crate::domain::errors::WatchdogError;
use crate::domain::ids::WorkId;

/// WatchdogEvent は EventSink に届けられる通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchdogEvent {
    /// ストア接続が確立した
    Ready,
    /// poll サイクルが始まった
    Polling,
    /// stalled だったワークを pending に戻した
    Requeued { id: WorkId },
    /// 失敗の報告（watchdog 自体は継続する）
    Fault { error: WatchdogError },
    /// shutdown 完了
    Ended,
}

impl WatchdogEvent {
    pub fn name(&self) -> &'static str {
        match self {
            WatchdogEvent::Ready => "ready",
            WatchdogEvent::Polling => "polling",
            WatchdogEvent::Requeued { .. } => "stalled requeued",
            WatchdogEvent::Fault { .. } => "error",
            WatchdogEvent::Ended => "end",
        }
    }

    pub fn requeued_id(&self) -> Option<&WorkId> {
        match self {
            WatchdogEvent::Requeued { id } => Some(id),
            _ => None,
        }
    }

    pub fn fault(&self) -> Option<&WatchdogError> {
        match self {
            WatchdogEvent::Fault { error } => Some(error),
            _ => None,
        }
    }
}
