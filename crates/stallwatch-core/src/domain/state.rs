//! State - watchdog のライフサイクル状態

use serde::{Deserialize, Serialize};

/// WatchdogState は watchdog のライフサイクル
///
/// # 状態遷移
/// - Init -> Ready -> Polling (cyclic) -> Stopping -> Stopped
/// - Init -> Stopping -> Stopped（接続失敗後に stop された場合）
/// - Stopped は終端（stop を何度呼んでも再実行しない）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchdogState {
    /// 接続確立中
    Init,
    /// 接続済み、最初の poll を開始する直前
    Ready,
    /// 定常状態
    Polling,
    /// stop 要求を受け、接続のクローズ待ち
    Stopping,
    /// 終端
    Stopped,
}

impl WatchdogState {
    pub fn is_terminal(self) -> bool {
        matches!(self, WatchdogState::Stopped)
    }

    /// stop が要求済みか（Stopping または Stopped）
    pub fn is_shutting_down(self) -> bool {
        matches!(self, WatchdogState::Stopping | WatchdogState::Stopped)
    }
}
