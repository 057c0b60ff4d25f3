//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせて watchdog のロジックを実装します。
//!
//! # 主要コンポーネント
//! - **WatchdogBuilder**: watchdog の構築とワイヤリング
//! - **Watchdog**: controller（ライフサイクルとイベント発行）とそのハンドル
//! - **PollScheduler**: 重ならない・タイマー駆動の poll ループ
//! - **StallVerifier**: 候補ごとの遅延検証
//! - **WatchdogStatus**: 稼働状況の集計ビュー

pub mod builder;
pub mod poll_loop;
pub mod status;
pub mod verifier;
pub mod watchdog;

// 主要な型を再エクスポート
pub use self::builder::{BuildError, WatchdogBuilder};
pub use self::poll_loop::{PollScheduler, PollTick};
pub use self::status::WatchdogStatus;
pub use self::verifier::{StallVerifier, Verdict};
pub use self::watchdog::Watchdog;
