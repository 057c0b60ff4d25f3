//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! 共有ストア・時刻・イベント購読者など、watchdog の外側にあるものは
//! すべてここの trait 越しに扱います。
//!
//! # 設計原則
//! - ストアが source of truth（watchdog はローカルに状態を持ち越さない）
//! - atomic verify-and-move の中身は問わない（入出力の契約のみ）

pub mod clock;
pub mod event_sink;
pub mod id_generator;
pub mod store;

// 主要な trait を再エクスポート
pub use self::clock::{Clock, FixedClock, SystemClock, TokioClock};
pub use self::event_sink::{ChannelSink, EventSink, FanoutSink};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::store::{Connection, ConnectionSignal, RequeueRequest, StoreClient, StoreConnector};
