//! stallwatch-core
//!
//! Core building blocks for the stalled-work watchdog.
//!
//! 分散キューのワーカーが処理途中で止まったアイテムを見つけ、
//! 猶予時間の後にストア側の atomic 操作で pending へ戻します。
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, queue, state, errors, events）
//! - **ports**: 抽象化レイヤー（StoreConnector, StoreClient, Clock, EventSink など）
//! - **app**: アプリケーションロジック（builder, watchdog, poll_loop, verifier, status）
//! - **impls**: 実装（InMemoryStallStore など開発用）
//! - **config**: JSON 設定の読み込みと検証

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;

pub use crate::app::{BuildError, Watchdog, WatchdogBuilder, WatchdogStatus};
pub use crate::config::{ConfigError, StoreConfig, WatchdogConfig};
pub use crate::domain::{WatchdogError, WatchdogEvent, WatchdogState, WorkId};
