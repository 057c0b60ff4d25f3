//! Impls - ports の実装（開発用・テスト用）
//!
//! # 含まれる実装
//! - **InMemoryStallStore**: 共有ストアのインメモリ版（StoreConnector + StoreClient）
//!
//! # 本番用実装
//! 本番のストア接続は別クレートに置く想定です。watchdog は
//! `StoreConnector` を受け取るだけなので、ここへの依存は持ちません。

pub mod inmem_store;

pub use self::inmem_store::{InMemoryOptions, InMemoryStallStore, QueueSnapshot};
