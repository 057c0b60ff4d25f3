//! Errors - エラー型と分類
//!
//! # 分類
//! - **StoreError**: ストア（外部コラボレータ）が返す失敗
//! - **WatchdogError**: watchdog が `Fault` イベントとして報告する失敗
//!
//! すべての失敗はイベントとして報告され、同期的に投げられることはありません。

use thiserror::Error;

use crate::domain::ids::WorkId;

/// StoreError はストア操作の失敗
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("connection is closed")]
    Closed,

    #[error("command failed: {0}")]
    Command(String),

    /// 複数の失敗をまとめたもの（pipeline や script の一括エラー）
    #[error("{} store errors", .0.len())]
    Batch(Vec<StoreError>),
}

impl StoreError {
    /// Batch を再帰的に展開して葉のエラーだけを返す
    pub fn flatten(self) -> Vec<StoreError> {
        match self {
            StoreError::Batch(errors) => errors.into_iter().flat_map(StoreError::flatten).collect(),
            other => vec![other],
        }
    }
}

/// WatchdogError は watchdog が観測した失敗
///
/// # 分類
/// - Connect: 接続確立の失敗
/// - Connection: 接続上で非同期に発生したエラー
/// - Disconnected: stop 要求なしに接続が終了した
/// - Poll: stalled コレクションの読み取り失敗
/// - Requeue: atomic verify-and-move の失敗
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WatchdogError {
    #[error("failed to connect to store: {0}")]
    Connect(#[source] StoreError),

    #[error("store connection error: {0}")]
    Connection(#[source] StoreError),

    #[error("store connection ended unexpectedly")]
    Disconnected,

    #[error("failed to read {collection}: {source}")]
    Poll {
        collection: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to verify stalled item {id}: {source}")]
    Requeue {
        id: WorkId,
        #[source]
        source: StoreError,
    },
}

impl WatchdogError {
    /// 内包する StoreError が Batch の場合、葉ごとに同じ種類の WatchdogError へ展開
    pub fn expand(self) -> Vec<WatchdogError> {
        match self {
            WatchdogError::Connect(source) => {
                source.flatten().into_iter().map(WatchdogError::Connect).collect()
            }
            WatchdogError::Connection(source) => {
                source.flatten().into_iter().map(WatchdogError::Connection).collect()
            }
            WatchdogError::Poll { collection, source } => source
                .flatten()
                .into_iter()
                .map(|source| WatchdogError::Poll {
                    collection: collection.clone(),
                    source,
                })
                .collect(),
            WatchdogError::Requeue { id, source } => source
                .flatten()
                .into_iter()
                .map(|source| WatchdogError::Requeue {
                    id: id.clone(),
                    source,
                })
                .collect(),
            WatchdogError::Disconnected => vec![WatchdogError::Disconnected],
        }
    }
}
