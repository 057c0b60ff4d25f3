//! Store port - 共有ストア（外部コラボレータ）
//!
//! watchdog がストアに要求するのは次の 3 つだけです。
//! 1. 任意のコレクションの list-read
//! 2. 名前付きの atomic verify-and-move（`requeue_stalled`）
//! 3. 接続ライフサイクル通知（ready / error / end）
//!
//! 接続の確立・認証・再接続の詳細は実装側の責務です。
//!
//! # 実装
//! - **InMemoryStallStore**: テスト・デモ用（`impls::inmem_store`）

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::StoreConfig;
use crate::domain::{QueueTriple, StoreError, WorkId};

/// ConnectionSignal は接続のライフサイクル通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionSignal {
    /// コマンドを受け付けられる状態になった
    Ready,
    /// 接続上で非同期にエラーが発生した
    Error(StoreError),
    /// 接続が閉じた（quit 完了、または切断）
    End,
}

/// Connection は確立済みの接続とそのライフサイクル通知
pub struct Connection {
    pub client: Arc<dyn StoreClient>,
    pub signals: mpsc::UnboundedReceiver<ConnectionSignal>,
}

/// RequeueRequest は atomic verify-and-move の引数
///
/// `(queueName, timeoutCollection, pendingCollection, stalledCollection,
///   nowTimestamp, staleThreshold, candidateId)` をそのまま型にしたもの。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequeueRequest {
    pub queue: String,
    pub timeout: String,
    pub pending: String,
    pub stalled: String,
    /// epoch millis
    pub now_ms: i64,
    pub stale_after_ms: u64,
    pub id: WorkId,
}

impl RequeueRequest {
    pub fn new(queue: &QueueTriple, now: DateTime<Utc>, stale_after: Duration, id: WorkId) -> Self {
        Self {
            queue: queue.name().to_owned(),
            timeout: queue.timeout().to_owned(),
            pending: queue.pending().to_owned(),
            stalled: queue.stalled().to_owned(),
            now_ms: now.timestamp_millis(),
            stale_after_ms: u64::try_from(stale_after.as_millis()).unwrap_or(u64::MAX),
            id,
        }
    }
}

/// StoreConnector はストアへの接続を開く
///
/// 接続直後に `ConnectionSignal::Ready` が届くとは限りません
/// （認証待ちなど）。watchdog は Ready を受け取ってから poll を始めます。
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(&self, config: &StoreConfig) -> Result<Connection, StoreError>;
}

/// StoreClient は接続済みストアへのコマンド
#[async_trait]
pub trait StoreClient: Send + Sync {
    async fn auth(&self, password: &str) -> Result<(), StoreError>;

    /// コレクション全体を読む（LRANGE 0 -1 相当）
    async fn read_list(&self, collection: &str) -> Result<Vec<WorkId>, StoreError>;

    /// 候補がいまも stalled なら timeout から pending へ移し、stalled から取り除く
    ///
    /// # 契約
    /// - 判定と移動は 1 つの不可分な操作
    /// - stalled でなければ何も変更せず `Ok(None)`
    /// - 移動した場合のみ `Ok(Some(id))`
    async fn requeue_stalled(&self, request: RequeueRequest) -> Result<Option<WorkId>, StoreError>;

    /// 穏やかに接続を閉じる（完了は `ConnectionSignal::End` で通知）
    async fn quit(&self);
}
