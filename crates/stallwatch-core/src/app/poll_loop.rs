//! PollLoop - stalled コレクションのポーリング
//!
//! # フロー
//! 1. listening 中または stopping なら何もしない
//! 2. listening にして stalled コレクション全体を読む
//! 3. 読み取りが終わったら（成否に関わらず）listening を外し、pollInterval 後に次の poll を予約
//!
//! 同時に未完了の読み取りは常に高々 1 つです（`listening` スロット）。
//! stop 後は次の poll の予約を取り消し、新しい読み取りを発行しません。

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Sleep, sleep};

use crate::domain::{StoreError, WorkId};
use crate::ports::StoreClient;

type PendingRead = Pin<Box<dyn Future<Output = Result<Vec<WorkId>, StoreError>> + Send>>;

/// PollTick は PollScheduler::next() の結果
#[derive(Debug)]
pub enum PollTick {
    /// 次の poll の時刻になった
    Due,
    /// 読み取りが完了した（次の poll は予約済み）
    Read(Result<Vec<WorkId>, StoreError>),
}

/// PollScheduler は重ならない・タイマー駆動の poll ループ
///
/// controller の select ループから `next()` を待ち、
/// `PollTick::Due` を受け取ったら `poll()` を呼びます。
pub struct PollScheduler {
    collection: String,
    interval: Duration,
    listening: Option<PendingRead>,
    next_poll: Option<Pin<Box<Sleep>>>,
    stopping: bool,
}

impl PollScheduler {
    pub fn new(collection: impl Into<String>, interval: Duration) -> Self {
        Self {
            collection: collection.into(),
            interval,
            listening: None,
            next_poll: None,
            stopping: false,
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listening.is_some()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopping
    }

    pub fn is_armed(&self) -> bool {
        self.next_poll.is_some()
    }

    /// 読み取りを発行する。発行した場合のみ true（呼び出し側が `Polling` を通知する）
    pub fn poll(&mut self, client: &Arc<dyn StoreClient>) -> bool {
        if self.stopping || self.listening.is_some() {
            return false;
        }
        self.next_poll = None;

        let client = client.clone();
        let collection = self.collection.clone();
        self.listening = Some(Box::pin(async move { client.read_list(&collection).await }));
        true
    }

    /// 次の poll 予約を取り消し、以後の poll を拒否する
    ///
    /// 実行中の読み取りはそのまま完了させます。
    pub fn stop(&mut self) {
        self.stopping = true;
        self.next_poll = None;
    }

    /// 読み取りの完了、または次の poll の時刻を待つ
    ///
    /// どちらも無ければ永久に待機します。cancel safe（select で drop されても状態は失われない）。
    pub async fn next(&mut self) -> PollTick {
        if let Some(read) = self.listening.as_mut() {
            let result = read.await;
            self.listening = None;
            if !self.stopping {
                self.next_poll = Some(Box::pin(sleep(self.interval)));
            }
            return PollTick::Read(result);
        }

        if let Some(timer) = self.next_poll.as_mut() {
            timer.await;
            self.next_poll = None;
            return PollTick::Due;
        }

        std::future::pending().await
    }
}
