//! Verifier - 候補ごとの遅延検証
//!
//! poll で見つかった候補ごとに独立したタスクを起動し、
//! stalledTimeout だけ待ってから atomic verify-and-move を呼びます。
//! 結果（Verdict）は mpsc で controller に返し、イベント発行は controller が行います。
//!
//! # 独立性
//! - 候補ごとに別タスク（ある候補の遅延・失敗が他の候補を止めない）
//! - 判定はストアの現在状態に基づく（ローカルのタイマーは信用しない）

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::domain::{QueueTriple, StoreError, WorkId};
use crate::ports::{Clock, RequeueRequest, StoreClient};

/// Verdict は 1 回の検証結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// pending に戻した
    Requeued(WorkId),
    /// もう stalled ではない（解決済み・他インスタンスが回収済みなど）
    NotStalled(WorkId),
    /// atomic 操作が失敗した
    Failed { id: WorkId, error: StoreError },
    /// 猶予が明けた時点で接続が閉じていたため呼ばなかった
    Skipped(WorkId),
}

impl Verdict {
    pub fn from_result(id: WorkId, result: Result<Option<WorkId>, StoreError>) -> Self {
        match result {
            Ok(Some(moved)) => Verdict::Requeued(moved),
            Ok(None) => Verdict::NotStalled(id),
            Err(error) => Verdict::Failed { id, error },
        }
    }
}

/// atomic verify-and-move を 1 回呼んで結果を解釈する
pub async fn verify(
    client: &dyn StoreClient,
    queue: &QueueTriple,
    clock: &dyn Clock,
    stale_after: Duration,
    id: WorkId,
) -> Verdict {
    let request = RequeueRequest::new(queue, clock.now(), stale_after, id.clone());
    Verdict::from_result(id, client.requeue_stalled(request).await)
}

/// StallVerifier は候補ごとの遅延検証を予約する
pub struct StallVerifier {
    client: Arc<dyn StoreClient>,
    queue: Arc<QueueTriple>,
    clock: Arc<dyn Clock>,
    grace: Duration,
    verdicts: mpsc::UnboundedSender<Verdict>,
    closed: watch::Receiver<bool>,
}

impl StallVerifier {
    /// `closed` が true になった後に猶予が明けた検証はストアを呼ばずに Skipped になる
    pub fn new(
        client: Arc<dyn StoreClient>,
        queue: Arc<QueueTriple>,
        clock: Arc<dyn Clock>,
        grace: Duration,
        verdicts: mpsc::UnboundedSender<Verdict>,
        closed: watch::Receiver<bool>,
    ) -> Self {
        Self {
            client,
            queue,
            clock,
            grace,
            verdicts,
            closed,
        }
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }

    /// grace 後に 1 回だけ検証するタスクを起動
    pub fn schedule(&self, id: WorkId) -> JoinHandle<()> {
        let client = self.client.clone();
        let queue = self.queue.clone();
        let clock = self.clock.clone();
        let grace = self.grace;
        let verdicts = self.verdicts.clone();
        let closed = self.closed.clone();

        tokio::spawn(async move {
            sleep(grace).await;
            let is_closed = *closed.borrow();
            let verdict = if is_closed {
                Verdict::Skipped(id)
            } else {
                verify(client.as_ref(), &queue, clock.as_ref(), grace, id).await
            };
            // controller が終了済みなら結果の受け手はいない
            let _ = verdicts.send(verdict);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::impls::InMemoryStallStore;
    use crate::ports::{StoreConnector, TokioClock};
    use tokio::time::Instant;

    struct Fixture {
        store: InMemoryStallStore,
        verifier: StallVerifier,
        verdicts: mpsc::UnboundedReceiver<Verdict>,
        closed: watch::Sender<bool>,
        queue: Arc<QueueTriple>,
    }

    async fn fixture(stalled: &[&str], grace: Duration) -> Fixture {
        let clock: Arc<dyn Clock> = Arc::new(TokioClock::new());
        let store = InMemoryStallStore::new(clock.clone());
        let queue = Arc::new(QueueTriple::new("jobs"));
        for id in stalled {
            store.enqueue(&queue, WorkId::new(*id)).await;
            store.claim(&queue).await.unwrap();
            store.mark_stalled(&queue, &WorkId::new(*id)).await;
        }
        let client = store.connect(&StoreConfig::default()).await.unwrap().client;
        let (tx, verdicts) = mpsc::unbounded_channel();
        let (closed, closed_rx) = watch::channel(false);
        let verifier = StallVerifier::new(client, queue.clone(), clock, grace, tx, closed_rx);
        Fixture {
            store,
            verifier,
            verdicts,
            closed,
            queue,
        }
    }

    #[test]
    fn verdict_from_result() {
        let id = WorkId::new("w1");
        assert_eq!(
            Verdict::from_result(id.clone(), Ok(Some(id.clone()))),
            Verdict::Requeued(id.clone())
        );
        assert_eq!(
            Verdict::from_result(id.clone(), Ok(None)),
            Verdict::NotStalled(id.clone())
        );
        let failed = Verdict::from_result(id.clone(), Err(StoreError::Closed));
        assert_eq!(
            failed,
            Verdict::Failed {
                id: id.clone(),
                error: StoreError::Closed
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn verification_fires_after_grace_and_requeues() {
        let mut fx = fixture(&["w1"], Duration::from_secs(3)).await;
        let scheduled_at = Instant::now();

        fx.verifier.schedule(WorkId::new("w1"));
        let verdict = fx.verdicts.recv().await.unwrap();

        assert_eq!(verdict, Verdict::Requeued(WorkId::new("w1")));
        let calls = fx.store.requeue_calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].1 >= scheduled_at + Duration::from_secs(3));
        assert_eq!(
            fx.store.snapshot(&fx.queue).await.pending,
            vec![WorkId::new("w1")]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failing_candidate_does_not_affect_others() {
        let mut fx = fixture(&["w1", "w2"], Duration::from_secs(1)).await;
        fx.store
            .fail_next_requeue(StoreError::Command("NOSCRIPT".into()));

        fx.verifier.schedule(WorkId::new("w1"));
        fx.verifier.schedule(WorkId::new("w2"));
        let verdicts = [
            fx.verdicts.recv().await.unwrap(),
            fx.verdicts.recv().await.unwrap(),
        ];

        let failed = verdicts
            .iter()
            .filter(|v| matches!(v, Verdict::Failed { .. }))
            .count();
        let requeued = verdicts
            .iter()
            .filter(|v| matches!(v, Verdict::Requeued(_)))
            .count();
        assert_eq!((failed, requeued), (1, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_candidate_is_not_stalled() {
        let mut fx = fixture(&[], Duration::from_millis(10)).await;
        fx.verifier.schedule(WorkId::new("ghost"));
        assert_eq!(
            fx.verdicts.recv().await.unwrap(),
            Verdict::NotStalled(WorkId::new("ghost"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn closed_connection_skips_the_store_call() {
        let mut fx = fixture(&["w1"], Duration::from_secs(2)).await;
        fx.verifier.schedule(WorkId::new("w1"));

        tokio::time::sleep(Duration::from_secs(1)).await;
        fx.closed.send(true).unwrap();

        assert_eq!(
            fx.verdicts.recv().await.unwrap(),
            Verdict::Skipped(WorkId::new("w1"))
        );
        assert!(fx.store.requeue_calls().is_empty());
        assert_eq!(fx.verifier.grace(), Duration::from_secs(2));
    }
}
