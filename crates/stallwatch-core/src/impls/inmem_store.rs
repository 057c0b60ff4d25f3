//! InMemoryStallStore - 開発・テスト用の共有ストア
//!
//! # 学習ポイント
//! - 1 つのロックの中で判定と移動を行うことで atomic verify-and-move を実現
//! - 接続ごとのライフサイクル通知（Ready / Error / End）を mpsc で表現
//! - 障害注入（読み取り失敗・接続エラー・切断）でテストから異常系を再現
//!
//! # データ表現
//! - pending / stalled: `VecDeque<WorkId>`（list）
//! - timeout: `WorkId -> 最終アクティビティ時刻 (epoch ms)`（claim と heartbeat で更新）
//!
//! stalled はマーキングであり、stalled に載っている間もアイテムは timeout に残ります。

use async_trait::async_trait;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio::time::Instant;

use crate::config::StoreConfig;
use crate::domain::{QueueTriple, StoreError, WorkId};
use crate::ports::{
    Clock, Connection, ConnectionSignal, RequeueRequest, StoreClient, StoreConnector,
};

/// InMemoryOptions はストアの振る舞い（遅延・認証・接続拒否）
#[derive(Debug, Clone, Default)]
pub struct InMemoryOptions {
    /// 設定されている場合、auth が成功するまで Ready を送らない
    pub password: Option<String>,
    /// list-read ごとの人工的な遅延
    pub read_delay: Duration,
    /// quit から End 通知までの遅延
    pub close_delay: Duration,
    /// true なら connect を常に失敗させる
    pub refuse_connections: bool,
}

/// QueueSnapshot はあるキューの 3 コレクションの中身
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueSnapshot {
    pub pending: Vec<WorkId>,
    /// ID 順にソート済み
    pub in_flight: Vec<WorkId>,
    pub stalled: Vec<WorkId>,
}

#[derive(Default)]
struct StoreState {
    lists: HashMap<String, VecDeque<WorkId>>,
    leases: HashMap<String, HashMap<WorkId, i64>>,
}

impl StoreState {
    fn read(&self, collection: &str) -> Vec<WorkId> {
        if let Some(list) = self.lists.get(collection) {
            return list.iter().cloned().collect();
        }
        let mut ids: Vec<WorkId> = self
            .leases
            .get(collection)
            .map(|leases| leases.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    /// atomic verify-and-move 本体（呼び出し側がロックを保持している前提）
    fn requeue_if_stale(&mut self, req: &RequeueRequest) -> Option<WorkId> {
        let is_marked = self
            .lists
            .get(&req.stalled)
            .is_some_and(|stalled| stalled.contains(&req.id));
        if !is_marked {
            return None;
        }

        let last_seen = *self.leases.get(&req.timeout)?.get(&req.id)?;
        let idle_ms = req.now_ms.saturating_sub(last_seen);
        if idle_ms < 0 || (idle_ms as u64) < req.stale_after_ms {
            return None;
        }

        self.leases.get_mut(&req.timeout)?.remove(&req.id);
        if let Some(stalled) = self.lists.get_mut(&req.stalled) {
            stalled.retain(|id| id != &req.id);
        }
        self.lists
            .entry(req.pending.clone())
            .or_default()
            .push_back(req.id.clone());
        Some(req.id.clone())
    }
}

#[derive(Default)]
struct Faults {
    reads: VecDeque<StoreError>,
    requeues: VecDeque<StoreError>,
}

#[derive(Default)]
struct Metrics {
    quits: usize,
    reads: usize,
    reads_in_flight: usize,
    max_reads_in_flight: usize,
    requeue_calls: Vec<(WorkId, Instant)>,
}

/// 接続 1 本分の状態
struct Link {
    signals: mpsc::UnboundedSender<ConnectionSignal>,
    closed: AtomicBool,
    authenticated: AtomicBool,
}

impl Link {
    fn signal(&self, signal: ConnectionSignal) {
        // watchdog 側が drop 済みなら通知先がないだけ
        let _ = self.signals.send(signal);
    }
}

struct Inner {
    state: Mutex<StoreState>,
    clock: Arc<dyn Clock>,
    options: InMemoryOptions,
    faults: std::sync::Mutex<Faults>,
    metrics: std::sync::Mutex<Metrics>,
    links: std::sync::Mutex<Vec<Arc<Link>>>,
}

fn lock<T>(mutex: &std::sync::Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// InMemoryStallStore は複数の watchdog から共有できるストア
///
/// # 使用例
/// ```ignore
/// let store = InMemoryStallStore::new(Arc::new(SystemClock));
/// store.enqueue(&queue, WorkId::new("w1")).await;
/// let id = store.claim(&queue).await;
/// store.mark_stalled(&queue, &WorkId::new("w1")).await;
/// ```
#[derive(Clone)]
pub struct InMemoryStallStore {
    inner: Arc<Inner>,
}

impl InMemoryStallStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_options(clock, InMemoryOptions::default())
    }

    pub fn with_options(clock: Arc<dyn Clock>, options: InMemoryOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(StoreState::default()),
                clock,
                options,
                faults: std::sync::Mutex::new(Faults::default()),
                metrics: std::sync::Mutex::new(Metrics::default()),
                links: std::sync::Mutex::new(Vec::new()),
            }),
        }
    }

    fn now_ms(&self) -> i64 {
        self.inner.clock.now().timestamp_millis()
    }

    // ========================================
    // ワーカー側の操作（ストア状態の準備用）
    // ========================================

    pub async fn enqueue(&self, queue: &QueueTriple, id: WorkId) {
        let mut state = self.inner.state.lock().await;
        state
            .lists
            .entry(queue.pending().to_owned())
            .or_default()
            .push_back(id);
    }

    /// pending の先頭を取り出して in-flight にする
    pub async fn claim(&self, queue: &QueueTriple) -> Option<WorkId> {
        let now = self.now_ms();
        let mut state = self.inner.state.lock().await;
        let id = state.lists.get_mut(queue.pending())?.pop_front()?;
        state
            .leases
            .entry(queue.timeout().to_owned())
            .or_default()
            .insert(id.clone(), now);
        Some(id)
    }

    /// in-flight のアイテムの最終アクティビティ時刻を更新
    pub async fn heartbeat(&self, queue: &QueueTriple, id: &WorkId) -> bool {
        let now = self.now_ms();
        let mut state = self.inner.state.lock().await;
        match state
            .leases
            .get_mut(queue.timeout())
            .and_then(|leases| leases.get_mut(id))
        {
            Some(last_seen) => {
                *last_seen = now;
                true
            }
            None => false,
        }
    }

    /// in-flight のアイテムを stalled としてマークする
    pub async fn mark_stalled(&self, queue: &QueueTriple, id: &WorkId) -> bool {
        let mut state = self.inner.state.lock().await;
        let in_flight = state
            .leases
            .get(queue.timeout())
            .is_some_and(|leases| leases.contains_key(id));
        if !in_flight {
            return false;
        }
        let stalled = state.lists.entry(queue.stalled().to_owned()).or_default();
        if !stalled.contains(id) {
            stalled.push_back(id.clone());
        }
        true
    }

    /// ワーカーが処理を終えた（timeout と stalled の両方から外す）
    pub async fn complete(&self, queue: &QueueTriple, id: &WorkId) -> bool {
        let mut state = self.inner.state.lock().await;
        let removed = state
            .leases
            .get_mut(queue.timeout())
            .and_then(|leases| leases.remove(id))
            .is_some();
        if let Some(stalled) = state.lists.get_mut(queue.stalled()) {
            stalled.retain(|x| x != id);
        }
        removed
    }

    pub async fn snapshot(&self, queue: &QueueTriple) -> QueueSnapshot {
        let state = self.inner.state.lock().await;
        QueueSnapshot {
            pending: state.read(queue.pending()),
            in_flight: state.read(queue.timeout()),
            stalled: state.read(queue.stalled()),
        }
    }

    // ========================================
    // 障害注入
    // ========================================

    pub fn fail_next_read(&self, error: StoreError) {
        lock(&self.inner.faults).reads.push_back(error);
    }

    pub fn fail_next_requeue(&self, error: StoreError) {
        lock(&self.inner.faults).requeues.push_back(error);
    }

    /// End をまだ送っていない接続すべてに非同期エラーを通知
    ///
    /// quit 済みで End を待っている接続にも届きます。
    pub fn emit_connection_error(&self, error: StoreError) {
        for link in lock(&self.inner.links).iter() {
            link.signal(ConnectionSignal::Error(error.clone()));
        }
    }

    /// quit なしに全接続を切断する
    pub fn drop_connections(&self) {
        for link in lock(&self.inner.links).drain(..) {
            if !link.closed.swap(true, Ordering::SeqCst) {
                link.signal(ConnectionSignal::End);
            }
        }
    }

    /// End を送った接続は通知対象から外す
    fn release(&self, link: &Arc<Link>) {
        lock(&self.inner.links).retain(|open| !Arc::ptr_eq(open, link));
    }

    // ========================================
    // 観測用
    // ========================================

    pub fn quit_count(&self) -> usize {
        lock(&self.inner.metrics).quits
    }

    pub fn read_count(&self) -> usize {
        lock(&self.inner.metrics).reads
    }

    /// 同時に実行中だった list-read の最大数
    pub fn max_concurrent_reads(&self) -> usize {
        lock(&self.inner.metrics).max_reads_in_flight
    }

    /// requeue_stalled が呼ばれた ID と時刻（tokio::time::Instant）
    pub fn requeue_calls(&self) -> Vec<(WorkId, Instant)> {
        lock(&self.inner.metrics).requeue_calls.clone()
    }
}

#[async_trait]
impl StoreConnector for InMemoryStallStore {
    async fn connect(&self, config: &StoreConfig) -> Result<Connection, StoreError> {
        if self.inner.options.refuse_connections {
            return Err(StoreError::Connection(format!(
                "{}:{} refused the connection",
                config.host, config.port
            )));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let needs_auth = self.inner.options.password.is_some();
        let link = Arc::new(Link {
            signals: tx,
            closed: AtomicBool::new(false),
            authenticated: AtomicBool::new(!needs_auth),
        });
        if !needs_auth {
            link.signal(ConnectionSignal::Ready);
        }
        lock(&self.inner.links).push(link.clone());

        Ok(Connection {
            client: Arc::new(InMemoryClient {
                store: self.clone(),
                link,
            }),
            signals: rx,
        })
    }
}

/// 1 接続分のクライアント
struct InMemoryClient {
    store: InMemoryStallStore,
    link: Arc<Link>,
}

impl InMemoryClient {
    fn ensure_usable(&self) -> Result<(), StoreError> {
        if self.link.closed.load(Ordering::SeqCst) {
            return Err(StoreError::Closed);
        }
        if !self.link.authenticated.load(Ordering::SeqCst) {
            return Err(StoreError::Auth("NOAUTH authentication required".into()));
        }
        Ok(())
    }
}

/// 実行中の list-read を数えるガード
struct ReadInFlight<'a> {
    metrics: &'a std::sync::Mutex<Metrics>,
}

impl<'a> ReadInFlight<'a> {
    fn enter(metrics: &'a std::sync::Mutex<Metrics>) -> Self {
        let mut m = lock(metrics);
        m.reads += 1;
        m.reads_in_flight += 1;
        m.max_reads_in_flight = m.max_reads_in_flight.max(m.reads_in_flight);
        Self { metrics }
    }
}

impl Drop for ReadInFlight<'_> {
    fn drop(&mut self) {
        lock(self.metrics).reads_in_flight -= 1;
    }
}

#[async_trait]
impl StoreClient for InMemoryClient {
    async fn auth(&self, password: &str) -> Result<(), StoreError> {
        if self.link.closed.load(Ordering::SeqCst) {
            return Err(StoreError::Closed);
        }
        match &self.store.inner.options.password {
            Some(expected) if expected != password => {
                Err(StoreError::Auth("invalid password".into()))
            }
            _ => {
                if !self.link.authenticated.swap(true, Ordering::SeqCst) {
                    self.link.signal(ConnectionSignal::Ready);
                }
                Ok(())
            }
        }
    }

    async fn read_list(&self, collection: &str) -> Result<Vec<WorkId>, StoreError> {
        self.ensure_usable()?;
        let inner = &self.store.inner;
        let _in_flight = ReadInFlight::enter(&inner.metrics);

        if !inner.options.read_delay.is_zero() {
            tokio::time::sleep(inner.options.read_delay).await;
        }
        if let Some(error) = lock(&inner.faults).reads.pop_front() {
            return Err(error);
        }

        let state = inner.state.lock().await;
        Ok(state.read(collection))
    }

    async fn requeue_stalled(&self, request: RequeueRequest) -> Result<Option<WorkId>, StoreError> {
        self.ensure_usable()?;
        let inner = &self.store.inner;
        lock(&inner.metrics)
            .requeue_calls
            .push((request.id.clone(), Instant::now()));

        if let Some(error) = lock(&inner.faults).requeues.pop_front() {
            return Err(error);
        }

        let mut state = inner.state.lock().await;
        Ok(state.requeue_if_stale(&request))
    }

    async fn quit(&self) {
        if self.link.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        lock(&self.store.inner.metrics).quits += 1;

        let delay = self.store.inner.options.close_delay;
        if delay.is_zero() {
            self.link.signal(ConnectionSignal::End);
            self.store.release(&self.link);
            return;
        }
        let store = self.store.clone();
        let link = self.link.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            link.signal(ConnectionSignal::End);
            store.release(&link);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::TokioClock;

    fn queue() -> QueueTriple {
        QueueTriple::new("jobs")
    }

    async fn store_with_stalled(ids: &[&str]) -> (InMemoryStallStore, Arc<dyn Clock>) {
        let clock: Arc<dyn Clock> = Arc::new(TokioClock::new());
        let store = InMemoryStallStore::new(clock.clone());
        let q = queue();
        for id in ids {
            store.enqueue(&q, WorkId::new(*id)).await;
            store.claim(&q).await.unwrap();
            assert!(store.mark_stalled(&q, &WorkId::new(*id)).await);
        }
        (store, clock)
    }

    async fn connect(store: &InMemoryStallStore) -> Connection {
        store.connect(&StoreConfig::default()).await.unwrap()
    }

    fn request(clock: &Arc<dyn Clock>, id: &str, stale_after: Duration) -> RequeueRequest {
        RequeueRequest::new(&queue(), clock.now(), stale_after, WorkId::new(id))
    }

    #[tokio::test(start_paused = true)]
    async fn requeue_moves_item_once_stale() {
        let (store, clock) = store_with_stalled(&["w1"]).await;
        let conn = connect(&store).await;

        tokio::time::sleep(Duration::from_secs(3)).await;
        let moved = conn
            .client
            .requeue_stalled(request(&clock, "w1", Duration::from_secs(3)))
            .await
            .unwrap();

        assert_eq!(moved, Some(WorkId::new("w1")));
        let snapshot = store.snapshot(&queue()).await;
        assert_eq!(snapshot.pending, vec![WorkId::new("w1")]);
        assert!(snapshot.in_flight.is_empty());
        assert!(snapshot.stalled.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn requeue_leaves_fresh_item_untouched() {
        let (store, clock) = store_with_stalled(&["w1"]).await;
        let conn = connect(&store).await;

        tokio::time::sleep(Duration::from_secs(2)).await;
        store.heartbeat(&queue(), &WorkId::new("w1")).await;
        tokio::time::sleep(Duration::from_secs(2)).await;

        let moved = conn
            .client
            .requeue_stalled(request(&clock, "w1", Duration::from_secs(3)))
            .await
            .unwrap();

        assert_eq!(moved, None);
        let snapshot = store.snapshot(&queue()).await;
        assert!(snapshot.pending.is_empty());
        assert_eq!(snapshot.in_flight, vec![WorkId::new("w1")]);
        assert_eq!(snapshot.stalled, vec![WorkId::new("w1")]);
    }

    #[tokio::test(start_paused = true)]
    async fn requeue_ignores_completed_and_unmarked_items() {
        let (store, clock) = store_with_stalled(&["done"]).await;
        let q = queue();
        store.enqueue(&q, WorkId::new("busy")).await;
        store.claim(&q).await.unwrap();
        assert!(store.complete(&q, &WorkId::new("done")).await);
        let conn = connect(&store).await;

        tokio::time::sleep(Duration::from_secs(10)).await;
        for id in ["done", "busy", "unknown"] {
            let moved = conn
                .client
                .requeue_stalled(request(&clock, id, Duration::from_secs(1)))
                .await
                .unwrap();
            assert_eq!(moved, None, "{id} must not be requeued");
        }
        assert_eq!(store.snapshot(&q).await.in_flight, vec![WorkId::new("busy")]);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_requeues_move_an_item_at_most_once() {
        let (store, clock) = store_with_stalled(&["w1"]).await;
        let a = connect(&store).await;
        let b = connect(&store).await;
        tokio::time::sleep(Duration::from_secs(5)).await;

        let (ra, rb) = tokio::join!(
            a.client
                .requeue_stalled(request(&clock, "w1", Duration::from_secs(1))),
            b.client
                .requeue_stalled(request(&clock, "w1", Duration::from_secs(1))),
        );

        let moved: Vec<_> = [ra.unwrap(), rb.unwrap()].into_iter().flatten().collect();
        assert_eq!(moved, vec![WorkId::new("w1")]);
        assert_eq!(store.snapshot(&queue()).await.pending, vec![WorkId::new("w1")]);
    }

    #[tokio::test]
    async fn read_list_returns_stalled_in_order() {
        let (store, _clock) = store_with_stalled(&["w2", "w1"]).await;
        let conn = connect(&store).await;

        let ids = conn.client.read_list(queue().stalled()).await.unwrap();
        assert_eq!(ids, vec![WorkId::new("w2"), WorkId::new("w1")]);
        assert!(conn.client.read_list("nothing-here").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn connect_without_password_is_ready_immediately() {
        let store = InMemoryStallStore::new(Arc::new(TokioClock::new()));
        let mut conn = connect(&store).await;
        assert_eq!(conn.signals.recv().await, Some(ConnectionSignal::Ready));
    }

    #[tokio::test]
    async fn password_gates_ready_and_commands() {
        let store = InMemoryStallStore::with_options(
            Arc::new(TokioClock::new()),
            InMemoryOptions {
                password: Some("s3cret".into()),
                ..Default::default()
            },
        );
        let mut conn = connect(&store).await;
        assert!(conn.signals.try_recv().is_err());
        assert!(matches!(
            conn.client.read_list("jobs-stalled").await,
            Err(StoreError::Auth(_))
        ));

        assert!(matches!(conn.client.auth("wrong").await, Err(StoreError::Auth(_))));
        conn.client.auth("s3cret").await.unwrap();

        assert_eq!(conn.signals.recv().await, Some(ConnectionSignal::Ready));
        assert!(conn.client.read_list("jobs-stalled").await.is_ok());
    }

    #[tokio::test]
    async fn refused_connection_is_an_error() {
        let store = InMemoryStallStore::with_options(
            Arc::new(TokioClock::new()),
            InMemoryOptions {
                refuse_connections: true,
                ..Default::default()
            },
        );
        let result = store.connect(&StoreConfig::default()).await;
        assert!(matches!(result, Err(StoreError::Connection(msg)) if msg.contains("6379")));
    }

    #[tokio::test(start_paused = true)]
    async fn quit_signals_end_after_close_delay_once() {
        let store = InMemoryStallStore::with_options(
            Arc::new(TokioClock::new()),
            InMemoryOptions {
                close_delay: Duration::from_millis(500),
                ..Default::default()
            },
        );
        let mut conn = connect(&store).await;
        assert_eq!(conn.signals.recv().await, Some(ConnectionSignal::Ready));

        let started = Instant::now();
        conn.client.quit().await;
        conn.client.quit().await;
        assert_eq!(conn.signals.recv().await, Some(ConnectionSignal::End));
        assert!(started.elapsed() >= Duration::from_millis(500));
        assert_eq!(store.quit_count(), 1);
        assert_eq!(
            conn.client.read_list("jobs-stalled").await,
            Err(StoreError::Closed)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn finished_links_stop_receiving_connection_errors() {
        let store = InMemoryStallStore::with_options(
            Arc::new(TokioClock::new()),
            InMemoryOptions {
                close_delay: Duration::from_millis(200),
                ..Default::default()
            },
        );
        let mut quitting = connect(&store).await;
        let mut dropped = connect(&store).await;
        assert_eq!(quitting.signals.recv().await, Some(ConnectionSignal::Ready));
        assert_eq!(dropped.signals.recv().await, Some(ConnectionSignal::Ready));

        quitting.client.quit().await;
        store.emit_connection_error(StoreError::Command("while closing".into()));
        assert!(matches!(
            quitting.signals.recv().await,
            Some(ConnectionSignal::Error(_))
        ));
        assert_eq!(quitting.signals.recv().await, Some(ConnectionSignal::End));

        store.drop_connections();
        assert!(matches!(
            dropped.signals.recv().await,
            Some(ConnectionSignal::Error(_))
        ));
        assert_eq!(dropped.signals.recv().await, Some(ConnectionSignal::End));

        store.emit_connection_error(StoreError::Command("late".into()));
        assert!(quitting.signals.try_recv().is_err());
        assert!(dropped.signals.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_verification_does_not_requeue_a_reclaimed_item() {
        let (store, clock) = store_with_stalled(&["w1"]).await;
        let conn = connect(&store).await;
        let q = queue();

        // 1 回目の検証で pending に戻る
        tokio::time::sleep(Duration::from_secs(3)).await;
        let first = conn
            .client
            .requeue_stalled(request(&clock, "w1", Duration::from_secs(3)))
            .await
            .unwrap();
        assert_eq!(first, Some(WorkId::new("w1")));

        // 別のワーカーが取り直し、再び stalled にマークされる
        assert_eq!(store.claim(&q).await, Some(WorkId::new("w1")));
        assert!(store.mark_stalled(&q, &WorkId::new("w1")).await);

        // 古い poll から予約されていた検証が遅れて届く
        tokio::time::sleep(Duration::from_secs(1)).await;
        let repeated = conn
            .client
            .requeue_stalled(request(&clock, "w1", Duration::from_secs(3)))
            .await
            .unwrap();

        assert_eq!(repeated, None);
        let snapshot = store.snapshot(&q).await;
        assert!(snapshot.pending.is_empty());
        assert_eq!(snapshot.in_flight, vec![WorkId::new("w1")]);
        assert_eq!(snapshot.stalled, vec![WorkId::new("w1")]);
    }

    #[tokio::test]
    async fn injected_faults_are_consumed_in_order() {
        let (store, clock) = store_with_stalled(&["w1"]).await;
        let conn = connect(&store).await;
        store.fail_next_read(StoreError::Command("first".into()));
        store.fail_next_requeue(StoreError::Command("script".into()));

        assert_eq!(
            conn.client.read_list("jobs-stalled").await,
            Err(StoreError::Command("first".into()))
        );
        assert!(conn.client.read_list("jobs-stalled").await.is_ok());
        assert_eq!(
            conn.client
                .requeue_stalled(request(&clock, "w1", Duration::from_secs(60)))
                .await,
            Err(StoreError::Command("script".into()))
        );
        assert_eq!(store.read_count(), 2);
        assert_eq!(store.requeue_calls().len(), 1);
    }

    #[tokio::test]
    async fn connection_error_and_drop_reach_every_link() {
        let store = InMemoryStallStore::new(Arc::new(TokioClock::new()));
        let mut conn = connect(&store).await;
        assert_eq!(conn.signals.recv().await, Some(ConnectionSignal::Ready));

        store.emit_connection_error(StoreError::Command("ECONNRESET".into()));
        store.drop_connections();

        assert_eq!(
            conn.signals.recv().await,
            Some(ConnectionSignal::Error(StoreError::Command("ECONNRESET".into())))
        );
        assert_eq!(conn.signals.recv().await, Some(ConnectionSignal::End));
        assert_eq!(
            conn.client.read_list("jobs-stalled").await,
            Err(StoreError::Closed)
        );
    }
}
