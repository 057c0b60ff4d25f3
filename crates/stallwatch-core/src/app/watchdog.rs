//! Watchdog - ライフサイクルを持つ controller
//!
//! # 状態遷移
//! Init → Ready → Polling (cyclic) → Stopping → Stopped
//!
//! # 実行モデル
//! - controller は 1 つの tokio タスク（select ループ）で状態を単独所有する
//! - poll の読み取りは controller タスク上で実行（PollScheduler が重複を防ぐ）
//! - 候補の検証は候補ごとの独立タスク（StallVerifier）で、結果は mpsc で戻る
//! - イベント発行はすべて controller が行う
//!
//! # stop
//! - 最初の stop だけが接続を閉じ、End 通知を待ってから `Ended` を発行する
//! - stop 後に接続から届くエラーや、実行中だった poll / 検証の失敗は報告しない
//! - Stopped 後の stop は即座に完了する
//! - stop は接続・認証の完了を待たない。poll の予約より常に優先される

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::app::builder::WatchdogBuilder;
use crate::app::poll_loop::{PollScheduler, PollTick};
use crate::app::status::{Counters, WatchdogStatus};
use crate::app::verifier::{StallVerifier, Verdict};
use crate::config::WatchdogConfig;
use crate::domain::{QueueTriple, StoreError, WatchdogError, WatchdogEvent, WatchdogState, WorkId};
use crate::ports::{
    Clock, Connection, ConnectionSignal, EventSink, FanoutSink, StoreClient, StoreConnector,
};

type StopWaiter = oneshot::Sender<()>;

/// Watchdog は起動済み watchdog へのハンドル
///
/// 操作は stop だけです。ハンドルを drop した場合も stop が要求されます。
pub struct Watchdog {
    queue: Arc<QueueTriple>,
    stop_tx: mpsc::UnboundedSender<StopWaiter>,
    state: watch::Receiver<WatchdogState>,
    counters: Arc<Counters>,
}

impl Watchdog {
    pub fn builder(queue: impl Into<String>, connector: Arc<dyn StoreConnector>) -> WatchdogBuilder {
        WatchdogBuilder::new(queue, connector)
    }

    pub(crate) fn launch(
        queue: QueueTriple,
        config: WatchdogConfig,
        connector: Arc<dyn StoreConnector>,
        clock: Arc<dyn Clock>,
        sink: FanoutSink,
    ) -> Self {
        let queue = Arc::new(queue);
        let (stop_tx, stop_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(WatchdogState::Init);
        let counters = Arc::new(Counters::default());

        let controller = Controller {
            queue: queue.clone(),
            config,
            connector,
            clock,
            sink,
            state: state_tx,
            counters: counters.clone(),
            stop_rx,
            stop_requests_open: true,
            waiters: Vec::new(),
        };
        tokio::spawn(controller.run());

        Self {
            queue,
            stop_tx,
            state: state_rx,
            counters,
        }
    }

    pub fn queue(&self) -> &QueueTriple {
        &self.queue
    }

    pub fn state(&self) -> WatchdogState {
        *self.state.borrow()
    }

    pub fn status(&self) -> WatchdogStatus {
        self.counters.snapshot(self.queue.name(), self.state())
    }

    /// Stopped になるまで待つ（stop は要求しない）
    pub async fn stopped(&self) {
        let mut state = self.state.clone();
        let _ = state.wait_for(|s| s.is_terminal()).await;
    }

    /// stop を要求し、`Ended` が発行されるまで待つ
    pub async fn stop(&self) {
        let (tx, rx) = oneshot::channel();
        if self.stop_tx.send(tx).is_err() {
            return;
        }
        // controller が先に終了していても完了扱い
        let _ = rx.await;
    }

    /// stop を要求し、完了時に callback を呼ぶ
    ///
    /// すでに Stopped なら callback はこの呼び出しの中で即座に実行されます。
    pub fn stop_with<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        if self.stop_tx.send(tx).is_err() {
            callback();
            return;
        }
        tokio::spawn(async move {
            let _ = rx.await;
            callback();
        });
    }
}

struct Controller {
    queue: Arc<QueueTriple>,
    config: WatchdogConfig,
    connector: Arc<dyn StoreConnector>,
    clock: Arc<dyn Clock>,
    sink: FanoutSink,
    state: watch::Sender<WatchdogState>,
    counters: Arc<Counters>,
    stop_rx: mpsc::UnboundedReceiver<StopWaiter>,
    /// ハンドルが drop されると false
    stop_requests_open: bool,
    waiters: Vec<StopWaiter>,
}

impl Controller {
    async fn run(mut self) {
        info!(queue = %self.queue, "starting stall watchdog");
        match self.connect().await {
            Some(connection) => self.supervise(connection).await,
            None => self.wait_for_stop().await,
        }
        self.finish();
    }

    fn stopping(&self) -> bool {
        self.state.borrow().is_shutting_down()
    }

    /// 接続と認証を行う。どちらも stop 要求と競合させる
    async fn connect(&mut self) -> Option<Connection> {
        let attempt = tokio::select! {
            biased;
            request = self.stop_rx.recv() => {
                self.accept_stop(request);
                None
            }
            result = self.connector.connect(&self.config.store) => Some(result),
        };
        let connection = match attempt? {
            Ok(connection) => connection,
            Err(error) => {
                self.report(WatchdogError::Connect(error));
                return None;
            }
        };

        if let Some(password) = self.config.store.password.clone() {
            tokio::select! {
                biased;
                request = self.stop_rx.recv() => self.accept_stop(request),
                result = connection.client.auth(&password) => {
                    if let Err(error) = result {
                        self.report(WatchdogError::Connection(error));
                    }
                }
            }
        }
        Some(connection)
    }

    /// 接続できなかった場合は stop 要求（またはハンドルの drop）だけを待つ
    async fn wait_for_stop(&mut self) {
        if self.stopping() {
            return;
        }
        let request = self.stop_rx.recv().await;
        self.accept_stop(request);
    }

    async fn supervise(&mut self, connection: Connection) {
        let Connection {
            client,
            mut signals,
        } = connection;
        let (verdict_tx, mut verdict_rx) = mpsc::unbounded_channel();
        let (closed_tx, closed_rx) = watch::channel(false);
        let verifier = StallVerifier::new(
            client.clone(),
            self.queue.clone(),
            self.clock.clone(),
            self.config.stalled_timeout(),
            verdict_tx,
            closed_rx,
        );
        let mut scheduler = PollScheduler::new(self.queue.stalled(), self.config.poll_interval());

        let mut connected = true;
        let mut ready = false;

        // 認証中に stop された
        if self.stopping() {
            self.shut_down(&mut scheduler, &client);
        }

        loop {
            // stop 要求を poll の予約より先に見る
            tokio::select! {
                biased;
                request = self.stop_rx.recv(), if self.stop_requests_open => {
                    self.accept_stop(request);
                    self.shut_down(&mut scheduler, &client);
                    if !connected {
                        break;
                    }
                },
                signal = signals.recv(), if connected => match signal {
                    Some(ConnectionSignal::Ready) => {
                        if !ready && !self.stopping() {
                            ready = true;
                            self.on_ready(&mut scheduler, &client);
                        }
                    }
                    Some(ConnectionSignal::Error(error)) => {
                        if self.stopping() {
                            debug!(queue = %self.queue, %error, "ignoring connection error during shutdown");
                        } else {
                            self.report(WatchdogError::Connection(error));
                        }
                    }
                    Some(ConnectionSignal::End) | None => {
                        connected = false;
                        if self.stopping() {
                            break;
                        }
                        self.report(WatchdogError::Disconnected);
                    }
                },
                Some(verdict) = verdict_rx.recv() => self.on_verdict(verdict),
                tick = scheduler.next() => match tick {
                    PollTick::Due => {
                        if !self.drain_stop_requests() {
                            self.poll(&mut scheduler, &client);
                            continue;
                        }
                        self.shut_down(&mut scheduler, &client);
                        if !connected {
                            break;
                        }
                    }
                    PollTick::Read(result) => self.on_candidates(result, &verifier),
                },
            }
        }

        // 猶予が明けていない検証はストアを呼ばずに終わる
        let _ = closed_tx.send(true);
    }

    /// stop 要求を記録する（`None` はハンドルの drop）
    fn accept_stop(&mut self, request: Option<StopWaiter>) {
        match request {
            Some(waiter) => self.waiters.push(waiter),
            None => self.stop_requests_open = false,
        }
        self.begin_stop();
    }

    /// select が拾う前に届いていた stop 要求を取り込む
    fn drain_stop_requests(&mut self) -> bool {
        let mut requested = false;
        while self.stop_requests_open {
            match self.stop_rx.try_recv() {
                Ok(waiter) => {
                    self.waiters.push(waiter);
                    requested = true;
                }
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    self.stop_requests_open = false;
                    requested = true;
                }
            }
        }
        if requested {
            self.begin_stop();
        }
        requested
    }

    /// poll の予約を取り消し、接続を閉じる（End は signals で届く）
    fn shut_down(&self, scheduler: &mut PollScheduler, client: &Arc<dyn StoreClient>) {
        if scheduler.is_stopped() {
            return;
        }
        scheduler.stop();
        let client = client.clone();
        tokio::spawn(async move { client.quit().await });
    }

    fn on_ready(&mut self, scheduler: &mut PollScheduler, client: &Arc<dyn StoreClient>) {
        info!(queue = %self.queue, "store connection ready");
        self.set_state(WatchdogState::Ready);
        self.emit(WatchdogEvent::Ready);
        self.poll(scheduler, client);
    }

    fn poll(&mut self, scheduler: &mut PollScheduler, client: &Arc<dyn StoreClient>) {
        if !scheduler.poll(client) {
            return;
        }
        self.counters.record_poll();
        if *self.state.borrow() == WatchdogState::Ready {
            self.set_state(WatchdogState::Polling);
        }
        debug!(queue = %self.queue, "polling for stalled items");
        self.emit(WatchdogEvent::Polling);
    }

    fn on_candidates(&mut self, result: Result<Vec<WorkId>, StoreError>, verifier: &StallVerifier) {
        let ids = match result {
            Ok(ids) => ids,
            Err(source) if self.stopping() => {
                debug!(queue = %self.queue, error = %source, "ignoring poll failure during shutdown");
                return;
            }
            Err(source) => {
                self.report(WatchdogError::Poll {
                    collection: self.queue.stalled().to_owned(),
                    source,
                });
                return;
            }
        };

        if ids.is_empty() {
            return;
        }
        if self.stopping() {
            debug!(queue = %self.queue, count = ids.len(), "dropping candidates read during shutdown");
            return;
        }

        self.counters.record_candidates(ids.len());
        debug!(
            queue = %self.queue,
            count = ids.len(),
            grace_ms = verifier.grace().as_millis() as u64,
            "scheduling stall verification"
        );
        for id in ids {
            verifier.schedule(id);
        }
    }

    fn on_verdict(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::Requeued(id) => {
                self.counters.record_requeue();
                info!(queue = %self.queue, %id, "requeued stalled item");
                self.emit(WatchdogEvent::Requeued { id });
            }
            Verdict::NotStalled(id) => {
                debug!(queue = %self.queue, %id, "candidate is no longer stalled");
            }
            Verdict::Skipped(id) => {
                debug!(queue = %self.queue, %id, "connection closed before verification");
            }
            Verdict::Failed { id, error } if self.stopping() => {
                debug!(queue = %self.queue, %id, %error, "ignoring verification failure during shutdown");
            }
            Verdict::Failed { id, error } => {
                self.report(WatchdogError::Requeue { id, source: error });
            }
        }
    }

    fn begin_stop(&mut self) {
        if self.stopping() {
            return;
        }
        info!(queue = %self.queue, "stopping stall watchdog");
        self.set_state(WatchdogState::Stopping);
    }

    fn finish(&mut self) {
        self.begin_stop();

        // 以後の stop はハンドル側で即座に完了する
        self.stop_rx.close();
        while let Ok(waiter) = self.stop_rx.try_recv() {
            self.waiters.push(waiter);
        }

        self.set_state(WatchdogState::Stopped);
        info!(queue = %self.queue, "stall watchdog stopped");
        self.emit(WatchdogEvent::Ended);
        for waiter in self.waiters.drain(..) {
            let _ = waiter.send(());
        }
    }

    fn report(&mut self, error: WatchdogError) {
        for error in error.expand() {
            self.counters.record_fault();
            warn!(queue = %self.queue, %error, "watchdog fault");
            self.emit(WatchdogEvent::Fault { error });
        }
    }

    fn set_state(&self, state: WatchdogState) {
        self.state.send_replace(state);
    }

    fn emit(&self, event: WatchdogEvent) {
        self.sink.emit(&event);
    }
}
