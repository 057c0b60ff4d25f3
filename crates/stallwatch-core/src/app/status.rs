//! Status - watchdog の稼働状況
//!
//! イベントが正式な出力であり、これは運用者向けの集計ビューです。

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::WatchdogState;

/// WatchdogStatus はある時点のスナップショット
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchdogStatus {
    pub queue: String,
    pub state: WatchdogState,
    /// 発行した poll の数
    pub polls: u64,
    /// poll で読んだ候補の延べ数
    pub candidates: u64,
    pub requeued: u64,
    /// 報告した Fault の数（Batch 展開後）
    pub faults: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    polls: AtomicU64,
    candidates: AtomicU64,
    requeued: AtomicU64,
    faults: AtomicU64,
}

impl Counters {
    pub(crate) fn record_poll(&self) {
        self.polls.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_candidates(&self, n: usize) {
        self.candidates.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_requeue(&self) {
        self.requeued.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_fault(&self) {
        self.faults.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, queue: &str, state: WatchdogState) -> WatchdogStatus {
        WatchdogStatus {
            queue: queue.to_owned(),
            state,
            polls: self.polls.load(Ordering::Relaxed),
            candidates: self.candidates.load(Ordering::Relaxed),
            requeued: self.requeued.load(Ordering::Relaxed),
            faults: self.faults.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_counters() {
        let counters = Counters::default();
        counters.record_poll();
        counters.record_poll();
        counters.record_candidates(3);
        counters.record_requeue();
        counters.record_fault();

        let status = counters.snapshot("jobs", WatchdogState::Polling);
        assert_eq!(
            status,
            WatchdogStatus {
                queue: "jobs".into(),
                state: WatchdogState::Polling,
                polls: 2,
                candidates: 3,
                requeued: 1,
                faults: 1,
            }
        );
    }

    #[test]
    fn status_serializes_state_in_snake_case() {
        let status = Counters::default().snapshot("jobs", WatchdogState::Stopping);
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["state"], "stopping");
        assert_eq!(json["polls"], 0);
    }
}
