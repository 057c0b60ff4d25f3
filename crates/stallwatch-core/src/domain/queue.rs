//! QueueTriple - 論理キュー名から導出される 3 つのコレクション
//!
//! 1 つの論理キューはストア上で 3 つのコレクションとして表現されます。
//! - **pending**: ワーカーが取得可能
//! - **timeout**: 取得済み・処理中（in-flight）
//! - **stalled**: ワーカー死亡の疑いあり（検証待ち）
//!
//! # 不変条件
//! - ある WorkId は同時に高々 1 つのコレクションにのみ属する
//! - 所属の変更はワーカー側と atomic verify-and-move だけが行う（watchdog は直接触らない）

use serde::{Deserialize, Serialize};
use std::fmt;

/// Collection は QueueTriple の各コレクションを指す
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Pending,
    Timeout,
    Stalled,
}

impl Collection {
    pub fn suffix(self) -> &'static str {
        match self {
            Collection::Pending => "pending",
            Collection::Timeout => "timeout",
            Collection::Stalled => "stalled",
        }
    }
}

/// QueueTriple はキュー名とストア上のコレクション名の組
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueTriple {
    name: String,
    pending: String,
    timeout: String,
    stalled: String,
}

impl QueueTriple {
    /// `<name>-pending`, `<name>-timeout`, `<name>-stalled` を導出
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            pending: format!("{name}-{}", Collection::Pending.suffix()),
            timeout: format!("{name}-{}", Collection::Timeout.suffix()),
            stalled: format!("{name}-{}", Collection::Stalled.suffix()),
            name,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pending(&self) -> &str {
        &self.pending
    }

    pub fn timeout(&self) -> &str {
        &self.timeout
    }

    pub fn stalled(&self) -> &str {
        &self.stalled
    }

    pub fn key(&self, collection: Collection) -> &str {
        match collection {
            Collection::Pending => &self.pending,
            Collection::Timeout => &self.timeout,
            Collection::Stalled => &self.stalled,
        }
    }
}

impl fmt::Display for QueueTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
