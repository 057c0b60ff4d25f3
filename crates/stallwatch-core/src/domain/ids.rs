//! Identifiers - ワークアイテム ID
//!
//! WorkId はストア内で一意な不透明トークンです。
//! watchdog は中身の構造を一切仮定しません（ULID でも任意の文字列でもよい）。

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// WorkId は 1 件のキュー済みワークを識別する
///
/// # 例
/// ```ignore
/// let id = WorkId::new("w1");
/// assert_eq!(id.as_str(), "w1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkId(String);

impl WorkId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for WorkId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for WorkId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<Ulid> for WorkId {
    fn from(ulid: Ulid) -> Self {
        Self(ulid.to_string())
    }
}

impl fmt::Display for WorkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
