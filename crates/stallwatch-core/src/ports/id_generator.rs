//! IdGenerator port - WorkId 生成の抽象化
//!
//! watchdog 自体は ID を生成しません（ストアから読むだけ）。
//! ワーカー側のシミュレーション（テスト・デモ）で ID を払い出すために使います。
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース

use crate::domain::ids::WorkId;
use crate::ports::Clock;
use ulid::Ulid;

/// IdGenerator は分散環境でも衝突しない WorkId を生成
pub trait IdGenerator: Send + Sync {
    fn generate_work_id(&self) -> WorkId;
}

/// UlidGenerator は Clock の現在時刻を timestamp 部に使う ULID 生成器
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_work_id(&self) -> WorkId {
        let timestamp_ms = self.clock.now().timestamp_millis().max(0) as u64;
        WorkId::from(Ulid::from_parts(timestamp_ms, rand::random()))
    }
}
