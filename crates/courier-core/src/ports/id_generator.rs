//! IdGenerator port - ID 生成の抽象化
//!
//! 配送 id はキューの dedup キーになるため、分散環境で調整なしに生成できる
//! 必要があります。テスト容易性のために trait として抽象化しています。

use chrono::Utc;
use ulid::Ulid;

use crate::domain::DeliveryId;

/// Generates fresh delivery ids.
///
/// The default strategy is "caller-supplied id wins, otherwise a fresh
/// ULID" — the generator only covers the second half. Implementations must
/// be `Send + Sync`; handlers call them concurrently.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> DeliveryId;
}

/// ULID-based generator.
///
/// # ULID の特性
/// - 時刻でソート可能（timestamp が先頭）
/// - 分散生成可能（調整不要）
/// - 128-bit（UUID 互換）
pub struct UlidGenerator;

impl IdGenerator for UlidGenerator {
    fn generate(&self) -> DeliveryId {
        let timestamp_ms = Utc::now().timestamp_millis() as u64;
        let ulid = Ulid::from_parts(timestamp_ms, rand::random());
        DeliveryId::from(ulid.to_string())
    }
}
