//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! 各 trait は外部システム（マネージドキュー、HTTP クライアント、監査用
//! ストアなど）へのインターフェースを提供し、実装の詳細を隠蔽します。
//!
//! # 設計原則
//! - 1 port = 1 contract。バックエンドは差し替え可能（テストは in-memory、
//!   本番はマネージドサービス）
//! - リトライのタイミングとバックオフは TaskQueue 側の責務。core は
//!   attempt 統計を読むだけで、自前のタイマーを持たない

pub mod id_generator;
pub mod last_delivery;
pub mod sender;
pub mod task_queue;
pub mod warehouse;

pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::last_delivery::LastDelivery;
pub use self::sender::{HttpSender, SendError};
pub use self::task_queue::{QueueError, QueueTask, TaskQueue};
pub use self::warehouse::{Warehouse, WarehouseError};
