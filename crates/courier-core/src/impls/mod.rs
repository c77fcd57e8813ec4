//! Implementations - 開発・テスト用のポート実装
//!
//! 本番のマネージドサービス実装（Cloud Tasks / Datastore 相当）は port の
//! 背後に差し込む外部クレートの責務。ここにあるのは in-memory の代替です。

pub mod backoff;
pub mod inmem_queue;
pub mod inmem_warehouse;
pub mod log_last_delivery;

pub use backoff::BackoffPolicy;
pub use inmem_queue::{InMemoryTaskQueue, RedeliveryDispatch};
pub use inmem_warehouse::InMemoryWarehouse;
pub use log_last_delivery::LogLastDelivery;
