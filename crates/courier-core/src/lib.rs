//! courier-core
//!
//! Delivery orchestration and retry-state core for the courier relay.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（DeliveryRequest, DeliveryResponse, AttemptStats, DeliveryRecord）
//! - **ports**: 抽象化レイヤー（HttpSender, TaskQueue, Warehouse, LastDelivery, IdGenerator）
//! - **forward**: Forward Orchestrator（sync / async / redelivery の判断ロジック）
//! - **impls**: 実装（InMemoryTaskQueue など開発・テスト用）
//!
//! The core never schedules its own retry timers: all cross-attempt
//! coordination (attempt counts, backoff, dedup) lives behind the
//! `TaskQueue` port.

pub mod domain;
pub mod forward;
pub mod impls;
pub mod ports;
