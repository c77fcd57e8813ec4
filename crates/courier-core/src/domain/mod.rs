//! Domain model (ids, requests, responses, stats, audit records).

pub mod record;
pub mod request;
pub mod response;
pub mod stats;

pub use record::DeliveryRecord;
pub use request::{DeliveryId, DeliveryRequest, Headers};
pub use response::{Classifier, DeliveryResponse};
pub use stats::AttemptStats;
