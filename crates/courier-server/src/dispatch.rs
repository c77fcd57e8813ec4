//! Loopback webhook dispatch for the in-memory queue.
//!
//! A managed queue pushes its tasks to the webhook over HTTP; the
//! in-memory queue does the same thing against this process's own
//! address, so redeliveries take the exact wire path production would.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

use courier_core::impls::RedeliveryDispatch;
use courier_core::ports::QueueError;

pub struct HttpDispatch {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDispatch {
    pub fn new(base_url: impl Into<String>) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl RedeliveryDispatch for HttpDispatch {
    async fn dispatch(&self, webhook_path: &str, payload: &[u8]) -> Result<u16, QueueError> {
        let url = format!("{}{}", self.base_url, webhook_path);
        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload.to_vec())
            .send()
            .await
            .map_err(|e| QueueError::OperationFailed(format!("webhook call to {url} failed: {e}")))?;
        Ok(response.status().as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_loses_its_trailing_slash() {
        let dispatch = HttpDispatch::new("http://127.0.0.1:8080/").unwrap();
        assert_eq!(dispatch.base_url, "http://127.0.0.1:8080");
    }
}
