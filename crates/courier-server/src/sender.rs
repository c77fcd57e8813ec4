//! Outbound HTTP attempts over reqwest.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::debug;

use courier_core::domain::{DeliveryRequest, DeliveryResponse, Headers};
use courier_core::ports::{HttpSender, SendError};

/// `HttpSender` backed by a shared reqwest client with a fixed timeout.
pub struct ReqwestSender {
    client: reqwest::Client,
}

impl ReqwestSender {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("courier/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpSender for ReqwestSender {
    async fn send(&self, request: &DeliveryRequest) -> Result<DeliveryResponse, SendError> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|e| SendError::new(format!("invalid method for {request}: {e}")))?;

        let mut headers = HeaderMap::new();
        for (name, values) in request.headers.iter() {
            for value in values {
                match (
                    HeaderName::from_bytes(name.as_bytes()),
                    HeaderValue::from_str(value),
                ) {
                    (Ok(header_name), Ok(header_value)) => {
                        headers.append(header_name, header_value);
                    }
                    _ => debug!(header = name, "skipping header that does not fit on the wire"),
                }
            }
        }

        debug!(delivery = %request, "sending");
        let response = self
            .client
            .request(method, request.url.as_str())
            .headers(headers)
            .body(request.body.clone())
            .send()
            .await
            .map_err(|e| SendError::new(format!("sending {request} failed: {e}")))?;

        let status = response.status().as_u16();
        let mut response_headers = Headers::new();
        for (name, value) in response.headers() {
            response_headers.append(
                name.as_str(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            );
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| SendError::new(format!("reading response for {request} failed: {e}")))?
            .to_vec();

        debug!(delivery = %request, status, "response received");
        Ok(DeliveryResponse {
            status,
            headers: response_headers,
            body,
        })
    }
}
