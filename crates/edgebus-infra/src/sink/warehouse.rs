//! WarehouseSink: edge-side POST of each batch to an analytics write API.
//!
//! The bearer token is wrapped in [`secrecy::SecretString`] and is only
//! exposed when building the `Authorization` header.

use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};
use reqwest::header::CONTENT_TYPE;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use edgebus_core::DeliverySink;
use edgebus_types::error::DeliveryError;
use edgebus_types::event::EventRecord;

/// Does not derive `Debug`; see the token field.
pub struct WarehouseSink {
    client: reqwest::Client,
    url: String,
    token: Option<SecretString>,
}

impl WarehouseSink {
    pub fn new(url: String, token: Option<SecretString>, timeout: Duration) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeliveryError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client, url, token })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl DeliverySink for WarehouseSink {
    fn name(&self) -> &str {
        "warehouse"
    }

    fn deliver(&self, batch: Vec<EventRecord>) -> BoxFuture<'static, Result<(), DeliveryError>> {
        let body = match serde_json::to_vec(&batch) {
            Ok(body) => body,
            Err(e) => return futures_util::future::ready(Err(e.into())).boxed(),
        };

        let mut request = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token.expose_secret());
        }

        let count = batch.len();
        async move {
            let response = request
                .send()
                .await
                .map_err(|e| DeliveryError::Transport(format!("warehouse request failed: {e}")))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(DeliveryError::Rejected {
                    status: status.as_u16(),
                    body,
                });
            }

            debug!(count, %status, "warehouse write accepted");
            Ok(())
        }
        .boxed()
    }
}
