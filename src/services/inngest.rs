use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use tracing::info;

use super::{JobQueue, ServiceError, ensure_success};

const SERVICE: &str = "inngest";

/// Sends events to Inngest, which runs the background functions listening
/// for them.
pub struct InngestClient {
    client: Client,
    base_url: String,
    event_key: String,
}

#[derive(Serialize)]
struct EventPayload<'a> {
    name: &'a str,
    data: serde_json::Value,
    ts: i64,
}

impl InngestClient {
    pub fn new(base_url: impl Into<String>, event_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            event_key: event_key.into(),
        }
    }

    fn event_url(&self) -> String {
        format!("{}/e/{}", self.base_url, urlencoding::encode(&self.event_key))
    }
}

#[async_trait]
impl JobQueue for InngestClient {
    async fn enqueue(&self, name: &str, data: serde_json::Value) -> Result<(), ServiceError> {
        let payload = EventPayload {
            name,
            data,
            ts: Utc::now().timestamp_millis(),
        };
        let response = self
            .client
            .post(self.event_url())
            .json(&payload)
            .send()
            .await?;
        ensure_success(SERVICE, response).await?;
        info!(event = name, "Job event sent.");
        Ok(())
    }
}
