use anyhow::{Result, bail};
use serde::Serialize;

/// Push notification provider. Fire-and-forget: callers log failures and
/// move on, there is no delivery confirmation or redelivery queue.
pub struct PushClient {
    http: reqwest::Client,
    base_url: String,
    server_key: String,
}

#[derive(Serialize)]
struct PushRequest<'a> {
    to: &'a str,
    notification: PushPayload<'a>,
}

#[derive(Serialize)]
struct PushPayload<'a> {
    title: &'a str,
    body: &'a str,
}

impl PushClient {
    pub fn new(base_url: impl Into<String>, server_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            server_key: server_key.into(),
        }
    }

    pub async fn notify(&self, device_token: &str, title: &str, body: &str) -> Result<()> {
        let payload = PushRequest {
            to: device_token,
            notification: PushPayload { title, body },
        };
        let resp = self
            .http
            .post(format!("{}/send", self.base_url))
            .header("Authorization", format!("key={}", self.server_key))
            .json(&payload)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            bail!("push provider returned {}", status);
        }
        Ok(())
    }
}
