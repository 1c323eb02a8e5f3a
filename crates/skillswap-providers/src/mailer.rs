use anyhow::{Result, bail};
use serde::Serialize;
use tracing::info;

/// Transactional email. With no API key configured the mailer runs in dev
/// mode and logs the message instead of sending it, so OTP flows work on a
/// laptop without a provider account.
pub struct Mailer {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    from: String,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

impl Mailer {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, from: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
            from: from.into(),
        }
    }

    pub async fn send(&self, to: &str, subject: &str, text: &str) -> Result<()> {
        let Some(api_key) = &self.api_key else {
            info!("mailer (dev mode) to={} subject={:?} body={:?}", to, subject, text);
            return Ok(());
        };

        let body = SendRequest {
            from: &self.from,
            to,
            subject,
            text,
        };
        let resp = self
            .http
            .post(format!("{}/send", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            bail!("email provider returned {}", status);
        }
        Ok(())
    }

    pub async fn send_otp(&self, to: &str, purpose: &str, code: &str) -> Result<()> {
        let subject = match purpose {
            "verify_email" => "Verify your SkillSwap account",
            "reset_password" => "Your SkillSwap password reset code",
            "change_email" => "Confirm your new SkillSwap email",
            _ => "Your SkillSwap code",
        };
        let text = format!("Your code is {code}. It expires in 10 minutes.");
        self.send(to, subject, &text).await
    }
}
