use async_trait::async_trait;
use std::time::Duration;
use tracing::{instrument, warn};

use super::{SmsError, SmsSender};

const DEFAULT_API_BASE: &str = "https://api.twilio.com";

/// Twilio Programmable Messaging client.
#[derive(Clone)]
pub struct TwilioSmsSender {
    client: reqwest::Client,
    api_base: String,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

impl TwilioSmsSender {
    pub fn new(
        account_sid: String,
        auth_token: String,
        from_number: String,
        api_base: Option<String>,
        timeout: Duration,
    ) -> Result<Self, SmsError> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(timeout).build()?,
            api_base: api_base.unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            account_sid,
            auth_token,
            from_number,
        })
    }
}

#[async_trait]
impl SmsSender for TwilioSmsSender {
    #[instrument(skip(self, body))]
    async fn send(&self, phone: &str, body: &str) -> Result<(), SmsError> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base, self.account_sid
        );
        let response = self
            .client
            .post(url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", phone), ("From", self.from_number.as_str()), ("Body", body)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Twilio API error: {}", body);
            return Err(SmsError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
