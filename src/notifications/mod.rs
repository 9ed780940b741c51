//! Outbound SMS used for phone verification codes.

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

pub mod twilio;

pub use twilio::TwilioSmsSender;

#[derive(Debug, Error)]
pub enum SmsError {
    #[error("sms transport error: {0}")]
    Transport(String),

    #[error("sms provider rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

impl From<reqwest::Error> for SmsError {
    fn from(err: reqwest::Error) -> Self {
        SmsError::Transport(err.to_string())
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send(&self, phone: &str, body: &str) -> Result<(), SmsError>;
}

/// Development sender that only logs the message.
#[derive(Debug, Clone, Default)]
pub struct LogSmsSender;

#[async_trait]
impl SmsSender for LogSmsSender {
    async fn send(&self, phone: &str, body: &str) -> Result<(), SmsError> {
        info!(phone = %phone, message = %body, "sms delivery skipped (log sender)");
        Ok(())
    }
}

/// Text of the verification SMS.
pub fn verification_message(code: i32) -> String {
    format!("Your verification code is {}", code)
}
