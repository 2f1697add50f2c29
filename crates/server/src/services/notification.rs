//! Outbound delivery of verification codes.
//!
//! [`TwilioNotifier`] sends an SMS through the Twilio Messages API.
//! [`LogNotifier`] is used when no provider is configured.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use bazaar_core::{PhoneNumber, VerificationCode};

use crate::config::TwilioConfig;

/// Twilio REST API base URL.
const TWILIO_API_BASE: &str = "https://api.twilio.com";

/// Errors that can occur while delivering a code.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
}

/// Channel that delivers a verification code to a phone.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// # Errors
    ///
    /// Returns `NotifyError` if the provider could not accept the message.
    async fn deliver_code(
        &self,
        phone: &PhoneNumber,
        code: VerificationCode,
    ) -> Result<(), NotifyError>;
}

/// Message body sent to the user.
fn message_body(code: VerificationCode) -> String {
    format!("Your verification code is {}", code.spaced())
}

/// SMS delivery through Twilio.
#[derive(Clone)]
pub struct TwilioNotifier {
    client: reqwest::Client,
    base_url: String,
    account_sid: String,
    auth_token: SecretString,
    from_number: String,
}

impl TwilioNotifier {
    /// Create a Twilio client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &TwilioConfig) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: TWILIO_API_BASE.to_string(),
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            from_number: config.from_number.clone(),
        })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.account_sid
        )
    }
}

#[async_trait]
impl Notifier for TwilioNotifier {
    #[tracing::instrument(skip(self, code), fields(phone = %phone))]
    async fn deliver_code(
        &self,
        phone: &PhoneNumber,
        code: VerificationCode,
    ) -> Result<(), NotifyError> {
        let body = message_body(code);
        let params = [
            ("To", phone.as_str()),
            ("From", self.from_number.as_str()),
            ("Body", body.as_str()),
        ];

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(self.auth_token.expose_secret()))
            .form(&params)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(NotifyError::Api {
                status: status.as_u16(),
                message,
            });
        }

        tracing::info!("verification code sent");
        Ok(())
    }
}

/// Fallback used when no SMS provider is configured.
///
/// The code itself is not written to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn deliver_code(
        &self,
        phone: &PhoneNumber,
        _code: VerificationCode,
    ) -> Result<(), NotifyError> {
        tracing::info!(phone = %phone, "no SMS provider configured, verification code not sent");
        Ok(())
    }
}
