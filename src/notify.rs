//! Outbound notification collaborators. Both clients are constructed once at
//! startup and shared through `AppState`; callers treat delivery as
//! best-effort and must not fail their own operation when a send fails.

use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::header::ContentType,
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use thiserror::Error;

use crate::config::{SmsConfig, SmtpConfig};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("SMS gateway error: {0}")]
    Gateway(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

/// SMS client posting to an Africa's Talking style HTTP gateway.
///
/// Without credentials the client is disabled and `send` is a logged no-op,
/// which keeps local development working without a gateway account.
#[derive(Clone)]
pub struct SmsClient {
    http: reqwest::Client,
    config: Option<SmsConfig>,
}

impl SmsClient {
    pub fn new(config: Option<SmsConfig>) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub async fn send(&self, message: &str, recipients: &[String]) -> Result<(), NotifyError> {
        let to: Vec<&str> = recipients
            .iter()
            .map(String::as_str)
            .filter(|p| !p.is_empty())
            .collect();
        if to.is_empty() {
            tracing::debug!("no SMS recipients with a phone number, skipping");
            return Ok(());
        }

        let Some(config) = &self.config else {
            tracing::debug!(recipients = ?to, "SMS gateway not configured, skipping send");
            return Ok(());
        };

        let mut form = vec![
            ("username", config.username.clone()),
            ("to", to.join(",")),
            ("message", message.to_string()),
        ];
        if let Some(sender_id) = &config.sender_id {
            form.push(("from", sender_id.clone()));
        }

        let response = self
            .http
            .post(&config.endpoint)
            .header("apiKey", &config.api_key)
            .header("Accept", "application/json")
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NotifyError::Gateway(format!(
                "gateway returned {}",
                response.status()
            )));
        }

        tracing::info!(recipients = ?to, "SMS sent");
        Ok(())
    }
}

/// SMTP mailer for transactional mail (signup confirmation links).
#[derive(Clone)]
pub struct Mailer {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from_address: String,
}

impl Mailer {
    pub fn new(config: Option<&SmtpConfig>) -> Result<Self, SmtpError> {
        let (transport, from_address) = match config {
            Some(config) => {
                let credentials =
                    Credentials::new(config.username.clone(), config.password.clone());
                let transport =
                    AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
                        .port(config.port)
                        .credentials(credentials)
                        .build();
                (Some(transport), config.from_address.clone())
            }
            None => (None, String::new()),
        };
        Ok(Self {
            transport,
            from_address,
        })
    }

    /// Send the account-confirmation mail for a fresh signup.
    pub async fn send_confirmation(
        &self,
        to: &str,
        confirm_url: &str,
    ) -> Result<(), NotifyError> {
        let Some(transport) = &self.transport else {
            tracing::debug!(to = %to, "SMTP not configured, skipping confirmation mail");
            return Ok(());
        };

        let body = format!(
            "Hi {to},\n\nYou've created an account on Marketplace. \
             Please confirm your email by visiting: {confirm_url}\n"
        );
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| NotifyError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| NotifyError::InvalidAddress(to.to_string()))?)
            .subject("Welcome to Marketplace")
            .header(ContentType::TEXT_PLAIN)
            .body(body)?;

        transport.send(email).await?;
        tracing::info!(to = %to, "confirmation mail sent");
        Ok(())
    }
}
