use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Base URL advertised in confirmation links.
    pub public_base_url: String,
    pub sms: Option<SmsConfig>,
    pub smtp: Option<SmtpConfig>,
}

/// Settings for the outbound SMS gateway (Africa's Talking style HTTP API).
#[derive(Debug, Clone)]
pub struct SmsConfig {
    pub endpoint: String,
    pub username: String,
    pub api_key: String,
    pub sender_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let public_base_url =
            env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| format!("http://{host}:{port}"));

        // Notification collaborators are optional; without credentials the
        // clients run in disabled mode and only log.
        let sms = match (env::var("SMS_USERNAME"), env::var("SMS_API_KEY")) {
            (Ok(username), Ok(api_key)) => Some(SmsConfig {
                endpoint: env::var("SMS_ENDPOINT").unwrap_or_else(|_| {
                    "https://api.africastalking.com/version1/messaging".to_string()
                }),
                username,
                api_key,
                sender_id: env::var("SMS_SENDER_ID").ok(),
            }),
            _ => None,
        };

        let smtp = match (env::var("SMTP_HOST"), env::var("SMTP_FROM")) {
            (Ok(smtp_host), Ok(from_address)) => Some(SmtpConfig {
                host: smtp_host,
                port: env::var("SMTP_PORT")
                    .ok()
                    .and_then(|p| p.parse::<u16>().ok())
                    .unwrap_or(587),
                username: env::var("SMTP_USERNAME").unwrap_or_default(),
                password: env::var("SMTP_PASSWORD").unwrap_or_default(),
                from_address,
            }),
            _ => None,
        };

        Ok(Self {
            database_url,
            host,
            port,
            public_base_url,
            sms,
            smtp,
        })
    }
}
