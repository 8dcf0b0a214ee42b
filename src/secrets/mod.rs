// Credential retrieval
pub mod aws;

pub use aws::AwsSecretsProvider;

use crate::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;

/// Everything the bot needs to talk to the brokerage and send mail
#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    pub alpaca_api_key: String,
    pub alpaca_secret_key: String,
    pub sender_email: String,
    pub sender_password: String,
    pub recipient_email: String,
}

impl Credentials {
    /// Parse the JSON blob stored under the secret id
    pub fn from_json(blob: &str) -> Result<Self> {
        serde_json::from_str(blob).map_err(|e| Error::Secrets(format!("malformed secret: {}", e)))
    }
}

// Keys and passwords stay out of logs
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("alpaca_api_key", &"<redacted>")
            .field("alpaca_secret_key", &"<redacted>")
            .field("sender_email", &self.sender_email)
            .field("sender_password", &"<redacted>")
            .field("recipient_email", &self.recipient_email)
            .finish()
    }
}

#[async_trait]
pub trait SecretsProvider: Send + Sync {
    async fn credentials(&self) -> Result<Credentials>;
}

/// Reads credentials from environment variables, for local runs
///
/// `ALPACA_API_KEY`, `ALPACA_SECRET_KEY`, `SENDER_EMAIL`,
/// `SENDER_PASSWORD`, `RECIPIENT_EMAIL`
#[derive(Debug, Default, Clone)]
pub struct EnvSecretsProvider;

impl EnvSecretsProvider {
    fn var(name: &str) -> Result<String> {
        std::env::var(name).map_err(|_| Error::Secrets(format!("{} not found in environment", name)))
    }
}

#[async_trait]
impl SecretsProvider for EnvSecretsProvider {
    async fn credentials(&self) -> Result<Credentials> {
        Ok(Credentials {
            alpaca_api_key: Self::var("ALPACA_API_KEY")?,
            alpaca_secret_key: Self::var("ALPACA_SECRET_KEY")?,
            sender_email: Self::var("SENDER_EMAIL")?,
            sender_password: Self::var("SENDER_PASSWORD")?,
            recipient_email: Self::var("RECIPIENT_EMAIL")?,
        })
    }
}
