use crate::Result;
use ::config::{Config, Environment, File};
use serde::Deserialize;
use std::time::Duration;

const PAPER_TRADING_URL: &str = "https://paper-api.alpaca.markets";
const LIVE_TRADING_URL: &str = "https://api.alpaca.markets";
const MARKET_DATA_URL: &str = "https://data.alpaca.markets";

/// Where credentials are read from
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SecretsSource {
    Aws,
    Env,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Deployment settings
///
/// Credentials never live here - they come from the secret store.
/// Layering: defaults < `emabot.toml` < `EMABOT_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub symbol: String,
    pub ema_period: usize,
    pub paper: bool,
    pub poll_interval_secs: u64,
    pub poll_max_attempts: u32,
    pub schedule_offset_minutes: i64,
    pub rule_name: String,
    pub target_arn: String,
    pub secret_id: String,
    pub secrets_source: SecretsSource,
    pub aws_region: Option<String>,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub data_feed: String,
    pub trading_base_url: Option<String>,
    pub data_base_url: Option<String>,
    pub log_format: LogFormat,
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::from_config(
            Config::builder()
                .add_source(File::with_name("emabot").required(false))
                .add_source(Environment::with_prefix("EMABOT")),
        )
    }

    fn from_config(
        builder: ::config::ConfigBuilder<::config::builder::DefaultState>,
    ) -> Result<Self> {
        let settings = builder
            .set_default("symbol", "TQQQ")?
            .set_default("ema_period", 50)?
            .set_default("paper", true)?
            .set_default("poll_interval_secs", 30)?
            .set_default("poll_max_attempts", 4)?
            .set_default("schedule_offset_minutes", 2)?
            .set_default("rule_name", "emabot-next-close")?
            .set_default("target_arn", "")?
            .set_default("secret_id", "emabot/credentials")?
            .set_default("secrets_source", "aws")?
            .set_default("smtp_host", "smtp.gmail.com")?
            .set_default("smtp_port", 587)?
            .set_default("data_feed", "iex")?
            .set_default("log_format", "pretty")?
            .build()?
            .try_deserialize::<Settings>()?;

        if settings.target_arn.is_empty() {
            return Err(::config::ConfigError::NotFound("target_arn".to_string()).into());
        }

        Ok(settings)
    }

    pub fn trading_url(&self) -> &str {
        match &self.trading_base_url {
            Some(url) => url,
            None if self.paper => PAPER_TRADING_URL,
            None => LIVE_TRADING_URL,
        }
    }

    pub fn data_url(&self) -> &str {
        self.data_base_url.as_deref().unwrap_or(MARKET_DATA_URL)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn schedule_offset(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.schedule_offset_minutes)
    }
}
