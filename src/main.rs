use anyhow::Context;
use emabot::api::AlpacaClient;
use emabot::bot::{Bot, BotConfig};
use emabot::config::{LogFormat, SecretsSource, Settings};
use emabot::execution::PollPolicy;
use emabot::notify::SmtpNotifier;
use emabot::schedule::{EventBridgeRegistry, Rescheduler};
use emabot::secrets::{AwsSecretsProvider, EnvSecretsProvider, SecretsProvider};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let settings = Settings::load().context("Failed to load settings")?;
    setup_logging(settings.log_format);

    tracing::info!(
        symbol = %settings.symbol,
        paper = settings.paper,
        "🚀 emabot cycle starting"
    );

    let aws_config = load_aws_config(&settings).await;

    // Credentials first: nothing trades without them
    let secrets: Box<dyn SecretsProvider> = match settings.secrets_source {
        SecretsSource::Aws => Box::new(AwsSecretsProvider::new(&aws_config, &settings.secret_id)),
        SecretsSource::Env => Box::new(EnvSecretsProvider),
    };
    let credentials = secrets
        .credentials()
        .await
        .context("Failed to retrieve credentials")?;

    let alpaca = Arc::new(AlpacaClient::new(
        &credentials.alpaca_api_key,
        &credentials.alpaca_secret_key,
        settings.trading_url(),
        settings.data_url(),
        &settings.data_feed,
    )?);

    let notifier = Arc::new(SmtpNotifier::new(
        &settings.smtp_host,
        settings.smtp_port,
        &credentials.sender_email,
        &credentials.sender_password,
        &credentials.recipient_email,
    )?);

    let rescheduler = Rescheduler::new(
        Arc::new(EventBridgeRegistry::new(&aws_config)),
        &settings.rule_name,
        &settings.target_arn,
        settings.schedule_offset(),
    );

    let config = BotConfig {
        symbol: settings.symbol.clone(),
        ema_period: settings.ema_period,
        poll_policy: PollPolicy {
            interval: settings.poll_interval(),
            max_attempts: settings.poll_max_attempts,
        },
    };

    let bot = Bot::new(alpaca.clone(), alpaca, notifier, rescheduler, config);
    let outcome = bot.run().await.context("Trading cycle failed")?;

    tracing::info!(
        signal = ?outcome.signal,
        filled = outcome.execution.as_ref().map(|e| e.is_filled()),
        notified = outcome.notified,
        next_run = %outcome.schedule.cron_expression,
        "👋 emabot cycle complete"
    );

    Ok(())
}

fn setup_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("emabot=info"));

    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

async fn load_aws_config(settings: &Settings) -> aws_config::SdkConfig {
    let loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
    match &settings.aws_region {
        Some(region) => {
            loader
                .region(aws_config::Region::new(region.clone()))
                .load()
                .await
        }
        None => loader.load().await,
    }
}
