use super::{Credentials, SecretsProvider};
use crate::{Error, Result};
use async_trait::async_trait;
use aws_sdk_secretsmanager::error::DisplayErrorContext;

/// Credentials stored as one JSON secret in AWS Secrets Manager
pub struct AwsSecretsProvider {
    client: aws_sdk_secretsmanager::Client,
    secret_id: String,
}

impl AwsSecretsProvider {
    pub fn new(sdk_config: &aws_config::SdkConfig, secret_id: impl Into<String>) -> Self {
        Self {
            client: aws_sdk_secretsmanager::Client::new(sdk_config),
            secret_id: secret_id.into(),
        }
    }
}

#[async_trait]
impl SecretsProvider for AwsSecretsProvider {
    async fn credentials(&self) -> Result<Credentials> {
        tracing::info!(secret_id = %self.secret_id, "Fetching credentials");

        let output = self
            .client
            .get_secret_value()
            .secret_id(&self.secret_id)
            .send()
            .await
            .map_err(|e| Error::Secrets(DisplayErrorContext(e).to_string()))?;

        let blob = output
            .secret_string()
            .ok_or_else(|| Error::Secrets(format!("{} has no string value", self.secret_id)))?;

        Credentials::from_json(blob)
    }
}
