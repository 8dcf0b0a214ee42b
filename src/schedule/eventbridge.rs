use super::ScheduleRegistry;
use crate::{Error, Result};
use async_trait::async_trait;
use aws_sdk_eventbridge::error::DisplayErrorContext;
use aws_sdk_eventbridge::types::{RuleState, Target};

const TARGET_ID: &str = "emabot";

/// EventBridge rule invoking a Lambda function
pub struct EventBridgeRegistry {
    events: aws_sdk_eventbridge::Client,
    lambda: aws_sdk_lambda::Client,
}

impl EventBridgeRegistry {
    pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
        Self {
            events: aws_sdk_eventbridge::Client::new(sdk_config),
            lambda: aws_sdk_lambda::Client::new(sdk_config),
        }
    }
}

fn scheduler_error(err: impl std::error::Error) -> Error {
    Error::Scheduler(DisplayErrorContext(err).to_string())
}

#[async_trait]
impl ScheduleRegistry for EventBridgeRegistry {
    async fn rule_arn(&self, name: &str) -> Result<Option<String>> {
        match self.events.describe_rule().name(name).send().await {
            Ok(output) => Ok(output.arn().map(str::to_string)),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_resource_not_found_exception()) =>
            {
                Ok(None)
            }
            Err(err) => Err(scheduler_error(err)),
        }
    }

    async fn create_rule(&self, name: &str, expression: &str) -> Result<String> {
        let output = self
            .events
            .put_rule()
            .name(name)
            .schedule_expression(expression)
            .state(RuleState::Enabled)
            .send()
            .await
            .map_err(scheduler_error)?;

        output
            .rule_arn()
            .map(str::to_string)
            .ok_or_else(|| Error::Scheduler(format!("no ARN returned for rule {}", name)))
    }

    async fn attach_target(&self, name: &str, target_arn: &str) -> Result<()> {
        let target = Target::builder()
            .id(TARGET_ID)
            .arn(target_arn)
            .build()
            .map_err(scheduler_error)?;

        let output = self
            .events
            .put_targets()
            .rule(name)
            .targets(target)
            .send()
            .await
            .map_err(scheduler_error)?;

        if output.failed_entry_count() > 0 {
            return Err(Error::Scheduler(format!(
                "failed to attach target to rule {}: {:?}",
                name,
                output.failed_entries()
            )));
        }

        Ok(())
    }

    async fn grant_invoke(&self, rule_arn: &str, target_arn: &str) -> Result<()> {
        let result = self
            .lambda
            .add_permission()
            .function_name(target_arn)
            .statement_id(format!("{}-scheduled-invoke", TARGET_ID))
            .action("lambda:InvokeFunction")
            .principal("events.amazonaws.com")
            .source_arn(rule_arn)
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            // Statement left over from a rule that was deleted by hand
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_resource_conflict_exception()) =>
            {
                tracing::warn!(rule_arn, "Invoke permission already present");
                Ok(())
            }
            Err(err) => Err(scheduler_error(err)),
        }
    }

    async fn update_schedule(&self, name: &str, expression: &str) -> Result<()> {
        // PutRule on an existing name only replaces the expression
        self.events
            .put_rule()
            .name(name)
            .schedule_expression(expression)
            .state(RuleState::Enabled)
            .send()
            .await
            .map_err(scheduler_error)?;

        Ok(())
    }
}
