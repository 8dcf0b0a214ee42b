// Self-rescheduling: each run programs the time of the next one
pub mod eventbridge;

pub use eventbridge::EventBridgeRegistry;

use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc};
use std::sync::Arc;

/// Host scheduler holding the recurring-invocation rule
#[async_trait]
pub trait ScheduleRegistry: Send + Sync {
    /// ARN of the rule, or `None` when it does not exist
    async fn rule_arn(&self, name: &str) -> Result<Option<String>>;

    /// Create the rule and return its ARN
    async fn create_rule(&self, name: &str, expression: &str) -> Result<String>;

    /// Point the rule at the process to invoke; repeat calls are upserts
    async fn attach_target(&self, name: &str, target_arn: &str) -> Result<()>;

    /// Allow the scheduler to invoke the target on behalf of the rule;
    /// an existing grant counts as success
    async fn grant_invoke(&self, rule_arn: &str, target_arn: &str) -> Result<()>;

    async fn update_schedule(&self, name: &str, expression: &str) -> Result<()>;
}

/// Rule state after a reschedule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRule {
    pub name: String,
    pub cron_expression: String,
    pub target_arn: String,
}

/// One-shot cron firing only at the given minute of the given day
///
/// Fields come from `at` as-is, so callers pick the timezone.
pub fn one_shot_cron<Tz: TimeZone>(at: &DateTime<Tz>) -> String {
    format!(
        "cron({} {} {} {} ? {})",
        at.minute(),
        at.hour(),
        at.day(),
        at.month(),
        at.year()
    )
}

/// Programs the next invocation shortly before market close
pub struct Rescheduler {
    registry: Arc<dyn ScheduleRegistry>,
    rule_name: String,
    target_arn: String,
    offset: Duration,
}

impl Rescheduler {
    pub fn new(
        registry: Arc<dyn ScheduleRegistry>,
        rule_name: impl Into<String>,
        target_arn: impl Into<String>,
        offset: Duration,
    ) -> Self {
        Self {
            registry,
            rule_name: rule_name.into(),
            target_arn: target_arn.into(),
            offset,
        }
    }

    /// Cron expression for `offset` before `next_close`, in UTC
    pub fn expression_for(&self, next_close: DateTime<Utc>) -> String {
        one_shot_cron(&(next_close - self.offset))
    }

    /// Create the rule if missing, then (re)apply its target and invoke permission
    ///
    /// Target and permission are applied on every run, so a bootstrap that
    /// stopped halfway is completed by the next one. Returns true when the
    /// rule had to be created.
    pub async fn ensure_rule(&self, expression: &str) -> Result<bool> {
        let (rule_arn, created) = match self.registry.rule_arn(&self.rule_name).await? {
            Some(arn) => (arn, false),
            None => {
                tracing::info!(rule = %self.rule_name, "Schedule rule missing, creating it");
                let arn = self.registry.create_rule(&self.rule_name, expression).await?;
                (arn, true)
            }
        };

        self.registry
            .attach_target(&self.rule_name, &self.target_arn)
            .await?;
        self.registry.grant_invoke(&rule_arn, &self.target_arn).await?;

        Ok(created)
    }

    /// Schedule the next run relative to `next_close`
    pub async fn reschedule(&self, next_close: DateTime<Utc>) -> Result<ScheduleRule> {
        let expression = self.expression_for(next_close);

        self.ensure_rule(&expression).await?;
        self.registry
            .update_schedule(&self.rule_name, &expression)
            .await?;

        tracing::info!(
            rule = %self.rule_name,
            %next_close,
            expression = %expression,
            "Next run scheduled"
        );

        Ok(ScheduleRule {
            name: self.rule_name.clone(),
            cron_expression: expression,
            target_arn: self.target_arn.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use chrono::FixedOffset;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    /// In-memory registry with the same upsert semantics as the real one
    #[derive(Default)]
    struct MemoryRegistry {
        rules: Mutex<HashMap<String, String>>,
        targets: Mutex<HashSet<(String, String)>>,
        grants: Mutex<HashSet<(String, String)>>,
        updates: Mutex<u32>,
        failing_attaches: Mutex<u32>,
    }

    impl MemoryRegistry {
        fn failing_first_attach() -> Self {
            Self {
                failing_attaches: Mutex::new(1),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl ScheduleRegistry for MemoryRegistry {
        async fn rule_arn(&self, name: &str) -> Result<Option<String>> {
            Ok(self
                .rules
                .lock()
                .unwrap()
                .contains_key(name)
                .then(|| format!("arn:aws:events:us-east-1:123:rule/{}", name)))
        }

        async fn create_rule(&self, name: &str, expression: &str) -> Result<String> {
            self.rules
                .lock()
                .unwrap()
                .insert(name.to_string(), expression.to_string());
            Ok(format!("arn:aws:events:us-east-1:123:rule/{}", name))
        }

        async fn attach_target(&self, name: &str, target_arn: &str) -> Result<()> {
            {
                let mut failing = self.failing_attaches.lock().unwrap();
                if *failing > 0 {
                    *failing -= 1;
                    return Err(Error::Scheduler("ThrottlingException".to_string()));
                }
            }
            self.targets
                .lock()
                .unwrap()
                .insert((name.to_string(), target_arn.to_string()));
            Ok(())
        }

        async fn grant_invoke(&self, rule_arn: &str, target_arn: &str) -> Result<()> {
            self.grants
                .lock()
                .unwrap()
                .insert((rule_arn.to_string(), target_arn.to_string()));
            Ok(())
        }

        async fn update_schedule(&self, name: &str, expression: &str) -> Result<()> {
            self.rules
                .lock()
                .unwrap()
                .insert(name.to_string(), expression.to_string());
            *self.updates.lock().unwrap() += 1;
            Ok(())
        }
    }

    const TARGET: &str = "arn:aws:lambda:us-east-1:123:function:emabot";
    const RULE_ARN: &str = "arn:aws:events:us-east-1:123:rule/emabot-next-close";

    fn rescheduler(registry: Arc<MemoryRegistry>) -> Rescheduler {
        Rescheduler::new(registry, "emabot-next-close", TARGET, Duration::minutes(2))
    }

    #[test]
    fn test_one_shot_cron() {
        let close = Utc.with_ymd_and_hms(2024, 6, 10, 16, 0, 0).unwrap();
        assert_eq!(
            one_shot_cron(&(close - Duration::minutes(2))),
            "cron(58 15 10 6 ? 2024)"
        );
    }

    #[test]
    fn test_expression_crosses_day_boundary() {
        let registry = Arc::new(MemoryRegistry::default());
        let close = Utc.with_ymd_and_hms(2024, 1, 1, 0, 1, 0).unwrap();
        assert_eq!(
            rescheduler(registry).expression_for(close),
            "cron(59 23 31 12 ? 2023)"
        );
    }

    #[test]
    fn test_expression_is_in_utc() {
        let registry = Arc::new(MemoryRegistry::default());
        let eastern = FixedOffset::west_opt(4 * 3600).unwrap();
        let close = eastern
            .with_ymd_and_hms(2024, 6, 10, 16, 0, 0)
            .unwrap()
            .with_timezone(&Utc);

        assert_eq!(
            rescheduler(registry).expression_for(close),
            "cron(58 19 10 6 ? 2024)"
        );
    }

    #[tokio::test]
    async fn test_bootstrap_is_idempotent() {
        let registry = Arc::new(MemoryRegistry::default());
        let scheduler = rescheduler(registry.clone());

        let first_close = Utc.with_ymd_and_hms(2024, 6, 10, 20, 0, 0).unwrap();
        let second_close = Utc.with_ymd_and_hms(2024, 6, 11, 20, 0, 0).unwrap();

        scheduler.reschedule(first_close).await.unwrap();
        let rule = scheduler.reschedule(second_close).await.unwrap();

        assert_eq!(registry.rules.lock().unwrap().len(), 1);
        assert_eq!(registry.targets.lock().unwrap().len(), 1);
        assert_eq!(registry.grants.lock().unwrap().len(), 1);
        assert_eq!(*registry.updates.lock().unwrap(), 2);

        assert_eq!(rule.cron_expression, "cron(58 19 11 6 ? 2024)");
        assert_eq!(
            registry.rules.lock().unwrap()["emabot-next-close"],
            "cron(58 19 11 6 ? 2024)"
        );
    }

    #[tokio::test]
    async fn test_grant_uses_created_rule_arn() {
        let registry = Arc::new(MemoryRegistry::default());
        let created = rescheduler(registry.clone())
            .ensure_rule("cron(58 19 10 6 ? 2024)")
            .await
            .unwrap();

        assert!(created);
        let grants = registry.grants.lock().unwrap();
        assert!(grants.contains(&(RULE_ARN.to_string(), TARGET.to_string())));
    }

    #[tokio::test]
    async fn test_failed_target_attach_is_repaired_next_run() {
        let registry = Arc::new(MemoryRegistry::failing_first_attach());
        let scheduler = rescheduler(registry.clone());
        let close = Utc.with_ymd_and_hms(2024, 6, 10, 20, 0, 0).unwrap();

        // Rule created, target not attached
        assert!(matches!(
            scheduler.reschedule(close).await,
            Err(Error::Scheduler(_))
        ));
        assert_eq!(registry.rules.lock().unwrap().len(), 1);
        assert!(registry.targets.lock().unwrap().is_empty());

        let created = scheduler.ensure_rule("cron(58 19 10 6 ? 2024)").await.unwrap();
        assert!(!created);

        let targets = registry.targets.lock().unwrap();
        assert!(targets.contains(&("emabot-next-close".to_string(), TARGET.to_string())));
        let grants = registry.grants.lock().unwrap();
        assert!(grants.contains(&(RULE_ARN.to_string(), TARGET.to_string())));
    }
}
