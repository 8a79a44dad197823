//! Validated retention policy.

use chrono::{DateTime, TimeDelta, Utc};
use std::time::Duration;

use common::config::PolicyConfig;

use crate::config::{ComparisonMode, Tier};
use crate::error::RetentionError;

/// Frequency and number of backups to keep.
///
/// Built once per invocation from validated input and not mutated afterwards.
/// See [`RetentionPolicy::enforce`](crate::RetentionPolicy::enforce) for the
/// algorithm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPolicy {
    tier: Tier,
    mode: ComparisonMode,
    keep: usize,
    max_age: Option<Duration>,
    dry_run: bool,
}

impl RetentionPolicy {
    /// Validate freeform input and return a policy.
    ///
    /// # Errors
    ///
    /// Returns [`RetentionError::InvalidConfiguration`] if the period or mode
    /// is unknown, or if datetime mode is requested for the snapshot tier
    /// (which has no period to derive an age window from).
    pub fn new(period: &str, mode: &str, keep: usize) -> Result<Self, RetentionError> {
        Self::builder(period, mode, keep).build()
    }

    pub fn builder(
        period: impl Into<String>,
        mode: impl Into<String>,
        keep: usize,
    ) -> RetentionPolicyBuilder {
        RetentionPolicyBuilder {
            period: period.into(),
            mode: mode.into(),
            keep,
            max_age: None,
            dry_run: false,
        }
    }

    /// Build a policy from the `[policy]` configuration section.
    pub fn from_config(config: &PolicyConfig) -> Result<Self, RetentionError> {
        let keep = config.keep.ok_or_else(|| {
            RetentionError::InvalidConfiguration("number of backups to keep is required".into())
        })?;

        let mut builder =
            Self::builder(config.period.as_str(), config.mode.as_str(), keep).dry_run(config.dry_run);
        if let Some(max_age) = config.max_age {
            builder = builder.max_age(max_age);
        }
        builder.build()
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn mode(&self) -> ComparisonMode {
        self.mode
    }

    pub fn keep(&self) -> usize {
        self.keep
    }

    pub fn max_age(&self) -> Option<Duration> {
        self.max_age
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Age window used by datetime mode.
    ///
    /// An explicit `max_age` wins; otherwise `keep` periods of the tier.
    pub fn age_window(&self) -> Duration {
        if let Some(max_age) = self.max_age {
            return max_age;
        }

        let period = self.tier.nominal_period().unwrap_or_default();
        let keep = u64::try_from(self.keep).unwrap_or(u64::MAX);
        Duration::from_secs(period.as_secs().saturating_mul(keep))
    }

    /// Instant before which tier artifacts expire in datetime mode.
    ///
    /// Saturates to the earliest representable instant when the window
    /// reaches past it, so nothing expires.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        TimeDelta::from_std(self.age_window())
            .ok()
            .and_then(|window| now.checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// Collects optional settings before validation.
#[derive(Debug, Clone)]
pub struct RetentionPolicyBuilder {
    period: String,
    mode: String,
    keep: usize,
    max_age: Option<Duration>,
    dry_run: bool,
}

impl RetentionPolicyBuilder {
    /// Explicit age window for datetime mode.
    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// Decide but do not copy or delete.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn build(self) -> Result<RetentionPolicy, RetentionError> {
        let tier: Tier = self.period.parse()?;
        let mode: ComparisonMode = self.mode.parse()?;

        if mode == ComparisonMode::Datetime && tier.is_snapshot() && self.max_age.is_none() {
            return Err(RetentionError::InvalidConfiguration(
                "datetime mode on the snapshot tier requires max_age".into(),
            ));
        }

        Ok(RetentionPolicy {
            tier,
            mode,
            keep: self.keep,
            max_age: self.max_age,
            dry_run: self.dry_run,
        })
    }
}
