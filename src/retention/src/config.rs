//! Retention tiers and comparison modes.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::RetentionError;

const DAY: Duration = Duration::from_secs(24 * 3600);

/// Retention tier, stored under a path prefix of the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// The root of the store, where fresh backups land.
    Snapshot,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Tier {
    pub const ALL: [Tier; 5] = [
        Tier::Snapshot,
        Tier::Daily,
        Tier::Weekly,
        Tier::Monthly,
        Tier::Yearly,
    ];

    /// Path prefix of the tier inside the store. Empty for snapshots.
    pub fn prefix(&self) -> &'static str {
        match self {
            Tier::Snapshot => "",
            Tier::Daily => "daily",
            Tier::Weekly => "weekly",
            Tier::Monthly => "monthly",
            Tier::Yearly => "yearly",
        }
    }

    pub fn is_snapshot(&self) -> bool {
        matches!(self, Tier::Snapshot)
    }

    /// Nominal length of one period, used to derive the datetime-mode window.
    ///
    /// Snapshots have no period.
    pub fn nominal_period(&self) -> Option<Duration> {
        match self {
            Tier::Snapshot => None,
            Tier::Daily => Some(DAY),
            Tier::Weekly => Some(DAY * 7),
            Tier::Monthly => Some(DAY * 30),
            Tier::Yearly => Some(DAY * 365),
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Snapshot => write!(f, "snapshot"),
            other => write!(f, "{}", other.prefix()),
        }
    }
}

impl FromStr for Tier {
    type Err = RetentionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "snapshot" => Ok(Tier::Snapshot),
            "daily" => Ok(Tier::Daily),
            "weekly" => Ok(Tier::Weekly),
            "monthly" => Ok(Tier::Monthly),
            "yearly" => Ok(Tier::Yearly),
            other => Err(RetentionError::InvalidConfiguration(format!(
                "invalid period specified: '{other}' (expected one of \"\", daily, weekly, monthly, yearly)"
            ))),
        }
    }
}

/// How the pruning step decides which artifacts expire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ComparisonMode {
    /// Keep the N most recent artifacts.
    #[default]
    Count,
    /// Expire artifacts older than a cutoff.
    Datetime,
}

impl fmt::Display for ComparisonMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparisonMode::Count => write!(f, "count"),
            ComparisonMode::Datetime => write!(f, "datetime"),
        }
    }
}

impl FromStr for ComparisonMode {
    type Err = RetentionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "count" => Ok(ComparisonMode::Count),
            "datetime" => Ok(ComparisonMode::Datetime),
            other => Err(RetentionError::InvalidConfiguration(format!(
                "invalid mode specified: '{other}' (expected count or datetime)"
            ))),
        }
    }
}
