//! Retention Enforcement Engine
//!
//! Promotes the latest snapshot into the policy's tier, then prunes the tier.
//!
//! ## Failure semantics
//!
//! Every step runs to completion before the next starts, and the first store
//! failure ends the run. Nothing is rolled back: a promotion copy stays in
//! place when pruning fails, and deletions made before a failing delete stay
//! committed.

use chrono::{DateTime, Utc};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::artifact::{Artifact, order_newest_first};
use crate::config::{ComparisonMode, Tier};
use crate::error::{RetentionError, Stage};
use crate::policy::RetentionPolicy;
use crate::store::Store;

/// Copy made (or planned, in dry-run mode) by the promotion step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Promotion {
    pub source: String,
    pub destination: String,
}

/// Result of one enforcement run
#[derive(Debug, Clone)]
pub struct EnforcementReport {
    pub tier: Tier,
    pub mode: ComparisonMode,
    pub dry_run: bool,
    pub promoted: Option<Promotion>,
    /// Artifacts found in the tier before pruning.
    pub evaluated: usize,
    /// Deleted artifacts, newest first. Planned deletions in dry-run mode.
    pub deleted: Vec<String>,
    /// Artifacts left in the tier, newest first.
    pub retained: Vec<String>,
    /// Age cutoff applied in datetime mode.
    pub cutoff: Option<DateTime<Utc>>,
    pub duration_ms: u64,
}

impl EnforcementReport {
    /// Human-readable summary for logging.
    pub fn log(&self) {
        info!(
            tier = %self.tier,
            mode = %self.mode,
            dry_run = self.dry_run,
            promoted = self.promoted.as_ref().map(|p| p.destination.as_str()).unwrap_or("-"),
            evaluated = self.evaluated,
            deleted = self.deleted.len(),
            retained = self.retained.len(),
            cutoff = ?self.cutoff,
            duration_ms = self.duration_ms,
            "Retention enforcement summary"
        );
    }
}

struct Pruned {
    evaluated: usize,
    deleted: Vec<String>,
    retained: Vec<String>,
    cutoff: Option<DateTime<Utc>>,
}

impl RetentionPolicy {
    /// Copy the latest snapshot into the tier and enforce the policy.
    ///
    /// Only one enforcement may run against a given tier at a time; callers
    /// must serialise runs (one scheduled job per period, or an external
    /// lock). Concurrent runs can interleave their listings with each other's
    /// copies and deletes.
    ///
    /// # Errors
    ///
    /// - [`RetentionError::NoSnapshotAvailable`] if promotion finds an empty root
    /// - [`RetentionError::Store`] for the first failing list, copy or delete
    pub async fn enforce(&self, store: &dyn Store) -> Result<EnforcementReport, RetentionError> {
        self.enforce_at(store, Utc::now()).await
    }

    /// Like [`enforce`](Self::enforce) with an explicit clock for the
    /// datetime-mode cutoff.
    pub async fn enforce_at(
        &self,
        store: &dyn Store,
        now: DateTime<Utc>,
    ) -> Result<EnforcementReport, RetentionError> {
        let started = Instant::now();

        info!(
            tier = %self.tier(),
            mode = %self.mode(),
            keep = self.keep(),
            dry_run = self.dry_run(),
            "Starting retention enforcement"
        );

        let promoted = if self.tier().is_snapshot() {
            None
        } else {
            Some(self.promote(store).await?)
        };

        let pruned = self.prune(store, now).await?;

        Ok(EnforcementReport {
            tier: self.tier(),
            mode: self.mode(),
            dry_run: self.dry_run(),
            promoted,
            evaluated: pruned.evaluated,
            deleted: pruned.deleted,
            retained: pruned.retained,
            cutoff: pruned.cutoff,
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        })
    }

    async fn promote(&self, store: &dyn Store) -> Result<Promotion, RetentionError> {
        let mut candidates = store
            .list(Tier::Snapshot.prefix())
            .await
            .map_err(RetentionError::during(Stage::Promotion))?;

        debug!(candidates = candidates.len(), "Listed snapshots");

        order_newest_first(&mut candidates);
        let latest = candidates
            .into_iter()
            .next()
            .ok_or(RetentionError::NoSnapshotAvailable)?;

        let destination = format!("{}/{}", self.tier().prefix(), latest.name);

        if self.dry_run() {
            info!(
                source = %latest.name,
                destination = %destination,
                "Dry run: would promote latest snapshot"
            );
        } else {
            if let Err(e) = store.copy(&latest.name, &destination).await {
                warn!(
                    source = %latest.name,
                    destination = %destination,
                    error = %e,
                    "Promotion failed, skipping pruning"
                );
                return Err(RetentionError::during(Stage::Promotion)(e));
            }

            info!(
                source = %latest.name,
                destination = %destination,
                created_at = %latest.created_at.to_rfc3339(),
                size_bytes = latest.size_bytes,
                "Promoted latest snapshot"
            );
        }

        Ok(Promotion {
            source: latest.name,
            destination,
        })
    }

    async fn prune(&self, store: &dyn Store, now: DateTime<Utc>) -> Result<Pruned, RetentionError> {
        let mut artifacts = store
            .list(self.tier().prefix())
            .await
            .map_err(RetentionError::during(Stage::Pruning))?;
        let evaluated = artifacts.len();

        debug!(tier = %self.tier(), artifacts = evaluated, "Listed tier");

        let (expired, cutoff) = match self.mode() {
            ComparisonMode::Count => {
                if artifacts.len() < self.keep() {
                    debug!(
                        tier = %self.tier(),
                        artifacts = evaluated,
                        keep = self.keep(),
                        "Tier under quota, nothing to prune"
                    );
                    order_newest_first(&mut artifacts);
                    return Ok(Pruned {
                        evaluated,
                        deleted: vec![],
                        retained: names(artifacts),
                        cutoff: None,
                    });
                }

                order_newest_first(&mut artifacts);
                (artifacts.split_off(self.keep()), None)
            }
            ComparisonMode::Datetime => {
                let cutoff = self.cutoff(now);
                order_newest_first(&mut artifacts);
                // The newest artifact survives regardless of age
                let split = match artifacts.get(1..) {
                    Some(older) => 1 + older.partition_point(|a| a.created_at >= cutoff),
                    None => 0,
                };
                (artifacts.split_off(split), Some(cutoff))
            }
        };

        let mut deleted = Vec::with_capacity(expired.len());
        for artifact in expired {
            if self.dry_run() {
                info!(
                    path = %artifact.name,
                    created_at = %artifact.created_at.to_rfc3339(),
                    size_bytes = artifact.size_bytes,
                    "Dry run: would delete artifact"
                );
                deleted.push(artifact.name);
                continue;
            }

            if let Err(e) = store.delete(&artifact.name).await {
                warn!(
                    path = %artifact.name,
                    already_deleted = deleted.len(),
                    error = %e,
                    "Deletion failed, aborting prune"
                );
                return Err(RetentionError::during(Stage::Pruning)(e));
            }

            info!(
                path = %artifact.name,
                created_at = %artifact.created_at.to_rfc3339(),
                size_bytes = artifact.size_bytes,
                "Deleted artifact"
            );
            deleted.push(artifact.name);
        }

        Ok(Pruned {
            evaluated,
            deleted,
            retained: names(artifacts),
            cutoff,
        })
    }
}

fn names(artifacts: Vec<Artifact>) -> Vec<String> {
    artifacts.into_iter().map(|a| a.name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::store::MockStore;
    use chrono::TimeDelta;
    use mockall::Sequence;
    use std::io;
    use std::time::Duration;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn artifacts(entries: &[(&str, i64)]) -> Vec<Artifact> {
        entries
            .iter()
            .map(|(name, secs)| Artifact::new(*name, at(*secs)))
            .collect()
    }

    fn expect_list(store: &mut MockStore, prefix: &'static str, listing: Vec<Artifact>) {
        store
            .expect_list()
            .withf(move |p: &str| p == prefix)
            .times(1)
            .returning(move |_| Ok(listing.clone()));
    }

    #[tokio::test]
    async fn test_promotion_selects_most_recent() {
        let mut store = MockStore::new();
        expect_list(&mut store, "", artifacts(&[("a", 1), ("b", 5), ("c", 3)]));
        store
            .expect_copy()
            .withf(|source: &str, destination: &str| source == "b" && destination == "daily/b")
            .times(1)
            .returning(|_, _| Ok(()));
        expect_list(&mut store, "daily", artifacts(&[("daily/b", 6)]));
        store.expect_delete().never();

        let policy = RetentionPolicy::new("daily", "count", 3).unwrap();
        let report = policy.enforce(&store).await.unwrap();

        assert_eq!(
            report.promoted,
            Some(Promotion {
                source: "b".to_string(),
                destination: "daily/b".to_string(),
            })
        );
        assert!(report.deleted.is_empty());
        assert_eq!(report.retained, vec!["daily/b"]);
    }

    #[tokio::test]
    async fn test_snapshot_tier_never_promotes() {
        let mut store = MockStore::new();
        expect_list(&mut store, "", artifacts(&[("a", 1), ("b", 2)]));
        store.expect_copy().never();
        store.expect_delete().never();

        let policy = RetentionPolicy::new("", "count", 5).unwrap();
        let report = policy.enforce(&store).await.unwrap();

        assert!(report.promoted.is_none());
        assert_eq!(report.evaluated, 2);
        assert_eq!(report.retained, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_prune_keeps_most_recent() {
        let mut store = MockStore::new();
        expect_list(&mut store, "", artifacts(&[("s", 100)]));
        store.expect_copy().times(1).returning(|_, _| Ok(()));
        expect_list(
            &mut store,
            "weekly",
            artifacts(&[
                ("weekly/c", 30),
                ("weekly/a", 10),
                ("weekly/e", 50),
                ("weekly/b", 20),
                ("weekly/d", 40),
            ]),
        );
        for name in ["weekly/a", "weekly/b"] {
            store
                .expect_delete()
                .withf(move |p: &str| p == name)
                .times(1)
                .returning(|_| Ok(()));
        }

        let policy = RetentionPolicy::new("weekly", "count", 3).unwrap();
        let report = policy.enforce(&store).await.unwrap();

        assert_eq!(report.evaluated, 5);
        assert_eq!(report.deleted, vec!["weekly/b", "weekly/a"]);
        assert_eq!(report.retained, vec!["weekly/e", "weekly/d", "weekly/c"]);
    }

    #[tokio::test]
    async fn test_no_deletes_under_quota() {
        let mut store = MockStore::new();
        expect_list(&mut store, "", artifacts(&[("a", 1), ("b", 2)]));
        store.expect_delete().never();

        let policy = RetentionPolicy::new("", "count", 3).unwrap();
        let report = policy.enforce(&store).await.unwrap();

        assert!(report.deleted.is_empty());
        assert_eq!(report.retained.len(), 2);
    }

    #[tokio::test]
    async fn test_no_deletes_at_quota() {
        let mut store = MockStore::new();
        expect_list(&mut store, "", artifacts(&[("a", 1), ("b", 2), ("c", 3)]));
        store.expect_delete().never();

        let policy = RetentionPolicy::new("", "count", 3).unwrap();
        let report = policy.enforce(&store).await.unwrap();

        assert!(report.deleted.is_empty());
        assert_eq!(report.retained, vec!["c", "b", "a"]);
    }

    #[tokio::test]
    async fn test_keep_zero_deletes_everything() {
        let mut store = MockStore::new();
        expect_list(&mut store, "", artifacts(&[("a", 1), ("b", 2)]));
        store.expect_delete().times(2).returning(|_| Ok(()));

        let policy = RetentionPolicy::new("", "count", 0).unwrap();
        let report = policy.enforce(&store).await.unwrap();

        assert_eq!(report.deleted, vec!["b", "a"]);
        assert!(report.retained.is_empty());
    }

    #[tokio::test]
    async fn test_empty_root_fails_promotion() {
        let mut store = MockStore::new();
        expect_list(&mut store, "", vec![]);
        store.expect_copy().never();
        store.expect_delete().never();

        let policy = RetentionPolicy::new("weekly", "count", 3).unwrap();
        let err = policy.enforce(&store).await.unwrap_err();

        assert!(matches!(err, RetentionError::NoSnapshotAvailable));
    }

    #[tokio::test]
    async fn test_copy_failure_skips_pruning() {
        let mut store = MockStore::new();
        expect_list(&mut store, "", artifacts(&[("a", 1)]));
        store.expect_copy().times(1).returning(|source, destination| {
            Err(StoreError::copy(
                source,
                destination,
                io::Error::other("quota exceeded"),
            ))
        });
        store.expect_delete().never();

        let policy = RetentionPolicy::new("monthly", "count", 1).unwrap();
        let err = policy.enforce(&store).await.unwrap_err();

        assert_eq!(err.stage(), Some(Stage::Promotion));
        assert!(matches!(
            err,
            RetentionError::Store {
                source: StoreError::CopyFailed { .. },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_list_failure_is_propagated() {
        let mut store = MockStore::new();
        store.expect_list().times(1).returning(|prefix| {
            Err(StoreError::list(
                prefix,
                io::Error::from(io::ErrorKind::NotFound),
            ))
        });

        let policy = RetentionPolicy::new("", "count", 1).unwrap();
        let err = policy.enforce(&store).await.unwrap_err();

        assert_eq!(err.stage(), Some(Stage::Pruning));
        assert!(matches!(
            err,
            RetentionError::Store {
                source: StoreError::ListFailed { .. },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_partial_failure_is_not_rolled_back() {
        let mut store = MockStore::new();
        expect_list(
            &mut store,
            "",
            artifacts(&[("a", 1), ("b", 2), ("c", 3), ("d", 4)]),
        );

        let mut seq = Sequence::new();
        store
            .expect_delete()
            .withf(|p: &str| p == "c")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        store
            .expect_delete()
            .withf(|p: &str| p == "b")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|path| Err(StoreError::delete(path, io::Error::other("permission denied"))));

        let policy = RetentionPolicy::new("", "count", 1).unwrap();
        let err = policy.enforce(&store).await.unwrap_err();

        // "a" was never attempted; an unexpected call would panic the mock
        assert_eq!(err.stage(), Some(Stage::Pruning));
        assert!(matches!(
            err,
            RetentionError::Store {
                source: StoreError::DeleteFailed { ref path, .. },
                ..
            } if path == "b"
        ));
    }

    #[tokio::test]
    async fn test_equal_timestamps_promote_greatest_name() {
        let mut store = MockStore::new();
        expect_list(
            &mut store,
            "",
            artifacts(&[("backup-2", 5), ("backup-3", 5), ("backup-1", 5)]),
        );
        store
            .expect_copy()
            .withf(|source: &str, destination: &str| {
                source == "backup-3" && destination == "yearly/backup-3"
            })
            .times(1)
            .returning(|_, _| Ok(()));
        expect_list(&mut store, "yearly", vec![]);

        let policy = RetentionPolicy::new("yearly", "count", 1).unwrap();
        policy.enforce(&store).await.unwrap();
    }

    #[tokio::test]
    async fn test_dry_run_does_not_mutate() {
        let mut store = MockStore::new();
        expect_list(&mut store, "", artifacts(&[("a", 1), ("b", 9)]));
        expect_list(
            &mut store,
            "daily",
            artifacts(&[("daily/x", 1), ("daily/y", 2), ("daily/z", 3)]),
        );
        store.expect_copy().never();
        store.expect_delete().never();

        let policy = RetentionPolicy::builder("daily", "count", 1)
            .dry_run(true)
            .build()
            .unwrap();
        let report = policy.enforce(&store).await.unwrap();

        assert!(report.dry_run);
        assert_eq!(report.promoted.unwrap().destination, "daily/b");
        assert_eq!(report.deleted, vec!["daily/y", "daily/x"]);
        assert_eq!(report.retained, vec!["daily/z"]);
    }

    #[tokio::test]
    async fn test_datetime_mode_deletes_older_than_cutoff() {
        let day = 24 * 3600;
        let now = at(100 * day);

        let mut store = MockStore::new();
        expect_list(&mut store, "", artifacts(&[("s", 100 * day)]));
        store.expect_copy().times(1).returning(|_, _| Ok(()));
        expect_list(
            &mut store,
            "weekly",
            artifacts(&[
                ("weekly/1d", 99 * day),
                ("weekly/10d", 90 * day),
                ("weekly/20d", 80 * day),
                ("weekly/30d", 70 * day),
            ]),
        );
        for name in ["weekly/20d", "weekly/30d"] {
            store
                .expect_delete()
                .withf(move |p: &str| p == name)
                .times(1)
                .returning(|_| Ok(()));
        }

        // Two weekly periods: a 14 day window
        let policy = RetentionPolicy::new("weekly", "datetime", 2).unwrap();
        let report = policy.enforce_at(&store, now).await.unwrap();

        assert_eq!(report.cutoff, Some(now - TimeDelta::days(14)));
        assert_eq!(report.deleted, vec!["weekly/20d", "weekly/30d"]);
        assert_eq!(report.retained, vec!["weekly/1d", "weekly/10d"]);
    }

    #[tokio::test]
    async fn test_datetime_mode_keeps_newest() {
        let now = at(1_000_000);

        let mut store = MockStore::new();
        expect_list(&mut store, "", artifacts(&[("a", 1_000), ("b", 2_000)]));
        store
            .expect_delete()
            .withf(|p: &str| p == "a")
            .times(1)
            .returning(|_| Ok(()));

        let policy = RetentionPolicy::builder("", "datetime", 10)
            .max_age(Duration::from_secs(60))
            .build()
            .unwrap();
        let report = policy.enforce_at(&store, now).await.unwrap();

        assert_eq!(report.deleted, vec!["a"]);
        assert_eq!(report.retained, vec!["b"]);
    }

    #[tokio::test]
    async fn test_invalid_configuration_touches_no_store() {
        // No expectations: any store call would panic
        let _store = MockStore::new();

        assert!(matches!(
            RetentionPolicy::new("biweekly", "count", 3),
            Err(RetentionError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            RetentionPolicy::new("daily", "newest", 3),
            Err(RetentionError::InvalidConfiguration(_))
        ));
    }
}
