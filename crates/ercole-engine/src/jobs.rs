//! Periodic jobs sharing the engine's ports.

use std::sync::Arc;

use chrono::Duration;

use crate::alerts::{self, AlertThrower};
use crate::error::{EngineError, Result};
use crate::ports::{AlertSink, HostStore};
use crate::Clock;

/// Throws NO_DATA for every host that stopped reporting.
///
/// Every run deletes all NO_DATA alerts before raising fresh ones, so it
/// may overlap with ingestions without leaving duplicates behind.
pub struct FreshnessCheckJob {
    store: Arc<dyn HostStore>,
    thrower: AlertThrower,
    days_threshold: i64,
    clock: Clock,
}

impl FreshnessCheckJob {
    pub fn new(
        store: Arc<dyn HostStore>,
        alert_sink: Arc<dyn AlertSink>,
        days_threshold: i64,
        clock: Clock,
    ) -> Self {
        Self {
            store,
            thrower: AlertThrower::new(alert_sink, clock.clone()),
            days_threshold,
            clock,
        }
    }

    /// Returns the number of NO_DATA alerts thrown.
    pub async fn run(&self) -> Result<usize> {
        if self.days_threshold <= 0 {
            return Err(EngineError::InvalidConfig(format!(
                "freshness check days_threshold must be higher than 0, got {}",
                self.days_threshold
            )));
        }

        self.thrower.sink().delete_no_data_alerts(None).await?;

        let now = (self.clock)();
        let hosts = self
            .store
            .find_old_current_hosts(now - Duration::days(self.days_threshold))
            .await?;

        let mut thrown = 0;
        for host in &hosts {
            let elapsed_days = (now - host.created_at).num_days();
            match self
                .thrower
                .throw(alerts::no_data_alert(&host.hostname, elapsed_days))
                .await
            {
                Ok(()) => thrown += 1,
                Err(e) => tracing::error!(
                    error = %e,
                    hostname = %host.hostname,
                    "Failed to throw NO_DATA alert"
                ),
            }
        }
        tracing::info!(stale_hosts = hosts.len(), thrown, "Freshness check completed");
        Ok(thrown)
    }
}

/// Deletes archived snapshots once they are older than the threshold.
pub struct ArchivedHostCleaningJob {
    store: Arc<dyn HostStore>,
    hours_threshold: i64,
    clock: Clock,
}

impl ArchivedHostCleaningJob {
    pub fn new(store: Arc<dyn HostStore>, hours_threshold: i64, clock: Clock) -> Self {
        Self {
            store,
            hours_threshold,
            clock,
        }
    }

    /// Returns the number of snapshots deleted.
    pub async fn run(&self) -> Result<u64> {
        if self.hours_threshold <= 0 {
            return Err(EngineError::InvalidConfig(format!(
                "archived host cleaning hours_threshold must be higher than 0, got {}",
                self.hours_threshold
            )));
        }
        let before = (self.clock)() - Duration::hours(self.hours_threshold);
        let deleted = self.store.delete_archived_host_data_older_than(before).await?;
        if deleted > 0 {
            tracing::info!(deleted, "Archived hostdata removed");
        }
        Ok(deleted)
    }
}
