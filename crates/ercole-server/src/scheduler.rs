use ercole_engine::jobs::{ArchivedHostCleaningJob, FreshnessCheckJob};
use tokio::time::{interval, Duration};

pub struct FreshnessCheckScheduler {
    job: FreshnessCheckJob,
    tick_secs: u64,
}

impl FreshnessCheckScheduler {
    pub fn new(job: FreshnessCheckJob, tick_secs: u64) -> Self {
        Self { job, tick_secs }
    }

    pub async fn run(&self) {
        tracing::info!(tick_secs = self.tick_secs, "Freshness check scheduler started");

        let mut tick = interval(Duration::from_secs(self.tick_secs.max(1)));
        loop {
            tick.tick().await;
            if let Err(e) = self.job.run().await {
                tracing::error!(error = %e, "Freshness check failed");
            }
        }
    }
}

pub struct ArchivedHostCleaningScheduler {
    job: ArchivedHostCleaningJob,
    tick_secs: u64,
}

impl ArchivedHostCleaningScheduler {
    pub fn new(job: ArchivedHostCleaningJob, tick_secs: u64) -> Self {
        Self { job, tick_secs }
    }

    pub async fn run(&self) {
        tracing::info!(tick_secs = self.tick_secs, "Archived host cleaning scheduler started");

        let mut tick = interval(Duration::from_secs(self.tick_secs.max(1)));
        loop {
            tick.tick().await;
            if let Err(e) = self.job.run().await {
                tracing::error!(error = %e, "Archived host cleaning failed");
            }
        }
    }
}
