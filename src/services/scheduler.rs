use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::services::poller::LivePollerService;

pub struct SchedulerService {
    scheduler: Arc<Mutex<JobScheduler>>,
    poller: LivePollerService,
    interval: Duration,
}

impl SchedulerService {
    pub async fn new(
        poller: LivePollerService,
        interval: Duration,
    ) -> Result<Self, Box<dyn Error>> {
        let scheduler = JobScheduler::new().await?;

        Ok(Self {
            scheduler: Arc::new(Mutex::new(scheduler)),
            poller,
            interval,
        })
    }

    /// Registers the recurring live-data poll and starts the scheduler.
    pub async fn start(&self) -> Result<(), Box<dyn Error>> {
        let scheduler = self.scheduler.lock().await;

        let poller = self.poller.clone();
        let poll_job = Job::new_repeated_async(self.interval, move |_uuid, _l| {
            let poller = poller.clone();
            Box::pin(async move {
                poller.run_cycle().await;
            })
        })?;
        scheduler.add(poll_job).await?;

        scheduler.start().await?;
        tracing::info!(
            "✅ Scheduler started, polling live data every {}s",
            self.interval.as_secs()
        );
        Ok(())
    }

    pub async fn stop(&self) -> Result<(), Box<dyn Error>> {
        let mut scheduler = self.scheduler.lock().await;
        scheduler.shutdown().await?;

        tracing::info!("🛑 Scheduler stopped");
        Ok(())
    }
}
