use std::time::Duration;

use chrono::Utc;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::activity::ActivityRegistry;
use crate::board::BoardManager;
use crate::utils::logging::log_system_event;

/// How often idle activities are looked for.
const EVICTION_PERIOD: Duration = Duration::from_secs(15 * 60);

/// Wall-clock driver of board ticks and activity garbage collection.
pub struct BoardScheduler {
    boards: BoardManager,
    registry: ActivityRegistry,
    tick_period: Duration,
    max_idle: Duration,
    scheduler: JobScheduler,
}

impl BoardScheduler {
    pub async fn new(
        boards: BoardManager,
        registry: ActivityRegistry,
        tick_period: Duration,
        max_idle: Duration,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let scheduler = JobScheduler::new().await?;

        Ok(Self {
            boards,
            registry,
            tick_period,
            max_idle,
            scheduler,
        })
    }

    pub async fn start(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let boards = self.boards.clone();
        let tick_job = Job::new_repeated_async(self.tick_period, move |_uuid, _l| {
            let boards = boards.clone();
            Box::pin(async move {
                let ticked = boards.tick_due(Utc::now()).await;
                if ticked > 0 {
                    tracing::debug!("Ticked {} message boards", ticked);
                }
            })
        })?;

        let registry = self.registry.clone();
        let max_idle = self.max_idle;
        let eviction_job = Job::new_repeated_async(EVICTION_PERIOD, move |_uuid, _l| {
            let registry = registry.clone();
            Box::pin(async move {
                let evicted = registry.evict_idle(max_idle).await;
                if evicted > 0 {
                    tracing::info!("Evicted {} idle activities", evicted);
                }
            })
        })?;

        self.scheduler.add(tick_job).await?;
        self.scheduler.add(eviction_job).await?;
        self.scheduler.start().await?;

        log_system_event(
            "board scheduler started",
            Some(&format!(
                "ticking boards every {}s, evicting activities idle for {}s",
                self.tick_period.as_secs(),
                self.max_idle.as_secs()
            )),
        );
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.scheduler.shutdown().await?;
        Ok(())
    }

    /// Runs one round of both jobs immediately.
    pub async fn run_now(&self) -> (usize, usize) {
        let ticked = self.boards.tick_due(Utc::now()).await;
        let evicted = self.registry.evict_idle(self.max_idle).await;
        (ticked, evicted)
    }
}
