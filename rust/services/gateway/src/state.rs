//! Application state

use crate::bus::EventBus;
use lo_core::Settings;
use lo_planner::{Planner, RulePlanner};
use lo_storage::queue::RUNS_QUEUE;
use lo_storage::{
    ArtifactsRepo, AuditsRepo, DbPool, PlansRepo, ProjectsRepo, QueueClient, RunJob, RunsRepo,
    StepsRepo,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Database pool
    pub db: DbPool,

    /// Runtime settings
    pub settings: Settings,

    /// In-process pub/sub for run events
    pub bus: EventBus,

    /// Queue client for dispatching approved runs
    pub queue: QueueClient,

    /// Intent-to-plan synthesis (pluggable)
    pub planner: Arc<dyn Planner>,

    /// Prometheus exposition handle for GET /metrics
    pub prometheus: PrometheusHandle,

    /// Repositories (lazy-initialized from db pool)
    repos: Repos,
}

/// Repository container
#[derive(Clone)]
pub struct Repos {
    db: DbPool,
}

impl Repos {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub fn projects(&self) -> ProjectsRepo {
        ProjectsRepo::new(self.db.clone())
    }

    pub fn plans(&self) -> PlansRepo {
        PlansRepo::new(self.db.clone())
    }

    pub fn runs(&self) -> RunsRepo {
        RunsRepo::new(self.db.clone())
    }

    pub fn steps(&self) -> StepsRepo {
        StepsRepo::new(self.db.clone())
    }

    pub fn audits(&self) -> AuditsRepo {
        AuditsRepo::new(self.db.clone())
    }

    pub fn artifacts(&self) -> ArtifactsRepo {
        ArtifactsRepo::new(self.db.clone())
    }
}

impl AppState {
    pub async fn new(settings: Settings) -> anyhow::Result<Self> {
        let db = lo_storage::pool::create_pool(&settings.database_url, 20, 5).await?;

        let queue = QueueClient::new(&settings.redis_url, "lo:queue:").await?;
        queue.init_queue(RUNS_QUEUE).await?;

        let prometheus = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| anyhow::anyhow!("failed to install metrics recorder: {e}"))?;

        Ok(Self {
            db: db.clone(),
            bus: EventBus::new(),
            queue,
            planner: Arc::new(RulePlanner),
            prometheus,
            settings,
            repos: Repos::new(db),
        })
    }

    /// Get repositories
    pub fn repos(&self) -> &Repos {
        &self.repos
    }

    /// Dispatch an approved run to the worker queue
    pub async fn enqueue_run(&self, run_id: &str) -> Result<String, redis::RedisError> {
        self.queue.enqueue(RUNS_QUEUE, &RunJob::new(run_id)).await
    }
}
