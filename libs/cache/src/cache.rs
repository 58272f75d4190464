//! The scheduler cache: construction, ingestion lifecycle and the public API.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use batchd_watch::{connect, wait_for_cache_sync, ChangeSources, Connector, Informer, SyncFlag};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::{ClusterInfo, TaskInfo, TaskStatus};
use crate::config::CacheConfig;
use crate::error::{CacheError, CacheResult};
use crate::filter::AdmissionFilter;
use crate::ingest::EventRouter;
use crate::reconciler::Reconciler;
use crate::state::SchedulerState;
use crate::validation::{DefaultTransitionPolicy, TransitionPolicy};

/// What the placement algorithm and the binder see of the cache.
///
/// `Display` renders a human-readable dump of the current state.
#[async_trait]
pub trait Cache: Send + Sync + fmt::Display {
    /// Starts one ingestion loop per resource kind and returns immediately.
    ///
    /// The loops stop when `shutdown` turns `true` or its sender is dropped.
    /// Must be called from within a Tokio runtime.
    fn run(&self, shutdown: watch::Receiver<bool>);

    /// Waits until every loop has applied its initial full list.
    ///
    /// Returns `false` if shutdown is signalled first. Callers must not
    /// snapshot or schedule before this has returned `true`.
    async fn wait_for_cache_sync(&self, shutdown: watch::Receiver<bool>) -> bool;

    /// Moves a task to `status` if the transition policy allows it.
    ///
    /// The task is looked up by id and its current status in the cache is
    /// what the policy sees. On error nothing is modified.
    fn update_status(&self, task: &TaskInfo, status: TaskStatus) -> CacheResult<()>;

    /// An independent deep copy of every node and job.
    fn snapshot(&self) -> ClusterInfo;

    fn debug_string(&self) -> String {
        self.to_string()
    }
}

/// The production [`Cache`], fed by control-plane change sources.
pub struct SchedulerCache {
    scheduler_name: String,
    state: Arc<SchedulerState>,
    router: Arc<EventRouter>,
    policy: Arc<dyn TransitionPolicy>,
    /// Taken by the first call to `run`.
    informers: Mutex<Vec<Informer>>,
    sync_flags: Vec<SyncFlag>,
}

impl SchedulerCache {
    /// Connects to the control plane and wires the ingestion loops.
    ///
    /// Fails if the connection cannot be established; there is no cache
    /// without it.
    pub async fn connect<C>(config: &CacheConfig, connector: &C) -> CacheResult<Self>
    where
        C: Connector + ?Sized,
    {
        let sources = connect(connector, &config.control_plane).await?;
        info!(scheduler = %config.scheduler_name, "Scheduler cache connected");
        Ok(Self::from_sources(&config.scheduler_name, sources))
    }

    /// Wires the ingestion loops over already-open change sources.
    pub fn from_sources(scheduler_name: &str, sources: ChangeSources) -> Self {
        let state = Arc::new(SchedulerState::new());
        let router = EventRouter::new(
            Reconciler::new(Arc::clone(&state)),
            AdmissionFilter::new(scheduler_name),
        );

        let informers: Vec<Informer> = sources
            .into_parts()
            .into_iter()
            .map(|(kind, source)| Informer::new(kind, source))
            .collect();
        let sync_flags = informers.iter().map(Informer::sync_flag).collect();

        Self {
            scheduler_name: scheduler_name.to_string(),
            state,
            router: Arc::new(router),
            policy: Arc::new(DefaultTransitionPolicy),
            informers: Mutex::new(informers),
            sync_flags,
        }
    }

    /// Replaces the status transition policy.
    pub fn with_policy(mut self, policy: impl TransitionPolicy + 'static) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    pub fn scheduler_name(&self) -> &str {
        &self.scheduler_name
    }

    /// Returns true once every ingestion loop has completed its initial sync.
    pub fn has_synced(&self) -> bool {
        self.sync_flags.iter().all(SyncFlag::has_synced)
    }
}

#[async_trait]
impl Cache for SchedulerCache {
    fn run(&self, shutdown: watch::Receiver<bool>) {
        let informers = std::mem::take(
            &mut *self
                .informers
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );

        if informers.is_empty() {
            warn!(scheduler = %self.scheduler_name, "Scheduler cache is already running");
            return;
        }

        for informer in informers {
            let router = Arc::clone(&self.router);
            tokio::spawn(informer.run(shutdown.clone(), move |event| router.route(event)));
        }

        info!(scheduler = %self.scheduler_name, "Scheduler cache started");
    }

    async fn wait_for_cache_sync(&self, shutdown: watch::Receiver<bool>) -> bool {
        wait_for_cache_sync(shutdown, &self.sync_flags).await
    }

    fn update_status(&self, task: &TaskInfo, status: TaskStatus) -> CacheResult<()> {
        match self
            .state
            .update_task_status(&task.uid, status, self.policy.as_ref())
        {
            Ok(from) => {
                debug!(task_id = %task.uid, %from, to = %status, "Task status updated");
                Ok(())
            }
            Err(e @ CacheError::TaskNotFound(_)) => {
                warn!(task_id = %task.uid, to = %status, "Status update for unknown task");
                Err(e)
            }
            Err(e) => {
                warn!(task_id = %task.uid, error = %e, "Status update rejected");
                Err(e)
            }
        }
    }

    fn snapshot(&self) -> ClusterInfo {
        self.state.snapshot()
    }
}

impl fmt::Display for SchedulerCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.state, f)
    }
}

impl fmt::Debug for SchedulerCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulerCache")
            .field("scheduler_name", &self.scheduler_name)
            .field("synced", &self.has_synced())
            .finish_non_exhaustive()
    }
}
