//! Extraction orchestrator: job lifecycle, concurrent fan-out, and
//! batched delivery.
//!
//! One [`run_extraction`] call creates a job, fans extraction out across
//! every matching extractor (once per region for region-scoped ones),
//! concatenates the artifacts, and drives them through the transport in
//! paced batches. Individual task and delivery failures are recorded on
//! the job and never abort the run; only an orchestration-level fault
//! fails a job.
//!
//! [`run_extraction`]: ExtractionOrchestrator::run_extraction

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use futures::future::join_all;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::SweepError;
use crate::registry::{ExtractorRegistry, RegisteredExtractor};
use crate::traits::store::JobStore;
use crate::traits::transport::Transport;
use crate::types::artifact::Artifact;
use crate::types::config::{ExtractionRequest, OrchestratorConfig};
use crate::types::job::{Job, JobStatus};

/// Shared job map: concurrent insert from new runs, concurrent read from
/// status polling. Each job's fields are only ever written by the task
/// executing that job.
type JobMap = Arc<RwLock<HashMap<Uuid, Job>>>;

/// Top-level coordinator for extraction runs.
pub struct ExtractionOrchestrator<T: Transport + 'static> {
    registry: Arc<ExtractorRegistry>,
    transport: Arc<T>,
    store: Option<Arc<dyn JobStore>>,
    jobs: JobMap,
    config: OrchestratorConfig,
}

impl<T: Transport + 'static> ExtractionOrchestrator<T> {
    /// Create an orchestrator over a registry and transport.
    pub fn new(registry: Arc<ExtractorRegistry>, transport: T) -> Self {
        Self {
            registry,
            transport: Arc::new(transport),
            store: None,
            jobs: Arc::new(RwLock::new(HashMap::new())),
            config: OrchestratorConfig::default(),
        }
    }

    /// Attach a durable job mirror.
    pub fn with_store(mut self, store: Arc<dyn JobStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Override the delivery tuning.
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Start an extraction run and return its job id immediately.
    ///
    /// The job is visible through [`job_status`] as RUNNING from the
    /// moment this returns; the extraction itself proceeds on a spawned
    /// task.
    ///
    /// [`job_status`]: Self::job_status
    pub async fn run_extraction(&self, request: ExtractionRequest) -> Uuid {
        let services = match &request.services {
            Some(list) => list.clone(),
            None => self.registry.service_names(),
        };

        let mut job = Job::new(services);
        job.start();
        let job_id = job.id;
        self.jobs.write().unwrap().insert(job_id, job.clone());

        if let Some(store) = &self.store {
            if let Err(e) = store.create_job(&job).await {
                warn!(job_id = %job_id, error = %e, "failed to mirror job creation");
            }
        }
        info!(
            job_id = %job_id,
            services = job.services.len(),
            "extraction job started"
        );

        let registry = Arc::clone(&self.registry);
        let transport = Arc::clone(&self.transport);
        let store = self.store.clone();
        let jobs = Arc::clone(&self.jobs);
        let config = self.config.clone();
        tokio::spawn(async move {
            Self::execute_job(registry, transport, store, jobs, config, job_id, request).await;
        });

        job_id
    }

    /// Current state of a job: memory first, then the durable mirror.
    pub async fn job_status(&self, id: Uuid) -> Option<Job> {
        if let Some(job) = self.jobs.read().unwrap().get(&id) {
            return Some(job.clone());
        }
        if let Some(store) = &self.store {
            match store.get_job(id).await {
                Ok(job) => return job,
                Err(e) => warn!(job_id = %id, error = %e, "durable job lookup failed"),
            }
        }
        None
    }

    /// List jobs, most recently started first.
    ///
    /// Uses the durable mirror when one is attached, falling back to the
    /// in-memory map on store failure.
    pub async fn list_jobs(&self, limit: usize) -> Vec<Job> {
        if let Some(store) = &self.store {
            match store.list_jobs(limit).await {
                Ok(jobs) => return jobs,
                Err(e) => warn!(error = %e, "durable job listing failed, using memory"),
            }
        }
        let mut jobs: Vec<_> = self.jobs.read().unwrap().values().cloned().collect();
        jobs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        jobs.truncate(limit);
        jobs
    }

    /// Reconcile stale RUNNING rows left behind by a previous process.
    ///
    /// A job that shows RUNNING in the durable store but has no in-memory
    /// counterpart cannot still be executing; it is marked FAILED with an
    /// explanatory error. Returns the number reconciled.
    pub async fn recover_stale_jobs(&self) -> usize {
        let Some(store) = &self.store else {
            return 0;
        };
        let stored = match store.list_jobs(usize::MAX).await {
            Ok(jobs) => jobs,
            Err(e) => {
                warn!(error = %e, "stale job listing failed");
                return 0;
            }
        };

        let mut recovered = 0;
        for mut job in stored {
            let in_memory = self.jobs.read().unwrap().contains_key(&job.id);
            if job.status == JobStatus::Running && !in_memory {
                job.fail("process restarted while job was running");
                match store.update_job(&job).await {
                    Ok(()) => recovered += 1,
                    Err(e) => warn!(job_id = %job.id, error = %e, "stale job update failed"),
                }
            }
        }
        if recovered > 0 {
            info!(recovered, "stale running jobs marked failed");
        }
        recovered
    }

    /// Run one job to its terminal state and persist the outcome.
    async fn execute_job(
        registry: Arc<ExtractorRegistry>,
        transport: Arc<T>,
        store: Option<Arc<dyn JobStore>>,
        jobs: JobMap,
        config: OrchestratorConfig,
        job_id: Uuid,
        request: ExtractionRequest,
    ) {
        let outcome =
            Self::extract_and_deliver(&registry, &transport, &jobs, &config, job_id, &request)
                .await;

        {
            let mut map = jobs.write().unwrap();
            if let Some(job) = map.get_mut(&job_id) {
                match &outcome {
                    Ok(()) => job.complete(),
                    Err(e) => job.fail(e.to_string()),
                }
            }
        }

        let final_job = jobs.read().unwrap().get(&job_id).cloned();
        if let (Some(store), Some(job)) = (store.as_ref(), final_job.as_ref()) {
            if let Err(e) = store.update_job(job).await {
                warn!(job_id = %job_id, error = %e, "failed to persist final job state");
            }
        }

        match (&outcome, final_job) {
            (Ok(()), Some(job)) => info!(
                job_id = %job_id,
                total = job.total_artifacts,
                delivered = job.successful_artifacts,
                failed = job.failed_artifacts,
                "extraction job completed"
            ),
            (Err(e), _) => warn!(job_id = %job_id, error = %e, "extraction job failed"),
            _ => {}
        }
    }

    /// Fan out extraction tasks, then deliver the merged artifact list.
    ///
    /// Per-task and per-send failures are recorded on the job; an error
    /// returned here is an orchestration-level fault that fails the job.
    async fn extract_and_deliver(
        registry: &ExtractorRegistry,
        transport: &Arc<T>,
        jobs: &JobMap,
        config: &OrchestratorConfig,
        job_id: Uuid,
        request: &ExtractionRequest,
    ) -> Result<(), SweepError> {
        let resolved = registry.extractors(request.services.as_deref(), None);
        if resolved.is_empty() {
            if let Some(services) = &request.services {
                return Err(SweepError::NoExtractors {
                    services: services.clone(),
                });
            }
            // Nothing registered and nothing asked for: an empty run.
            return Ok(());
        }

        let tasks = Self::plan_tasks(resolved, request);
        debug!(job_id = %job_id, tasks = tasks.len(), "fanning out extraction tasks");

        let filters = request.filters.as_ref();
        let results = join_all(tasks.iter().map(|(registered, region)| async move {
            let result = registered
                .extractor
                .extract(region.as_deref(), filters)
                .await;
            (registered, region, result)
        }))
        .await;

        let mut artifacts = Vec::new();
        {
            let mut map = jobs.write().unwrap();
            for (registered, region, result) in results {
                match result {
                    Ok(batch) => {
                        debug!(
                            job_id = %job_id,
                            key = %registered.key,
                            region = region.as_deref().unwrap_or("global"),
                            artifacts = batch.len(),
                            "extraction task finished"
                        );
                        artifacts.extend(batch);
                    }
                    Err(e) => {
                        let label = match region {
                            Some(r) => format!("{} [{}]", registered.key, r),
                            None => registered.key.clone(),
                        };
                        warn!(job_id = %job_id, task = %label, error = %e, "extraction task failed");
                        if let Some(job) = map.get_mut(&job_id) {
                            job.record_error(format!("{}: {}", label, e));
                        }
                    }
                }
            }
            if let Some(job) = map.get_mut(&job_id) {
                job.total_artifacts = artifacts.len();
            }
        }

        info!(job_id = %job_id, total = artifacts.len(), "extraction fan-out complete");

        let batch_size = request
            .batch_size
            .unwrap_or(config.default_batch_size)
            .max(1);
        Self::send_artifacts(transport, jobs, config, job_id, &artifacts, batch_size).await;
        Ok(())
    }

    /// Expand registered extractors into (extractor, region) tasks.
    ///
    /// Region-scoped extractors get one task per requested region (or per
    /// session region when none were requested); everything else gets a
    /// single task covering all regions internally.
    fn plan_tasks(
        resolved: Vec<RegisteredExtractor>,
        request: &ExtractionRequest,
    ) -> Vec<(RegisteredExtractor, Option<String>)> {
        let mut tasks = Vec::new();
        for registered in resolved {
            if registered.extractor.metadata().region_scoped {
                let regions = request
                    .regions
                    .clone()
                    .unwrap_or_else(|| registered.regions.clone());
                if regions.is_empty() {
                    tasks.push((registered, None));
                } else {
                    for region in regions {
                        tasks.push((registered.clone(), Some(region)));
                    }
                }
            } else {
                tasks.push((registered, None));
            }
        }
        tasks
    }

    /// Deliver artifacts in consecutive paced batches.
    ///
    /// Sends within a batch are dispatched concurrently; counters are
    /// updated under one lock acquisition after the batch settles, so
    /// increments never race. The pacing pause runs between batches, not
    /// after the last one.
    async fn send_artifacts(
        transport: &Arc<T>,
        jobs: &JobMap,
        config: &OrchestratorConfig,
        job_id: Uuid,
        artifacts: &[Artifact],
        batch_size: usize,
    ) {
        let total_batches = artifacts.len().div_ceil(batch_size);
        for (index, batch) in artifacts.chunks(batch_size).enumerate() {
            let outcomes = join_all(batch.iter().map(|artifact| async move {
                (artifact, transport.send(artifact).await)
            }))
            .await;

            {
                let mut map = jobs.write().unwrap();
                if let Some(job) = map.get_mut(&job_id) {
                    for (artifact, outcome) in outcomes {
                        match outcome {
                            Ok(()) => job.record_send(true),
                            Err(e) => {
                                job.record_send(false);
                                job.record_error(format!(
                                    "failed to deliver {}: {}",
                                    artifact.resource_id(),
                                    e
                                ));
                            }
                        }
                    }
                }
            }
            debug!(
                job_id = %job_id,
                batch = index + 1,
                total_batches,
                size = batch.len(),
                "artifact batch dispatched"
            );

            if index + 1 < total_batches && !config.batch_pacing.is_zero() {
                tokio::time::sleep(config.batch_pacing).await;
            }
        }
    }
}

impl<T: Transport + 'static> std::fmt::Debug for ExtractionOrchestrator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionOrchestrator")
            .field("transport", &self.transport.name())
            .field("has_store", &self.store.is_some())
            .field("jobs", &self.jobs.read().unwrap().len())
            .finish()
    }
}
