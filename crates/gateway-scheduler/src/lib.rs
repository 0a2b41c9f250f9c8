//! Scheduler (C15): interval-triggered jobs (benchmark ingest, metric
//! pruning) running on a bounded worker pool, distinct from the
//! application's request-handling tasks, with persistent bookkeeping so a
//! restart can coalesce missed runs into a single catch-up.

pub mod error;
pub mod job_log;

pub use error::SchedulerError;
pub use job_log::{JobLog, JobRecord};

use chrono::Utc;
use dashmap::DashMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

pub type JobFuture = Pin<Box<dyn Future<Output = Result<(), String>> + Send>>;
pub type JobFn = Arc<dyn Fn() -> JobFuture + Send + Sync>;

#[derive(Debug, Clone, serde::Serialize)]
pub struct JobStatus {
    pub id: String,
    pub interval_minutes: u32,
    pub paused: bool,
    pub last_run: Option<chrono::DateTime<Utc>>,
    pub last_success: Option<bool>,
}

struct Job {
    id: String,
    interval: Duration,
    func: JobFn,
    paused: AtomicBool,
    running: AtomicBool,
    handle: std::sync::Mutex<Option<JoinHandle<()>>>,
}

/// Runs scheduled jobs on a bounded pool, one task per job plus a global
/// semaphore capping how many job bodies execute concurrently.
pub struct Scheduler {
    jobs: DashMap<String, Arc<Job>>,
    worker_pool: Arc<Semaphore>,
    job_log: Arc<JobLog>,
    catch_up_grace: Duration,
}

impl Scheduler {
    pub fn new(worker_pool_size: usize, job_log_path: impl Into<PathBuf>) -> SchedulerBuilder {
        SchedulerBuilder { worker_pool_size, job_log_path: job_log_path.into(), catch_up_grace: Duration::from_secs(3600) }
    }

    /// Register a job to run every `interval_minutes`. Optionally runs once
    /// immediately, then honors a single catch-up run if the job log shows
    /// a missed run within the catch-up grace window. No two executions of
    /// the same job ever overlap.
    pub async fn add_job(
        &self,
        id: impl Into<String>,
        func: JobFn,
        interval_minutes: u32,
        run_immediately: bool,
    ) -> Result<(), SchedulerError> {
        let id = id.into();
        if self.jobs.contains_key(&id) {
            return Err(SchedulerError::AlreadyExists(id));
        }
        let interval = Duration::from_secs(interval_minutes.max(1) as u64 * 60);
        let job = Arc::new(Job {
            id: id.clone(),
            interval,
            func,
            paused: AtomicBool::new(false),
            running: AtomicBool::new(false),
            handle: std::sync::Mutex::new(None),
        });
        self.jobs.insert(id.clone(), job.clone());

        let needs_catch_up = {
            let record = self.job_log.get(&id).await;
            match record.last_run {
                Some(last) => {
                    let elapsed = Utc::now().signed_duration_since(last);
                    let missed = elapsed > chrono::Duration::from_std(interval).unwrap_or_default();
                    let within_grace = elapsed <= chrono::Duration::from_std(self.catch_up_grace).unwrap_or_default();
                    missed && within_grace
                }
                None => false,
            }
        };

        let pool = self.worker_pool.clone();
        let log = self.job_log.clone();
        let job_for_loop = job.clone();
        let handle = tokio::spawn(async move {
            if run_immediately || needs_catch_up {
                run_once(&job_for_loop, &pool, &log).await;
            }
            loop {
                tokio::time::sleep(job_for_loop.interval).await;
                if job_for_loop.paused.load(Ordering::SeqCst) {
                    continue;
                }
                run_once(&job_for_loop, &pool, &log).await;
            }
        });
        *job.handle.lock().expect("job handle lock poisoned") = Some(handle);
        info!(job = %id, interval_minutes, "job registered");
        Ok(())
    }

    pub fn remove_job(&self, id: &str) -> bool {
        if let Some((_, job)) = self.jobs.remove(id) {
            if let Some(handle) = job.handle.lock().expect("job handle lock poisoned").take() {
                handle.abort();
            }
            true
        } else {
            false
        }
    }

    pub fn pause(&self, id: &str) -> bool {
        match self.jobs.get(id) {
            Some(job) => {
                job.paused.store(true, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    pub fn resume(&self, id: &str) -> bool {
        match self.jobs.get(id) {
            Some(job) => {
                job.paused.store(false, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    /// Run a job immediately, outside its normal schedule. Returns an error
    /// if the job is unknown or already mid-run.
    pub async fn run_now(&self, id: &str) -> Result<(), SchedulerError> {
        let job = self.jobs.get(id).map(|e| e.value().clone()).ok_or_else(|| SchedulerError::NotFound(id.to_string()))?;
        if job.running.load(Ordering::SeqCst) {
            return Err(SchedulerError::AlreadyRunning(id.to_string()));
        }
        run_once(&job, &self.worker_pool, &self.job_log).await;
        Ok(())
    }

    pub async fn list_jobs(&self) -> Vec<JobStatus> {
        let jobs: Vec<Arc<Job>> = self.jobs.iter().map(|e| e.value().clone()).collect();
        let mut out = Vec::with_capacity(jobs.len());
        for job in jobs {
            let record = self.job_log.get(&job.id).await;
            out.push(JobStatus {
                id: job.id.clone(),
                interval_minutes: (job.interval.as_secs() / 60) as u32,
                paused: job.paused.load(Ordering::SeqCst),
                last_run: record.last_run,
                last_success: record.last_success,
            });
        }
        out
    }

    pub async fn job_status(&self, id: &str) -> Option<JobStatus> {
        let job = self.jobs.get(id)?.value().clone();
        let record = self.job_log.get(id).await;
        Some(JobStatus {
            id: job.id.clone(),
            interval_minutes: (job.interval.as_secs() / 60) as u32,
            paused: job.paused.load(Ordering::SeqCst),
            last_run: record.last_run,
            last_success: record.last_success,
        })
    }
}

pub struct SchedulerBuilder {
    worker_pool_size: usize,
    job_log_path: PathBuf,
    catch_up_grace: Duration,
}

impl SchedulerBuilder {
    pub fn with_catch_up_grace(mut self, grace: Duration) -> Self {
        self.catch_up_grace = grace;
        self
    }

    pub async fn build(self) -> Scheduler {
        Scheduler {
            jobs: DashMap::new(),
            worker_pool: Arc::new(Semaphore::new(self.worker_pool_size.max(1))),
            job_log: Arc::new(JobLog::load(self.job_log_path).await),
            catch_up_grace: self.catch_up_grace,
        }
    }
}

/// Acquire a worker-pool permit, guard against self-overlap, run the job
/// body, and persist the outcome. The `running` flag and the semaphore
/// permit are both held for the duration of the call.
async fn run_once(job: &Arc<Job>, pool: &Arc<Semaphore>, log: &Arc<JobLog>) {
    if job.running.swap(true, Ordering::SeqCst) {
        warn!(job = %job.id, "skipped tick: previous run still in flight");
        return;
    }
    let _permit = pool.acquire().await;
    let result = (job.func)().await;
    job.running.store(false, Ordering::SeqCst);
    match &result {
        Ok(()) => {
            info!(job = %job.id, "job run completed");
            log.record(&job.id, true, None).await;
        }
        Err(e) => {
            error!(job = %job.id, error = %e, "job run failed");
            log.record(&job.id, false, Some(e.clone())).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_job(counter: Arc<AtomicUsize>) -> JobFn {
        Arc::new(move || {
            let counter = counter.clone();
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        })
    }

    #[tokio::test]
    async fn run_now_executes_immediately_without_waiting_for_interval() {
        let dir = tempfile::tempdir().unwrap();
        let scheduler = Scheduler::new(4, dir.path().join("jobs.json")).build().await;
        let counter = Arc::new(AtomicUsize::new(0));
        scheduler.add_job("prune", counting_job(counter.clone()), 60, false).await.unwrap();

        scheduler.run_now("prune").await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn duplicate_job_id_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let scheduler = Scheduler::new(4, dir.path().join("jobs.json")).build().await;
        let counter = Arc::new(AtomicUsize::new(0));
        scheduler.add_job("ingest", counting_job(counter.clone()), 15, false).await.unwrap();
        let err = scheduler.add_job("ingest", counting_job(counter), 15, false).await.unwrap_err();
        assert!(matches!(err, SchedulerError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn remove_job_stops_future_ticks() {
        let dir = tempfile::tempdir().unwrap();
        let scheduler = Scheduler::new(4, dir.path().join("jobs.json")).build().await;
        let counter = Arc::new(AtomicUsize::new(0));
        scheduler.add_job("ingest", counting_job(counter), 15, false).await.unwrap();
        assert!(scheduler.remove_job("ingest"));
        assert!(!scheduler.remove_job("ingest"));
    }

    #[tokio::test]
    async fn pause_and_resume_toggle_status() {
        let dir = tempfile::tempdir().unwrap();
        let scheduler = Scheduler::new(4, dir.path().join("jobs.json")).build().await;
        let counter = Arc::new(AtomicUsize::new(0));
        scheduler.add_job("ingest", counting_job(counter), 15, false).await.unwrap();
        assert!(scheduler.pause("ingest"));
        assert!(scheduler.job_status("ingest").await.unwrap().paused);
        assert!(scheduler.resume("ingest"));
        assert!(!scheduler.job_status("ingest").await.unwrap().paused);
    }
}
