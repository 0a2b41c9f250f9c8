#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("job {0} already registered")]
    AlreadyExists(String),
    #[error("job {0} not found")]
    NotFound(String),
    #[error("job {0} is already running")]
    AlreadyRunning(String),
    #[error("job {0} failed: {1}")]
    JobFailed(String, String),
}
