//! Persistent job bookkeeping: one `last_run`/`last_status` record per job
//! id, serialized to a JSON file. A missing or corrupted file falls back to
//! an empty log rather than failing startup — the scheduler treats "no
//! history" the same as "never ran".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub last_run: Option<DateTime<Utc>>,
    pub last_success: Option<bool>,
    pub last_error: Option<String>,
}

impl Default for JobRecord {
    fn default() -> Self {
        Self { last_run: None, last_success: None, last_error: None }
    }
}

pub struct JobLog {
    path: PathBuf,
    records: Mutex<HashMap<String, JobRecord>>,
}

impl JobLog {
    pub async fn load(path: PathBuf) -> Self {
        let records = match tokio::fs::read_to_string(&path).await {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                warn!(error = %e, path = %path.display(), "job log corrupted, starting fresh");
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        };
        Self { path, records: Mutex::new(records) }
    }

    pub async fn get(&self, job_id: &str) -> JobRecord {
        self.records.lock().await.get(job_id).cloned().unwrap_or_default()
    }

    pub async fn record(&self, job_id: &str, success: bool, error: Option<String>) {
        {
            let mut records = self.records.lock().await;
            records.insert(
                job_id.to_string(),
                JobRecord { last_run: Some(Utc::now()), last_success: Some(success), last_error: error },
            );
        }
        self.persist().await;
    }

    async fn persist(&self) {
        let snapshot = self.records.lock().await.clone();
        if let Some(parent) = self.path.parent() {
            if tokio::fs::create_dir_all(parent).await.is_err() {
                warn!(path = %self.path.display(), "failed to create job log directory");
                return;
            }
        }
        match serde_json::to_string_pretty(&snapshot) {
            Ok(text) => {
                if let Err(e) = tokio::fs::write(&self.path, text).await {
                    warn!(error = %e, path = %self.path.display(), "failed to persist job log");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize job log"),
        }
    }
}
