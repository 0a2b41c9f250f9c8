//! Budget manager (C9): spend tracking across rolling daily/weekly/monthly
//! windows, read from the analytics event table (C14) rather than kept as
//! separate running counters, so a restart never loses track of spend
//! already recorded.

use gateway_analytics::{AnalyticsCollector, AnalyticsError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

const DAILY_HOURS: i64 = 24;
const WEEKLY_HOURS: i64 = 168;
const MONTHLY_HOURS: i64 = 720;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    Ok,
    Warning,
    Exceeded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnforcementMode {
    /// `check_allowed` always returns `true`; status is informational only.
    Advisory,
    /// `check_allowed` denies once spend is already over, or would cross,
    /// any enabled limit.
    Hard,
}

/// A limit of `0.0` disables that window's enforcement and status entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    pub daily_limit: f64,
    pub weekly_limit: f64,
    pub monthly_limit: f64,
    pub warning_threshold: f64,
    pub mode: EnforcementMode,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self { daily_limit: 50.0, weekly_limit: 250.0, monthly_limit: 1000.0, warning_threshold: 0.8, mode: EnforcementMode::Advisory }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BudgetError {
    #[error("analytics: {0}")]
    Analytics(#[from] AnalyticsError),
    #[error("io: {0}")]
    Io(String),
}

impl BudgetConfig {
    /// Load from `path`, falling back to defaults when the file is absent
    /// or fails to parse.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                warn!(error = %e, path = %path.display(), "budget config corrupted, using defaults");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), BudgetError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| BudgetError::Io(e.to_string()))?;
        }
        let text = serde_json::to_string_pretty(self).map_err(|e| BudgetError::Io(e.to_string()))?;
        std::fs::write(path, text).map_err(|e| BudgetError::Io(e.to_string()))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WindowSpend {
    pub window_hours: i64,
    pub limit: f64,
    pub spend: f64,
    pub remaining: f64,
    pub percent_used: f64,
    pub status: BudgetStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct BudgetSummary {
    pub daily: WindowSpend,
    pub weekly: WindowSpend,
    pub monthly: WindowSpend,
    pub status: BudgetStatus,
    pub reason: String,
}

/// Mutable configuration handle: the current `BudgetConfig` is swapped
/// atomically on `update_config` rather than mutated in place.
pub struct BudgetManager {
    analytics: Arc<AnalyticsCollector>,
    config: RwLock<BudgetConfig>,
    config_path: PathBuf,
}

impl BudgetManager {
    pub fn new(analytics: Arc<AnalyticsCollector>, config_path: impl Into<PathBuf>) -> Self {
        let config_path = config_path.into();
        let config = BudgetConfig::load(&config_path);
        Self { analytics, config: RwLock::new(config), config_path }
    }

    pub async fn config(&self) -> BudgetConfig {
        self.config.read().await.clone()
    }

    /// Replace the current config and persist it. Callers obtain a new
    /// `BudgetConfig` value (e.g. via `BudgetConfig { daily_limit: x,
    /// ..old }`) rather than mutating the live one in place.
    pub async fn update_config(&self, new_config: BudgetConfig) -> Result<(), BudgetError> {
        new_config.save(&self.config_path)?;
        *self.config.write().await = new_config;
        Ok(())
    }

    pub async fn summary(&self) -> Result<BudgetSummary, AnalyticsError> {
        let config = self.config.read().await.clone();
        let daily = self.window_spend(DAILY_HOURS, config.daily_limit, config.warning_threshold).await?;
        let weekly = self.window_spend(WEEKLY_HOURS, config.weekly_limit, config.warning_threshold).await?;
        let monthly = self.window_spend(MONTHLY_HOURS, config.monthly_limit, config.warning_threshold).await?;

        let status = [daily.status, weekly.status, monthly.status]
            .into_iter()
            .max_by_key(|s| match s {
                BudgetStatus::Ok => 0,
                BudgetStatus::Warning => 1,
                BudgetStatus::Exceeded => 2,
            })
            .unwrap_or(BudgetStatus::Ok);

        let reason = match status {
            BudgetStatus::Ok => "spend within all configured limits".to_string(),
            BudgetStatus::Warning => "spend is approaching a configured limit".to_string(),
            BudgetStatus::Exceeded => "spend has exceeded a configured limit".to_string(),
        };

        Ok(BudgetSummary { daily, weekly, monthly, status, reason })
    }

    /// `true` under advisory mode unconditionally. Under hard mode, `false`
    /// when current spend already exceeds, or `spend + estimated_cost`
    /// would cross, any enabled (non-zero) limit.
    pub async fn check_allowed(&self, estimated_cost: f64) -> Result<bool, AnalyticsError> {
        let config = self.config.read().await.clone();
        if config.mode == EnforcementMode::Advisory {
            return Ok(true);
        }
        for (hours, limit) in [(DAILY_HOURS, config.daily_limit), (WEEKLY_HOURS, config.weekly_limit), (MONTHLY_HOURS, config.monthly_limit)] {
            if limit <= 0.0 {
                continue;
            }
            let spend = self.analytics.spend_in_window(hours).await?;
            if spend >= limit || spend + estimated_cost > limit {
                return Ok(false);
            }
        }
        Ok(true)
    }

    async fn window_spend(&self, hours: i64, limit: f64, warning_threshold: f64) -> Result<WindowSpend, AnalyticsError> {
        let spend = self.analytics.spend_in_window(hours).await?;
        if limit <= 0.0 {
            return Ok(WindowSpend {
                window_hours: hours,
                limit,
                spend,
                remaining: f64::INFINITY,
                percent_used: 0.0,
                status: BudgetStatus::Ok,
            });
        }
        let remaining = (limit - spend).max(0.0);
        let percent_used = (spend / limit) * 100.0;
        let status = if spend >= limit {
            BudgetStatus::Exceeded
        } else if spend >= limit * warning_threshold {
            BudgetStatus::Warning
        } else {
            BudgetStatus::Ok
        };
        Ok(WindowSpend { window_hours: hours, limit, spend, remaining, percent_used, status })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_types::RoutingEvent;
    use chrono::Utc;

    fn event(cost: f64) -> RoutingEvent {
        RoutingEvent {
            timestamp: Utc::now(),
            model_selected: "gpt-4o".to_string(),
            profile_used: "balanced".to_string(),
            routing_time_ms: 10.0,
            prompt_tokens: 10,
            completion_tokens: 10,
            total_tokens: 20,
            estimated_cost: cost,
            was_fallback: false,
            success: true,
            error_message: None,
        }
    }

    #[tokio::test]
    async fn advisory_mode_always_allows() {
        let analytics = Arc::new(AnalyticsCollector::new_in_memory().await.unwrap());
        analytics.record_routing(event(1000.0)).await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let manager = BudgetManager::new(analytics, dir.path().join("budget.json"));
        assert!(manager.check_allowed(1.0).await.unwrap());
    }

    #[tokio::test]
    async fn hard_mode_denies_once_over_limit() {
        let analytics = Arc::new(AnalyticsCollector::new_in_memory().await.unwrap());
        analytics.record_routing(event(60.0)).await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let manager = BudgetManager::new(analytics, dir.path().join("budget.json"));
        manager
            .update_config(BudgetConfig { daily_limit: 50.0, weekly_limit: 0.0, monthly_limit: 0.0, warning_threshold: 0.8, mode: EnforcementMode::Hard })
            .await
            .unwrap();
        assert!(!manager.check_allowed(1.0).await.unwrap());
    }

    #[tokio::test]
    async fn zero_limit_disables_window() {
        let analytics = Arc::new(AnalyticsCollector::new_in_memory().await.unwrap());
        analytics.record_routing(event(1_000_000.0)).await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let manager = BudgetManager::new(analytics, dir.path().join("budget.json"));
        manager
            .update_config(BudgetConfig { daily_limit: 0.0, weekly_limit: 0.0, monthly_limit: 0.0, warning_threshold: 0.8, mode: EnforcementMode::Hard })
            .await
            .unwrap();
        assert!(manager.check_allowed(1.0).await.unwrap());
    }

    #[tokio::test]
    async fn corrupted_config_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("budget.json");
        std::fs::write(&path, "not json").unwrap();
        let config = BudgetConfig::load(&path);
        assert_eq!(config.daily_limit, BudgetConfig::default().daily_limit);
    }
}
