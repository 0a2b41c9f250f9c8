//! Adapts `gateway-admission`'s concrete managers to the `RateLimitGate`/
//! `BudgetGate` traits `gateway-routing::Router::route` expects, without
//! making the routing crate depend on admission.

use async_trait::async_trait;
use gateway_admission::{BudgetManager, QuotaManager, QuotaStatus};
use gateway_routing::{BudgetGate, RateLimitGate};
use std::sync::Arc;

pub struct QuotaGate(pub Arc<QuotaManager>);

#[async_trait]
impl RateLimitGate for QuotaGate {
    async fn check(&self, identity: &str) -> Result<(), String> {
        let outcome = self.0.check_and_consume(identity);
        if outcome.status == QuotaStatus::Exceeded {
            let retry_after = outcome.retry_after.map(|d| d.as_secs()).unwrap_or(60);
            Err(format!("quota exceeded, retry after {retry_after}s"))
        } else {
            Ok(())
        }
    }
}

pub struct SpendGate(pub Arc<BudgetManager>);

#[async_trait]
impl BudgetGate for SpendGate {
    async fn check(&self, _identity: &str, estimated_cost: f64) -> Result<(), String> {
        match self.0.check_allowed(estimated_cost).await {
            Ok(true) => Ok(()),
            Ok(false) => Err("spend budget exceeded".to_string()),
            Err(e) => Err(e.to_string()),
        }
    }
}
