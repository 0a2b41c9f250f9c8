//! Shared application state handed to every handler via `State<Arc<ApiState>>`.

use crate::producer::ChatProducer;
use gateway_admission::{BudgetManager, QuotaManager};
use gateway_analytics::AnalyticsCollector;
use gateway_core::MetricStore;
use gateway_routing::Router;
use gateway_streaming::{CancellationRegistry, ConnectionManager};
use std::sync::Arc;

pub struct ApiState {
    pub store: Arc<MetricStore>,
    pub router: Arc<Router>,
    pub quota: Arc<QuotaManager>,
    pub budget: Arc<BudgetManager>,
    pub analytics: Arc<AnalyticsCollector>,
    pub connections: Arc<ConnectionManager>,
    pub cancellations: Arc<CancellationRegistry>,
    pub producer: Arc<dyn ChatProducer>,
}
