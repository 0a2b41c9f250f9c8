//! Routing: composite scorer (C6), built-in profiles (C7, re-exported from
//! `gateway-types`), per-model circuit breaker (C10), and the router (C11)
//! that ties admission, scoring, and fallback ordering together.

pub mod circuit_breaker;
pub mod router;
pub mod scorer;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitBreakerRegistry, CircuitState};
pub use router::{BudgetGate, RateLimitGate, Router, RouteDecision, RouterError};
pub use scorer::CompositeScorer;
