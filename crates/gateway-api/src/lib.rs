//! HTTP/WebSocket surface for the routing gateway (spec §6): an axum
//! router over admission, selection, streaming, and analytics, plus the
//! ambient auth and origin-validation modules. Outbound SSRF protection for
//! adapter fetches lives in `gateway_adapters::security` instead, next to
//! the fetch path it guards.

pub mod api_error;
pub mod auth;
pub mod http_api;
pub mod json_response;
pub mod origin_validation;
pub mod producer;
pub mod rate_limit_middleware;
