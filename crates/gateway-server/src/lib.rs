//! Library surface behind the `gateway-server` binary: scheduler job
//! wiring split out from `main` for testability.

pub mod ingest;
