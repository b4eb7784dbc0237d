//! HTTP request handlers.
//!
//! - `rdb`: the retrieval route, streaming RDB text
//! - `health`: health, readiness and Prometheus metrics

pub mod health;
pub mod rdb;
