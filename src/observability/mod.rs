//! # Observability
//!
//! Prometheus metrics for the controller. The HTTP surface that exposes
//! them lives in `crate::server`.

pub mod metrics;
