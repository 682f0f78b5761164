#![deny(unused)]
//! Observability wiring: tracing subscriber setup and Prometheus metrics.

pub mod metrics;
pub mod trace;
