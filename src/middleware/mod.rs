//! HTTP middleware for KeyAuth Core

pub mod metrics;

pub use metrics::ObservabilityLayer;
