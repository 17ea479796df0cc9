//! HTTP surface of the keybench service.

pub mod metrics_server;

pub use metrics_server::{router, MetricsServer};
