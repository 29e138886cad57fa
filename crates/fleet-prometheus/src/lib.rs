mod backend;
pub use backend::PrometheusMetrics;
