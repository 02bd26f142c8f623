use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

use crate::error::AppError;

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub lifecycle_operations_total: IntCounterVec,
    pub technician_logins_total: IntCounterVec,
    pub store_latency_seconds: HistogramVec,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let lifecycle_operations_total = IntCounterVec::new(
            Opts::new(
                "lifecycle_operations_total",
                "Request and technician operations by outcome",
            ),
            &["operation", "outcome"],
        )
        .expect("valid lifecycle_operations_total metric");

        let technician_logins_total = IntCounterVec::new(
            Opts::new("technician_logins_total", "Technician login attempts by outcome"),
            &["outcome"],
        )
        .expect("valid technician_logins_total metric");

        let store_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "store_latency_seconds",
                "Latency of document store calls in seconds",
            ),
            &["operation"],
        )
        .expect("valid store_latency_seconds metric");

        registry
            .register(Box::new(lifecycle_operations_total.clone()))
            .expect("register lifecycle_operations_total");
        registry
            .register(Box::new(technician_logins_total.clone()))
            .expect("register technician_logins_total");
        registry
            .register(Box::new(store_latency_seconds.clone()))
            .expect("register store_latency_seconds");

        Self {
            registry,
            lifecycle_operations_total,
            technician_logins_total,
            store_latency_seconds,
        }
    }

    pub fn record<T>(&self, operation: &str, result: &Result<T, AppError>) {
        self.lifecycle_operations_total
            .with_label_values(&[operation, outcome(result)])
            .inc();
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

pub fn outcome<T>(result: &Result<T, AppError>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(AppError::Validation(_)) => "invalid",
        Err(AppError::NotFound(_)) => "not_found",
        Err(AppError::Unauthorized(_)) => "unauthorized",
        Err(AppError::Store(_) | AppError::Internal(_)) => "error",
    }
}
